//! Schema mutators: each applies one classified statement to a [`crate::SchemaState`].

pub(crate) mod column;
pub(crate) mod table;
pub(crate) mod types;
