//! In-memory schema model.
//!
//! Everything here is plain data: a [`SchemaState`] holds enum types and tables, and is
//! mutated in place by the [`crate::Simulator`]. All maps preserve insertion order.

use crate::error::{ObjectKind, SimError, SimResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Kind of a user-defined type. Only enums are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Enum,
}

/// A `CREATE TYPE ... AS ENUM` type. `labels` is in sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TypeKind,
    pub labels: Vec<String>,
}

impl TypeDefinition {
    pub fn new_enum<I, S>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: TypeKind::Enum,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn label_position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

/// Column modifiers. Absent values are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnModifiers {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ColumnModifiers {
    pub fn is_empty(&self) -> bool {
        !self.not_null && self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    /// Declared type, verbatim (e.g. `timestamp without time zone`).
    pub data_type: String,
    #[serde(default)]
    pub modifiers: ColumnModifiers,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            modifiers: ColumnModifiers::default(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.modifiers.not_null = true;
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.modifiers.default = Some(expr.into());
        self
    }
}

/// A named table-level constraint entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IndexDefinition {
    PrimaryKey {
        name: String,
        columns: Vec<String>,
    },
    Unique {
        name: String,
        columns: Vec<String>,
    },
    Check {
        name: String,
        expression: String,
        columns: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    ForeignKey {
        name: String,
        columns: Vec<String>,
        table_name: String,
        reference_columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_delete: Option<ReferentialAction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_update: Option<ReferentialAction>,
    },
}

impl IndexDefinition {
    pub fn name(&self) -> &str {
        match self {
            IndexDefinition::PrimaryKey { name, .. }
            | IndexDefinition::Unique { name, .. }
            | IndexDefinition::Check { name, .. }
            | IndexDefinition::ForeignKey { name, .. } => name,
        }
    }

    pub fn set_name(&mut self, new_name: impl Into<String>) {
        match self {
            IndexDefinition::PrimaryKey { name, .. }
            | IndexDefinition::Unique { name, .. }
            | IndexDefinition::Check { name, .. }
            | IndexDefinition::ForeignKey { name, .. } => *name = new_name.into(),
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            IndexDefinition::PrimaryKey { columns, .. }
            | IndexDefinition::Unique { columns, .. }
            | IndexDefinition::Check { columns, .. }
            | IndexDefinition::ForeignKey { columns, .. } => columns,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self, IndexDefinition::PrimaryKey { .. })
    }
}

/// `ON DELETE` / `ON UPDATE` action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    NoAction,
    SetNull,
    SetDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: IndexMap<String, ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indexes: Vec::new(),
        }
    }

    /// Builder-style column append, mostly for seeding state.
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    /// Builder-style index append, mostly for seeding state.
    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        if index.is_primary_key() {
            self.indexes.insert(0, index);
        } else {
            self.indexes.push(index);
        }
        self
    }

    pub fn column(&self, name: &str) -> SimResult<&ColumnDefinition> {
        self.columns
            .get(name)
            .ok_or_else(|| SimError::not_found(ObjectKind::Column, name))
    }

    pub fn column_mut(&mut self, name: &str) -> SimResult<&mut ColumnDefinition> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| SimError::not_found(ObjectKind::Column, name))
    }

    pub fn primary_key(&self) -> Option<&IndexDefinition> {
        self.indexes.first().filter(|i| i.is_primary_key())
    }

    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.name() == name)
    }

    /// `name` if no index uses it, otherwise the first free `{name}1`, `{name}2`, ...
    pub fn unused_index_name(&self, name: String) -> String {
        if self.index(&name).is_none() {
            return name;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{name}{n}");
            if self.index(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Add an index. A primary key always goes first; anything else is appended.
    /// A name already in use is an error.
    pub fn add_index(&mut self, index: IndexDefinition) -> SimResult<()> {
        if self.index(index.name()).is_some() {
            return Err(SimError::already_exists(ObjectKind::Constraint, index.name()));
        }
        if index.is_primary_key() {
            if self.primary_key().is_some() {
                return Err(SimError::parse(
                    format!("multiple primary keys for table \"{}\" are not allowed", self.name),
                    0,
                ));
            }
            self.indexes.insert(0, index);
        } else {
            self.indexes.push(index);
        }
        Ok(())
    }
}

/// The simulated catalog: enum types and tables, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaState {
    #[serde(default)]
    pub types: IndexMap<String, TypeDefinition>,
    #[serde(default)]
    pub tables: IndexMap<String, TableDefinition>,
}

impl SchemaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.tables.is_empty()
    }

    pub fn with_type(mut self, ty: TypeDefinition) -> Self {
        self.types.insert(ty.name.clone(), ty);
        self
    }

    pub fn with_table(mut self, table: TableDefinition) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn type_mut(&mut self, name: &str) -> SimResult<&mut TypeDefinition> {
        self.types
            .get_mut(name)
            .ok_or_else(|| SimError::not_found(ObjectKind::Type, name))
    }

    pub fn table_mut(&mut self, name: &str) -> SimResult<&mut TableDefinition> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| SimError::not_found(ObjectKind::Table, name))
    }
}

/// Postgres-style default constraint name: `{table}_{col1}_{col2}..._{suffix}`.
pub(crate) fn default_index_name(table: &str, columns: &[String], suffix: &str) -> String {
    let mut name = String::from(table);
    for c in columns {
        name.push('_');
        name.push_str(c);
    }
    name.push('_');
    name.push_str(suffix);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_serializes_with_type_tag() {
        let fk = IndexDefinition::ForeignKey {
            name: "account_test_id_fkey".into(),
            columns: vec!["test_id".into()],
            table_name: "test".into(),
            reference_columns: vec!["id".into()],
            on_delete: None,
            on_update: None,
        };
        assert_eq!(
            serde_json::to_value(&fk).unwrap(),
            json!({
                "type": "foreignKey",
                "name": "account_test_id_fkey",
                "columns": ["test_id"],
                "tableName": "test",
                "referenceColumns": ["id"],
            })
        );
    }

    #[test]
    fn modifiers_omit_absent_values() {
        let col = ColumnDefinition::new("id", "INTEGER");
        assert_eq!(
            serde_json::to_value(&col).unwrap(),
            json!({ "name": "id", "dataType": "INTEGER", "modifiers": {} })
        );

        let col = col.not_null().default_expr("123");
        assert_eq!(
            serde_json::to_value(&col.modifiers).unwrap(),
            json!({ "notNull": true, "default": "123" })
        );
    }

    #[test]
    fn state_round_trips_through_json_in_order() {
        let state = SchemaState::new()
            .with_type(TypeDefinition::new_enum("mood", ["sad", "ok"]))
            .with_table(
                TableDefinition::new("zeta")
                    .with_column(ColumnDefinition::new("b", "text"))
                    .with_column(ColumnDefinition::new("a", "text")),
            )
            .with_table(TableDefinition::new("alpha"));

        let text = serde_json::to_string(&state).unwrap();
        let back: SchemaState = serde_json::from_str(&text).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.tables.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(
            back.tables["zeta"].columns.keys().collect::<Vec<_>>(),
            vec!["b", "a"]
        );
        assert_eq!(serde_json::to_value(&back.types["mood"]).unwrap()["type"], "enum");
    }

    #[test]
    fn add_index_puts_primary_key_first() {
        let mut t = TableDefinition::new("t");
        t.add_index(IndexDefinition::Unique {
            name: "t_a_key".into(),
            columns: vec!["a".into()],
        })
        .unwrap();
        t.add_index(IndexDefinition::PrimaryKey {
            name: "t_pkey".into(),
            columns: vec!["id".into()],
        })
        .unwrap();
        assert!(t.indexes[0].is_primary_key());

        let err = t
            .add_index(IndexDefinition::PrimaryKey {
                name: "t_other_pkey".into(),
                columns: vec!["a".into()],
            })
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn default_names_join_columns() {
        let cols = vec!["id".to_string(), "name".to_string()];
        assert_eq!(default_index_name("test", &cols, "key"), "test_id_name_key");
        assert_eq!(default_index_name("test", &[], "pkey"), "test_pkey");
    }
}
