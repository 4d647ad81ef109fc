//! pgddl
//!
//! Offline simulation of PostgreSQL DDL: apply `CREATE/ALTER/DROP TYPE` (enums) and
//! `CREATE/ALTER/DROP TABLE` statements to an in-memory schema and read back the types,
//! columns and constraints they produce. No database connection is involved.
//!
//! # Features
//!
//! - **Simulator**: one statement at a time ([`Simulator::simulate_query`]) or a whole
//!   script ([`Simulator::simulate_script`])
//! - **Migrations**: replay a `V{n}__{name}.sql` directory in version order
//! - **Snapshots**: persist the resulting schema as JSON
//!
//! # Example
//!
//! ```
//! use pgddl::Simulator;
//!
//! let mut sim = Simulator::new();
//! sim.simulate_script(
//!     "CREATE TYPE mood AS ENUM ('sad', 'happy');
//!      ALTER TYPE mood ADD VALUE 'ok' AFTER 'sad';
//!      CREATE TABLE person (id serial PRIMARY KEY, current_mood mood NOT NULL);",
//! )?;
//!
//! assert_eq!(sim.types()["mood"].labels, ["sad", "ok", "happy"]);
//! assert_eq!(sim.tables()["person"].indexes[0].name(), "person_pkey");
//! # Ok::<(), pgddl::SimError>(())
//! ```

pub mod error;
pub mod migrations;
pub mod scan;
pub mod schema;
pub mod script;
pub mod simulator;
pub mod snapshot;

mod lexer;
mod mutate;

pub use error::{ObjectKind, SimError, SimResult};
pub use migrations::{
    DiskMigration, ReplayOptions, ReplayReport, SkippedStatement, replay_dir, replay_file,
    replay_sql, scan_migrations_dir,
};
pub use scan::{Scope, scope, split_top_level};
pub use schema::{
    ColumnDefinition, ColumnModifiers, IndexDefinition, ReferentialAction, SchemaState,
    TableDefinition, TypeDefinition, TypeKind,
};
pub use script::{Statement, split_statements};
pub use simulator::{Simulator, StatementKind, detect_statement_kind};
pub use snapshot::{SNAPSHOT_VERSION, SchemaSnapshot};
