//! Statement dispatcher.
//!
//! [`Simulator::simulate_query`] classifies one DDL statement by its leading keywords and
//! hands it to the matching mutator, which edits the owned [`SchemaState`] in place.
//!
//! # Example
//!
//! ```
//! use pgddl::{IndexDefinition, Simulator};
//!
//! let mut sim = Simulator::new();
//! sim.simulate_query("CREATE TABLE account (id INTEGER PRIMARY KEY)")?;
//! sim.simulate_query("ALTER TABLE account ADD COLUMN email text NOT NULL")?;
//!
//! let account = &sim.tables()["account"];
//! assert!(account.columns["email"].modifiers.not_null);
//! assert!(matches!(account.indexes[0], IndexDefinition::PrimaryKey { .. }));
//! # Ok::<(), pgddl::SimError>(())
//! ```


use crate::error::{SimError, SimResult};
use crate::lexer::Lexer;
use crate::mutate::{table, types};
use crate::schema::{SchemaState, TableDefinition, TypeDefinition};
use crate::script::{skip_leading_comments, split_statements};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Supported DDL statement forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    CreateType,
    AlterType,
    DropType,
    CreateTable,
    AlterTable,
    DropTable,
}

/// Detect which supported DDL form `sql` is, without applying it.
///
/// ```
/// use pgddl::{StatementKind, detect_statement_kind};
///
/// assert_eq!(
///     detect_statement_kind("create type mood as enum ('sad')"),
///     Some(StatementKind::CreateType)
/// );
/// assert_eq!(detect_statement_kind("CREATE TYPE pair AS (a int)"), None);
/// assert_eq!(detect_statement_kind("SELECT 1"), None);
/// ```
pub fn detect_statement_kind(sql: &str) -> Option<StatementKind> {
    classify(&mut Lexer::new(sql)).ok().flatten()
}

/// Consume the leading keywords of a statement and report its kind. The lexer is left
/// just past the object keyword (`TYPE` / `TABLE`).
fn classify(lx: &mut Lexer<'_>) -> SimResult<Option<StatementKind>> {
    let kind = if lx.eat_keywords(&["CREATE", "TYPE"])? {
        let mut ahead = lx.clone();
        ahead.ident()?;
        if !ahead.eat_keywords(&["AS", "ENUM"])? {
            return Ok(None);
        }
        StatementKind::CreateType
    } else if lx.eat_keywords(&["CREATE", "TABLE"])? {
        StatementKind::CreateTable
    } else if lx.eat_keywords(&["ALTER", "TYPE"])? {
        StatementKind::AlterType
    } else if lx.eat_keywords(&["ALTER", "TABLE"])? {
        StatementKind::AlterTable
    } else if lx.eat_keywords(&["DROP", "TYPE"])? {
        StatementKind::DropType
    } else if lx.eat_keywords(&["DROP", "TABLE"])? {
        StatementKind::DropTable
    } else {
        return Ok(None);
    };
    Ok(Some(kind))
}

/// Strip leading comments, surrounding whitespace and trailing semicolons.
fn statement_body(sql: &str) -> SimResult<&str> {
    Ok(skip_leading_comments(sql)?.trim_end_matches(|c: char| c == ';' || c.is_whitespace()))
}

/// Applies DDL statements to an in-memory [`SchemaState`].
///
/// Calls take `&mut self`, so one instance is only ever driven by one caller at a time.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    state: SchemaState,
}

impl Simulator {
    /// Create a simulator with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a simulator over a pre-seeded schema.
    pub fn with_state(state: SchemaState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SchemaState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SchemaState {
        &mut self.state
    }

    pub fn into_state(self) -> SchemaState {
        self.state
    }

    pub fn types(&self) -> &IndexMap<String, TypeDefinition> {
        &self.state.types
    }

    pub fn tables(&self) -> &IndexMap<String, TableDefinition> {
        &self.state.tables
    }

    /// Apply one DDL statement. Comments in front of it are ignored.
    ///
    /// Returns [`SimError::UnsupportedStatement`] for anything outside the supported
    /// forms, [`SimError::Parse`] for malformed input and [`SimError::NotFound`] when the
    /// statement references an unknown object. A failing multi-action `ALTER TABLE` keeps
    /// the actions that ran before the failure.
    pub fn simulate_query(&mut self, sql: &str) -> SimResult<()> {
        let body = statement_body(sql)?;
        let mut lx = Lexer::new(body);

        let Some(kind) = classify(&mut lx)? else {
            return Err(SimError::unsupported(body));
        };
        tracing::debug!(?kind, "simulate statement");

        match kind {
            StatementKind::CreateType => types::create_type(&mut self.state, &mut lx),
            StatementKind::AlterType => types::alter_type(&mut self.state, &mut lx),
            StatementKind::DropType => types::drop_type(&mut self.state, &mut lx),
            StatementKind::CreateTable => table::create_table(&mut self.state, &mut lx),
            StatementKind::AlterTable => table::alter_table(&mut self.state, &mut lx),
            StatementKind::DropTable => table::drop_table(&mut self.state, &mut lx),
        }
    }

    /// Split `sql` into statements and apply them in order, returning how many ran.
    ///
    /// Stops at the first failing statement; its error is wrapped in
    /// [`SimError::Statement`] with the statement's starting line.
    pub fn simulate_script(&mut self, sql: &str) -> SimResult<usize> {
        let statements = split_statements(sql)?;
        for stmt in &statements {
            self.simulate_query(&stmt.sql)
                .map_err(|e| SimError::Statement {
                    line: stmt.line,
                    source: Box::new(e),
                })?;
        }
        Ok(statements.len())
    }
}
