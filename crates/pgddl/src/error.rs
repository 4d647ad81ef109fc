//! Error types for pgddl

use std::fmt;
use thiserror::Error;

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;

/// Kind of schema object referenced by a [`SimError::NotFound`] or
/// [`SimError::AlreadyExists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Type,
    EnumLabel,
    Table,
    Column,
    Constraint,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Type => "type",
            ObjectKind::EnumLabel => "enum label",
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Constraint => "constraint",
        };
        f.write_str(s)
    }
}

/// Error type for simulator operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// The statement is not one of the supported DDL forms.
    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),
    /// The statement is structurally invalid.
    #[error("Parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },
    /// A referenced type, table, column, label or constraint does not exist.
    #[error("{kind} \"{name}\" does not exist")]
    NotFound { kind: ObjectKind, name: String },
    /// The object being created already exists.
    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: ObjectKind, name: String },
    /// A statement inside a script failed.
    #[error("statement at line {line}: {source}")]
    Statement {
        line: usize,
        #[source]
        source: Box<SimError>,
    },
    /// A statement inside a named script file failed.
    #[error("{file}: {source}")]
    InFile {
        file: String,
        #[source]
        source: Box<SimError>,
    },
    /// IO error while reading migrations or snapshots.
    #[error("IO error: {0}")]
    Io(String),
    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SimError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        SimError::Parse {
            message: message.into(),
            offset,
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        SimError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create an already-exists error.
    pub fn already_exists(kind: ObjectKind, name: impl Into<String>) -> Self {
        SimError::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Create an unsupported-statement error, keeping only the head of the statement.
    pub fn unsupported(sql: &str) -> Self {
        let head: String = sql.trim().chars().take(60).collect();
        SimError::UnsupportedStatement(head)
    }

    /// Returns the innermost error, unwrapping [`SimError::Statement`] and
    /// [`SimError::InFile`] layers.
    pub fn root(&self) -> &SimError {
        match self {
            SimError::Statement { source, .. } | SimError::InFile { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns true if this is (or wraps) an unsupported-statement error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self.root(), SimError::UnsupportedStatement(_))
    }

    /// Returns true if this is (or wraps) a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self.root(), SimError::Parse { .. })
    }

    /// Returns true if this is (or wraps) a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), SimError::NotFound { .. })
    }
}
