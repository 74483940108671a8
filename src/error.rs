//! Error type shared by every layer of the store.

use thiserror::Error;

use crate::data_type::DataType;

/// Errors reported by the table engine and the database store.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database {0:?} already exists")]
    DatabaseAlreadyExists(String),

    #[error("database {0:?} does not exist")]
    DatabaseNotFound(String),

    #[error("invalid database name {0:?}")]
    InvalidDatabaseName(String),

    #[error("table {0:?} already exists")]
    TableAlreadyExists(String),

    #[error("table {0:?} does not exist")]
    TableNotFound(String),

    #[error("invalid column definition {0:?}, use the format 'column_name:type'")]
    InvalidColumnSyntax(String),

    #[error("unsupported data type {0:?}, supported types are: integer, string, float, boolean")]
    UnsupportedType(String),

    #[error("column {0:?} is defined more than once")]
    DuplicateColumn(String),

    #[error("table {table:?} expects {expected} values, got {found}")]
    ColumnCountMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid value {value:?} (expected {expected})")]
    TypeMismatch { value: String, expected: DataType },

    #[error("column {0:?} does not exist")]
    UnknownColumn(String),

    #[error("invalid condition {0:?}, supported operators: =, !=, <, <=, >, >=")]
    InvalidConditionSyntax(String),

    #[error("invalid assignment {0:?}, use the format 'column=value'")]
    InvalidAssignmentSyntax(String),

    #[error("invalid sort order {0:?}, expected asc or desc")]
    InvalidSortOrder(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt database document: {0}")]
    CorruptDocument(String),
}

impl Error {
    /// Returns true when the failure came from durable storage rather than from
    /// validating the operation's inputs.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Serialization(_) | Error::CorruptDocument(_)
        )
    }

    pub(crate) fn type_mismatch(value: impl Into<String>, expected: DataType) -> Self {
        Error::TypeMismatch {
            value: value.into(),
            expected,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
