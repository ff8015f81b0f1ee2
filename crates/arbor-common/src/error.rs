use crate::row::{ColumnType, Key};
use thiserror::Error;

/// Everything the table and database layers can refuse or fail on.
/// Plain lookups that merely miss return `Option` instead.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Table `{0}` not found")]
    TableNotFound(String),

    #[error("Table `{0}` already exists")]
    TableExists(String),

    #[error("Primary key column `{0}` is not in the schema")]
    UnknownPrimaryKey(String),

    #[error("Column `{column}` ({ty}) cannot back a primary-key index")]
    UnsupportedKeyType { column: String, ty: ColumnType },

    #[error("Row is missing column `{0}`")]
    MissingColumn(String),

    #[error("Unknown column `{0}`")]
    UnknownColumn(String),

    #[error("Column `{column}` expects {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("Duplicate primary key {0}")]
    DuplicateKey(Key),

    #[error("No row with primary key {0}")]
    RowNotFound(Key),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot Error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
