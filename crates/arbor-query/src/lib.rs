//! The relational layer: tables with schema validation and primary-key
//! uniqueness over a B+ tree index, the database container with JSON
//! snapshot persistence, and the SQL bulk loader.

pub mod database;
pub mod sql;
pub mod table;


use arbor_common::DbError;
use thiserror::Error;

pub use database::{Database, DatabaseSnapshot};
pub use table::{Table, TableSnapshot};

#[derive(Error, Debug)]
pub enum SqlError {
    #[error("SQL Parse Error: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    #[error("Unsupported SQL: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Db(#[from] DbError),
}
