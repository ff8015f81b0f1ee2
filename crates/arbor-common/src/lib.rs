pub mod error;
pub mod row;

// Re-export commonly used types
pub use error::DbError;
pub use row::{ColumnType, Key, Row, Schema, Value};
