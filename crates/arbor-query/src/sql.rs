//! Bulk loader: replays external `INSERT` statements through the table
//! layer, so loaded rows pass exactly the same validation as any other
//! insert.

use crate::database::Database;
use crate::SqlError;
use arbor_common::{DbError, Row, Value};
use sqlparser::ast::{Expr, Ident, Query, SetExpr, Statement, UnaryOperator, Value as SqlValue, Values};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::path::Path;
use tracing::{debug, warn};

/// Replays every `INSERT ... VALUES` statement in `sql`. Other statement
/// kinds are skipped, as the loader only moves data. Returns the number of
/// rows inserted; the first refused row aborts the load.
pub fn load_sql(db: &mut Database, sql: &str) -> Result<usize, SqlError> {
    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, sql)?;

    let mut inserted = 0;
    let mut skipped = 0;
    for statement in &statements {
        match statement {
            Statement::Insert {
                table_name,
                columns,
                source,
                ..
            } => {
                let query = source.as_ref().ok_or_else(|| {
                    SqlError::Unsupported("INSERT without a VALUES source".to_string())
                })?;
                inserted += apply_insert(db, &table_name.to_string(), columns, query)?;
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "ignored non-INSERT statements");
    }
    debug!(inserted, "bulk load finished");
    Ok(inserted)
}

/// Reads a file and replays its INSERT statements.
pub fn load_sql_file(db: &mut Database, path: impl AsRef<Path>) -> Result<usize, SqlError> {
    let sql = std::fs::read_to_string(path).map_err(DbError::from)?;
    load_sql(db, &sql)
}

fn apply_insert(
    db: &mut Database,
    table_name: &str,
    columns: &[Ident],
    query: &Query,
) -> Result<usize, SqlError> {
    let value_rows = match &*query.body {
        SetExpr::Values(Values { rows, .. }) => rows,
        _ => {
            return Err(SqlError::Unsupported(
                "only INSERT ... VALUES is supported".to_string(),
            ))
        }
    };

    // An omitted column list means schema order
    let column_names: Vec<String> = {
        let table = db
            .get_table(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        if columns.is_empty() {
            table.schema().keys().cloned().collect()
        } else {
            columns.iter().map(|c| c.value.clone()).collect()
        }
    };

    let table = db
        .get_table_mut(table_name)
        .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;

    let mut count = 0;
    for exprs in value_rows {
        if exprs.len() != column_names.len() {
            return Err(SqlError::Unsupported(format!(
                "expected {} values, got {}",
                column_names.len(),
                exprs.len()
            )));
        }
        let mut row = Row::new();
        for (column, expr) in column_names.iter().zip(exprs) {
            row.insert(column.clone(), literal(expr)?);
        }
        table.insert(row)?;
        count += 1;
    }
    Ok(count)
}

/// Maps a SQL literal onto a row value.
fn literal(expr: &Expr) -> Result<Value, SqlError> {
    match expr {
        Expr::Value(SqlValue::Number(n, _)) => number(n),
        Expr::Value(SqlValue::SingleQuotedString(s)) => Ok(Value::Str(s.clone())),
        Expr::Value(SqlValue::Boolean(b)) => Ok(Value::Bool(*b)),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            Value::Int(v) => Ok(Value::Int(-v)),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(SqlError::Unsupported(format!("cannot negate {}", other))),
        },
        other => Err(SqlError::Unsupported(format!(
            "unsupported literal: {}",
            other
        ))),
    }
}

fn number(text: &str) -> Result<Value, SqlError> {
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().map(Value::Float)
    } else {
        text.parse::<i64>()
            .map(Value::Int)
            .or_else(|_| text.parse::<f64>().map(Value::Float))
    }
    .map_err(|_| SqlError::Unsupported(format!("bad numeric literal: {}", text)))
}
