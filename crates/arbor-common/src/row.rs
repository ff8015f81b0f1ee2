use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Ordered column-name -> type mapping. Column order is part of the snapshot
/// format, so this must preserve insertion order.
pub type Schema = IndexMap<String, ColumnType>;

/// A single row: ordered column-name -> value mapping.
pub type Row = IndexMap<String, Value>;

/// The four column types a table schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Str,
    Bool,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Str => "str",
            ColumnType::Bool => "bool",
        };
        f.write_str(tag)
    }
}

/// A single cell in a row.
/// Untagged so snapshots use the natural JSON mapping (42, 1.5, "x", true).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    /// The column type this value naturally carries.
    pub fn type_tag(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::Float(_) => ColumnType::Float,
            Value::Str(_) => ColumnType::Str,
            Value::Bool(_) => ColumnType::Bool,
        }
    }

    /// Whether this value is acceptable under the declared column type.
    /// An `Int` is acceptable where a `Float` is declared.
    pub fn matches(&self, ty: ColumnType) -> bool {
        match (self, ty) {
            (Value::Int(_), ColumnType::Int) => true,
            (Value::Int(_), ColumnType::Float) => true,
            (Value::Float(_), ColumnType::Float) => true,
            (Value::Str(_), ColumnType::Str) => true,
            (Value::Bool(_), ColumnType::Bool) => true,
            _ => false,
        }
    }

    /// Builds the index key for this value under the declared column type.
    /// Integers in float columns are widened so the index orders numerically.
    /// Returns `None` for combinations that cannot back an index (any
    /// mismatch, and bool columns, which have no key representation).
    pub fn as_key(&self, ty: ColumnType) -> Option<Key> {
        match (ty, self) {
            (ColumnType::Int, Value::Int(v)) => Some(Key::Int(*v)),
            (ColumnType::Float, Value::Int(v)) => Some(Key::Float(*v as f64)),
            (ColumnType::Float, Value::Float(v)) => Some(Key::Float(*v)),
            (ColumnType::Str, Value::Str(v)) => Some(Key::Str(v.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// A totally ordered primary-key value. An index only ever holds keys of a
/// single logical type; floats are ordered by `total_cmp` so `Ord` is total
/// even in the presence of oddball values.
#[derive(Debug, Clone)]
pub enum Key {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Key {
    fn rank(&self) -> u8 {
        match self {
            Key::Int(_) => 0,
            Key::Float(_) => 1,
            Key::Str(_) => 2,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            (Key::Float(a), Key::Float(b)) => a.total_cmp(b),
            (Key::Str(a), Key::Str(b)) => a.cmp(b),
            // Mixed types never occur within one index; rank keeps Ord total.
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Float(v) => write!(f, "{}", v),
            Key::Str(v) => write!(f, "'{}'", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_json_natural_mapping() {
        let row: Row = IndexMap::from([
            ("id".to_string(), Value::Int(7)),
            ("score".to_string(), Value::Float(91.5)),
            ("name".to_string(), Value::Str("Ada".to_string())),
            ("active".to_string(), Value::Bool(true)),
        ]);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"score":91.5,"name":"Ada","active":true}"#
        );

        // Round-trip keeps both the variants and the column order
        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
        let cols: Vec<&String> = back.keys().collect();
        assert_eq!(cols, ["id", "score", "name", "active"]);
    }

    #[test]
    fn test_untagged_int_float_discrimination() {
        let v: Value = serde_json::from_str("3").unwrap();
        assert_eq!(v, Value::Int(3));
        let v: Value = serde_json::from_str("3.0").unwrap();
        assert_eq!(v, Value::Float(3.0));
    }

    #[test]
    fn test_column_type_tags() {
        assert_eq!(serde_json::to_string(&ColumnType::Int).unwrap(), r#""int""#);
        assert_eq!(
            serde_json::to_string(&ColumnType::Float).unwrap(),
            r#""float""#
        );
        let ty: ColumnType = serde_json::from_str(r#""str""#).unwrap();
        assert_eq!(ty, ColumnType::Str);
        let ty: ColumnType = serde_json::from_str(r#""bool""#).unwrap();
        assert_eq!(ty, ColumnType::Bool);
    }

    #[test]
    fn test_int_accepted_for_float_columns() {
        assert!(Value::Int(2).matches(ColumnType::Float));
        assert!(Value::Int(2).matches(ColumnType::Int));
        assert!(!Value::Float(2.0).matches(ColumnType::Int));
        assert!(!Value::Str("2".into()).matches(ColumnType::Int));
    }

    #[test]
    fn test_key_ordering() {
        assert!(Key::Int(2) < Key::Int(10));
        assert!(Key::Str("apple".into()) < Key::Str("pear".into()));
        assert!(Key::Float(1.5) < Key::Float(2.0));

        // An integer stored in a float column widens and orders numerically
        let k = Value::Int(2).as_key(ColumnType::Float).unwrap();
        assert_eq!(k, Key::Float(2.0));
        assert!(k < Key::Float(2.5));
    }

    #[test]
    fn test_bool_has_no_key() {
        assert!(Value::Bool(true).as_key(ColumnType::Bool).is_none());
        assert!(Value::Str("x".into()).as_key(ColumnType::Int).is_none());
    }
}
