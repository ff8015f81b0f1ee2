use arbor_common::{ColumnType, DbError, Key, Row, Schema, Value};
use arbor_store::BPlusTree;
use serde::{Deserialize, Serialize};

/// Branching order of every table's primary-key index.
const INDEX_ORDER: usize = 5;

/// A named table: schema validation and primary-key uniqueness wrapped
/// around one B+ tree index.
///
/// The row list keeps insertion order and is the authoritative persistence
/// image; the index maps primary keys to rows and is rebuilt from the list
/// on load. Both views always hold exactly the same primary keys.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    primary_key: String,
    key_type: ColumnType,
    index: BPlusTree<Key, Row>,
    rows: Vec<Row>,
}

/// The persisted image of a table. Only the rows are stored; the index is
/// a deterministic function of their order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    pub schema: Schema,
    pub primary_key: String,
    pub rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table. Fails if `primary_key` is not a schema
    /// column, or names a column whose type cannot back an index (bool).
    pub fn new(
        name: impl Into<String>,
        schema: Schema,
        primary_key: impl Into<String>,
    ) -> Result<Self, DbError> {
        let name = name.into();
        let primary_key = primary_key.into();
        let key_type = *schema
            .get(&primary_key)
            .ok_or_else(|| DbError::UnknownPrimaryKey(primary_key.clone()))?;
        if key_type == ColumnType::Bool {
            return Err(DbError::UnsupportedKeyType {
                column: primary_key,
                ty: key_type,
            });
        }
        Ok(Self {
            name,
            schema,
            primary_key,
            key_type,
            index: BPlusTree::new(INDEX_ORDER),
            rows: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Read access to the primary-key index, for visualisers.
    pub fn index(&self) -> &BPlusTree<Key, Row> {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn index_key(&self, value: &Value) -> Result<Key, DbError> {
        value.as_key(self.key_type).ok_or_else(|| DbError::TypeMismatch {
            column: self.primary_key.clone(),
            expected: self.key_type,
            actual: value.type_tag(),
        })
    }

    fn validate(&self, row: &Row) -> Result<(), DbError> {
        for column in self.schema.keys() {
            if !row.contains_key(column) {
                return Err(DbError::MissingColumn(column.clone()));
            }
        }
        for (column, value) in row {
            let ty = self
                .schema
                .get(column)
                .ok_or_else(|| DbError::UnknownColumn(column.clone()))?;
            if !value.matches(*ty) {
                return Err(DbError::TypeMismatch {
                    column: column.clone(),
                    expected: *ty,
                    actual: value.type_tag(),
                });
            }
        }
        Ok(())
    }

    /// Position of the row with `key` in the insertion-ordered list.
    fn position_of(&self, key: &Key) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.get(&self.primary_key)
                .and_then(|v| v.as_key(self.key_type))
                .map_or(false, |k| k == *key)
        })
    }

    /// Validates and inserts `row`; refuses primary-key duplicates.
    /// A refused insert leaves the table untouched.
    pub fn insert(&mut self, row: Row) -> Result<(), DbError> {
        self.validate(&row)?;
        let pk = row
            .get(&self.primary_key)
            .ok_or_else(|| DbError::MissingColumn(self.primary_key.clone()))?;
        let key = self.index_key(pk)?;
        if self.index.search(&key).is_some() {
            return Err(DbError::DuplicateKey(key));
        }
        self.index.insert(key, row.clone());
        self.rows.push(row);
        Ok(())
    }

    pub fn select(&self, pk: &Value) -> Option<&Row> {
        let key = self.index_key(pk).ok()?;
        self.index.search(&key)
    }

    /// Rows whose primary key falls in `[lo, hi]`, in key order.
    pub fn select_range(&self, lo: &Value, hi: &Value) -> Result<Vec<&Row>, DbError> {
        let lo = self.index_key(lo)?;
        let hi = self.index_key(hi)?;
        Ok(self.index.range(&lo, &hi).map(|(_, row)| row).collect())
    }

    /// Every row, in primary-key order via the leaf chain.
    pub fn select_all(&self) -> impl Iterator<Item = &Row> {
        self.index.iter().map(|(_, row)| row)
    }

    /// Rows satisfying `predicate`, in primary-key order.
    pub fn select_where(&self, predicate: impl Fn(&Row) -> bool) -> Vec<&Row> {
        self.select_all().filter(|row| predicate(row)).collect()
    }

    /// Applies `patch` to the row with primary key `pk`.
    ///
    /// The patched candidate is validated in full before anything changes.
    /// When the patch re-keys the row, the new key's uniqueness is checked
    /// first and the delete + insert happen as one step, so a refused update
    /// always leaves the table untouched.
    pub fn update(&mut self, pk: &Value, patch: &Row) -> Result<(), DbError> {
        let key = self.index_key(pk)?;
        let current = self
            .index
            .search(&key)
            .ok_or_else(|| DbError::RowNotFound(key.clone()))?;

        let mut candidate = current.clone();
        for (column, value) in patch {
            if !self.schema.contains_key(column) {
                return Err(DbError::UnknownColumn(column.clone()));
            }
            candidate.insert(column.clone(), value.clone());
        }
        self.validate(&candidate)?;

        let new_pk = candidate
            .get(&self.primary_key)
            .ok_or_else(|| DbError::MissingColumn(self.primary_key.clone()))?;
        let new_key = self.index_key(new_pk)?;

        if new_key != key {
            if self.index.search(&new_key).is_some() {
                return Err(DbError::DuplicateKey(new_key));
            }
            self.index.remove(&key);
            if let Some(pos) = self.position_of(&key) {
                self.rows.remove(pos);
            }
            self.index.insert(new_key, candidate.clone());
            self.rows.push(candidate);
        } else {
            self.index.update(&key, candidate.clone());
            if let Some(pos) = self.position_of(&key) {
                self.rows[pos] = candidate;
            }
        }
        Ok(())
    }

    /// Removes the row with primary key `pk`. Absent keys return `false`
    /// and leave the table untouched.
    pub fn delete(&mut self, pk: &Value) -> bool {
        let Ok(key) = self.index_key(pk) else {
            return false;
        };
        if self.index.remove(&key).is_none() {
            return false;
        }
        if let Some(pos) = self.position_of(&key) {
            self.rows.remove(pos);
        }
        true
    }

    pub fn to_snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            name: self.name.clone(),
            schema: self.schema.clone(),
            primary_key: self.primary_key.clone(),
            rows: self.rows.clone(),
        }
    }

    /// Rebuilds a table by replaying `insert` over the snapshot rows in
    /// their original order. Rows that fail validation mean the snapshot is
    /// corrupt and surface as errors.
    pub fn from_snapshot(snapshot: TableSnapshot) -> Result<Self, DbError> {
        let mut table = Table::new(snapshot.name, snapshot.schema, snapshot.primary_key)?;
        for row in snapshot.rows {
            table.insert(row)?;
        }
        Ok(table)
    }
}
