use crate::table::{Table, TableSnapshot};
use arbor_common::{DbError, Schema};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default snapshot root: snapshots live at `data/<db>/db.json`.
const DATA_ROOT: &str = "data";

/// A named collection of tables with JSON snapshot persistence.
#[derive(Debug)]
pub struct Database {
    name: String,
    tables: IndexMap<String, Table>,
}

/// The persisted image of a whole database.
#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub name: String,
    pub tables: IndexMap<String, TableSnapshot>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: IndexMap::new(),
        }
    }

    /// Loads the snapshot for `name` if one exists, otherwise starts empty.
    pub fn open(name: &str) -> Self {
        Self::load(name).unwrap_or_else(|| Self::new(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a table. Fails if the name is taken or the primary key is
    /// not usable (not in the schema, or not an indexable type).
    pub fn create_table(
        &mut self,
        name: impl Into<String>,
        schema: Schema,
        primary_key: impl Into<String>,
    ) -> Result<(), DbError> {
        let name = name.into();
        if self.tables.contains_key(&name) {
            return Err(DbError::TableExists(name));
        }
        let table = Table::new(name.clone(), schema, primary_key)?;
        self.tables.insert(name, table);
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> bool {
        self.tables.shift_remove(name).is_some()
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Table names in creation order.
    pub fn list_tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn to_snapshot(&self) -> DatabaseSnapshot {
        DatabaseSnapshot {
            name: self.name.clone(),
            tables: self
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), table.to_snapshot()))
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: DatabaseSnapshot) -> Result<Self, DbError> {
        let mut tables = IndexMap::new();
        for (name, table) in snapshot.tables {
            tables.insert(name, Table::from_snapshot(table)?);
        }
        Ok(Self {
            name: snapshot.name,
            tables,
        })
    }

    /// Writes the snapshot to `data/<name>/db.json`.
    pub fn save(&self) -> Result<(), DbError> {
        self.save_in(DATA_ROOT)
    }

    /// Writes the snapshot under an explicit root directory. The write is a
    /// whole-file replacement of `<root>/<name>/db.json`.
    pub fn save_in(&self, root: impl AsRef<Path>) -> Result<(), DbError> {
        let dir = root.as_ref().join(&self.name);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(&self.to_snapshot())?;
        fs::write(dir.join("db.json"), json)?;
        info!(database = %self.name, "snapshot saved");
        Ok(())
    }

    /// Loads the snapshot at `data/<name>/db.json`, if present.
    pub fn load(name: &str) -> Option<Self> {
        Self::load_from(DATA_ROOT, name)
    }

    /// Loads a snapshot from an explicit root directory.
    ///
    /// A missing snapshot is `None`; unreadable or corrupt snapshots also
    /// come back as `None`, with a logged warning, so callers see one
    /// "absent" answer either way.
    pub fn load_from(root: impl AsRef<Path>, name: &str) -> Option<Self> {
        let path = root.as_ref().join(name).join("db.json");
        if !path.exists() {
            return None;
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!(%name, %err, "snapshot unreadable");
                return None;
            }
        };
        let snapshot: DatabaseSnapshot = match serde_json::from_str(&text) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%name, %err, "snapshot corrupt");
                return None;
            }
        };
        match Self::from_snapshot(snapshot) {
            Ok(db) => Some(db),
            Err(err) => {
                warn!(%name, %err, "snapshot rows rejected");
                None
            }
        }
    }
}
