/// Reference key -> value store backed by an unordered `Vec`.
///
/// Every operation is a linear scan. It exists purely as the baseline the
/// B+ tree is measured and differentially tested against; nothing in the
/// database proper uses it.
#[derive(Debug, Clone)]
pub struct LinearStore<K, V> {
    entries: Vec<(K, V)>,
}

impl<K: Ord, V> LinearStore<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `key -> value`, overwriting an existing entry for the key.
    pub fn insert(&mut self, key: K, value: V) {
        for entry in &mut self.entries {
            if entry.0 == key {
                entry.1 = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    pub fn search(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn update(&mut self, key: &K, value: V) -> bool {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    /// All entries with `lo <= key <= hi`, key-sorted so the result lines up
    /// with a tree range scan.
    pub fn range(&self, lo: &K, hi: &K) -> Vec<(&K, &V)> {
        let mut hits: Vec<(&K, &V)> = self
            .entries
            .iter()
            .filter(|(k, _)| k >= lo && k <= hi)
            .map(|(k, v)| (k, v))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(b.0));
        hits
    }

    /// Every entry, key-sorted.
    pub fn scan(&self) -> Vec<(&K, &V)> {
        let mut all: Vec<(&K, &V)> = self.entries.iter().map(|(k, v)| (k, v)).collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}

impl<K: Ord, V> Default for LinearStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
