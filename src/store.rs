use std::collections::HashMap;

use crate::types::DictionaryEntry;

/// Entries of the latest applied lookup, keyed by result id.
///
/// Plain map with no locking of its own; the owning session serialises access.
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: HashMap<String, DictionaryEntry>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&DictionaryEntry> {
        self.entries.get(id)
    }

    pub fn put(&mut self, entry: DictionaryEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Swap in a new batch; nothing from the previous lookup survives.
    pub fn replace(&mut self, entries: impl IntoIterator<Item = DictionaryEntry>) {
        self.clear();
        for entry in entries {
            self.put(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
