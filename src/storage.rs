// The storage backend is an external collaborator: an opaque path->bytes
// map, touched only at the serialization boundary.

use crate::error::{out_of_bounds, Result};
use std::collections::BTreeMap;

// Keyed by path strings; used only to persist/retrieve an encoder's
// serialized bytes.
pub trait StorageProvider {
    fn get(&self, path: &str) -> Result<Vec<u8>>;
    fn put(&mut self, path: &str, bytes: Vec<u8>);
    fn delete(&mut self, path: &str) -> Result<()>;
    fn iter(&self) -> Vec<String>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Default just loops; a networked provider would override to fetch
    // concurrently.
    fn get_all(&self, paths: &[String]) -> Result<Vec<Vec<u8>>> {
        paths.iter().map(|p| self.get(p)).collect()
    }

    fn put_all(&mut self, entries: Vec<(String, Vec<u8>)>) {
        for (path, bytes) in entries {
            self.put(&path, bytes);
        }
    }
}

// Backed by a BTreeMap rather than a hash map so iteration order is
// deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageProvider {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStorageProvider {
    pub fn new() -> Self {
        MemoryStorageProvider {
            entries: BTreeMap::new(),
        }
    }
}

impl StorageProvider for MemoryStorageProvider {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| out_of_bounds(format!("no such path in storage: {path:?}")))
    }

    fn put(&mut self, path: &str, bytes: Vec<u8>) {
        self.entries.insert(path.to_string(), bytes);
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        self.entries
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| out_of_bounds(format!("no such path in storage: {path:?}")))
    }

    fn iter(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
