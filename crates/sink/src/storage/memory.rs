use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use bytes::Bytes;

use super::StorageBackend;
use crate::{error::StorageResult, FileKind};

/// Keeps every file in memory. Useful for tests and for hosts which serve
/// the presentation from the same process.
#[derive(Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.lock().unwrap().contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().unwrap().is_empty()
    }

    /// Names of all stored files, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of successful writes since creation.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> Arc<Mutex<HashMap<String, Bytes>>> {
        self.files
    }
}

impl StorageBackend for MemoryStorage {
    async fn store(&self, name: &str, content: Bytes, _kind: FileKind) -> StorageResult<()> {
        self.files.lock().unwrap().insert(name.to_string(), content);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        self.files.lock().unwrap().remove(name);
        Ok(())
    }

    fn location_hint(&self) -> Option<String> {
        Some("memory".to_string())
    }
}
