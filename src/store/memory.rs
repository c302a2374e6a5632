use super::{apply_set, matches, seed_document, Document, DocumentStore, Filter, StoreError};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// In-process document store.
///
/// Collections are plain vectors, so natural order is insertion order. Reads
/// take a shared lock; writes take the exclusive lock for the duration of one
/// operation only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collections that currently hold at least one document.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.collections
            .read()
            .values()
            .filter(|docs| !docs.is_empty())
            .count()
    }
}

impl DocumentStore for MemoryStore {
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read();
        let found: Vec<Document> = guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches(d, filter))
                    .skip(skip)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        trace!(collection, found = found.len(), "memory find");
        Ok(found)
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let guard = self.collections.read();
        let n = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count())
            .unwrap_or(0);
        Ok(n as u64)
    }

    fn upsert(&self, collection: &str, filter: &Filter, doc: &Document) -> Result<(), StoreError> {
        let mut guard = self.collections.write();
        let docs = guard.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| matches(d, filter)) {
            Some(existing) => apply_set(existing, doc),
            None => docs.push(seed_document(filter, doc)),
        }
        Ok(())
    }

    fn insert_if_absent(
        &self,
        collection: &str,
        filter: &Filter,
        doc: &Document,
    ) -> Result<bool, StoreError> {
        let mut guard = self.collections.write();
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| matches(d, filter)) {
            return Ok(false);
        }
        docs.push(seed_document(filter, doc));
        Ok(true)
    }

    fn remove(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut guard = self.collections.write();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !matches(d, filter));
        Ok((before - docs.len()) as u64)
    }
}
