//! # Store Module
//!
//! The document store connector every persisted object talks to. A store keeps
//! named collections of JSON documents and supports these operations:
//!
//! | Operation | Semantics |
//! |-----------|-----------|
//! | [`DocumentStore::find`]   | matching documents in natural order, after `skip`, at most `limit` |
//! | [`DocumentStore::count`]  | number of matching documents |
//! | [`DocumentStore::upsert`] | set the fields of `doc` on the first match, or insert `filter ∪ doc` |
//! | [`DocumentStore::insert_if_absent`] | insert `filter ∪ doc` unless something matches, atomically |
//! | [`DocumentStore::remove`] | delete every match, returning how many went away |
//!
//! ## Filters
//!
//! A filter is a JSON object. A document matches when every filter entry equals
//! the document's value at that key. Keys may be dotted to reach into nested
//! objects (`Properties.Username`). The empty filter matches everything.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - process-local, for tests and single-node development
//! - [`SqliteStore`] - one SQLite file, documents stored as JSON text
//!
//! Both keep insertion order as their natural order. Calls are blocking from the
//! caller's point of view; inside a `may` coroutine they only park the coroutine.
//!
//! The store is a process-wide resource shared as [`SharedStore`] and injected
//! into every component that needs it.

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A stored document. Always a JSON object.
pub type Document = Map<String, Value>;

/// Equality filter, see the module docs.
pub type Filter = Map<String, Value>;

/// Shared, process-wide store handle.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Failures raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Backend(String),
}

/// Document store connector.
pub trait DocumentStore: Send + Sync {
    /// Find matching documents, skipping `skip` and returning at most `limit`.
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError>;

    /// Count matching documents.
    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Update the first matching document with the fields of `doc`, or insert a
    /// new document built from the filter's fields plus `doc` when none matches.
    fn upsert(&self, collection: &str, filter: &Filter, doc: &Document) -> Result<(), StoreError>;

    /// Insert a document built from the filter's fields plus `doc` unless one
    /// already matches. The check and the insert are one atomic step. Returns
    /// `false` when a match existed and nothing was written.
    fn insert_if_absent(
        &self,
        collection: &str,
        filter: &Filter,
        doc: &Document,
    ) -> Result<bool, StoreError>;

    /// Remove every matching document. Returns the number removed.
    fn remove(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;
}

/// Look up a possibly dotted key inside a document.
#[must_use]
pub fn lookup<'a>(doc: &'a Document, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = parts.next()?;
    let mut current = doc.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// `true` when `doc` satisfies every entry of `filter`.
#[must_use]
pub fn matches(doc: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(key, expected)| lookup(doc, key) == Some(expected))
}

/// Apply `doc`'s top-level fields onto `target`.
pub(crate) fn apply_set(target: &mut Document, doc: &Document) {
    for (k, v) in doc {
        target.insert(k.clone(), v.clone());
    }
}

/// Build the document inserted by an upsert that matched nothing.
///
/// Only plain (undotted) filter keys are carried over; dotted keys describe
/// nested fields and are expected to be present in `doc` itself.
pub(crate) fn seed_document(filter: &Filter, doc: &Document) -> Document {
    let mut seeded: Document = filter
        .iter()
        .filter(|(k, _)| !k.contains('.'))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    apply_set(&mut seeded, doc);
    seeded
}

/// Convenience constructor for a single-key filter.
#[must_use]
pub fn filter_eq(key: &str, value: impl Into<Value>) -> Filter {
    let mut filter = Filter::new();
    filter.insert(key.to_string(), value.into());
    filter
}
