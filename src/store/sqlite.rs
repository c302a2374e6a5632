//! SQLite-backed document store.
//!
//! # Invariants
//! - All collections share one `documents` table; `id` order is natural order.
//! - Bodies are JSON objects serialized as text.
//! - Each operation runs under the connection mutex; writes run in a transaction.

use super::{apply_set, matches, seed_document, Document, DocumentStore, Filter, StoreError};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    collection  TEXT NOT NULL,
    body        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, id);
";

/// Document store persisted in a single SQLite database.
///
/// Filtering happens in process after loading a collection's rows, so this
/// backend suits small-to-medium collections.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let started_at = Instant::now();
        let path = path.as_ref();
        info!(path = %path.display(), "Opening sqlite document store");
        let conn = Connection::open(path).map_err(|err| {
            error!(
                path = %path.display(),
                duration_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "Failed to open sqlite document store"
            );
            err
        })?;
        Self::bootstrap(conn, started_at)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let started_at = Instant::now();
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn, started_at)
    }

    fn bootstrap(conn: Connection, started_at: Instant) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        info!(
            duration_ms = started_at.elapsed().as_millis() as u64,
            "Sqlite document store ready"
        );
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_rows(conn: &Connection, collection: &str) -> Result<Vec<(i64, Document)>, StoreError> {
        let mut stmt =
            conn.prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row?;
            docs.push((id, serde_json::from_str::<Document>(&body)?));
        }
        Ok(docs)
    }
}

impl DocumentStore for SqliteStore {
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let conn = self.conn.lock();
        Ok(Self::load_rows(&conn, collection)?
            .into_iter()
            .map(|(_, doc)| doc)
            .filter(|doc| matches(doc, filter))
            .skip(skip)
            .take(limit)
            .collect())
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let n = Self::load_rows(&conn, collection)?
            .iter()
            .filter(|(_, doc)| matches(doc, filter))
            .count();
        Ok(n as u64)
    }

    fn upsert(&self, collection: &str, filter: &Filter, doc: &Document) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let existing = Self::load_rows(&tx, collection)?
            .into_iter()
            .find(|(_, d)| matches(d, filter));
        match existing {
            Some((id, mut current)) => {
                apply_set(&mut current, doc);
                tx.execute(
                    "UPDATE documents SET body = ?1 WHERE id = ?2",
                    params![serde_json::to_string(&current)?, id],
                )?;
            }
            None => {
                let seeded = seed_document(filter, doc);
                tx.execute(
                    "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
                    params![collection, serde_json::to_string(&seeded)?],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_if_absent(
        &self,
        collection: &str,
        filter: &Filter,
        doc: &Document,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if Self::load_rows(&tx, collection)?
            .iter()
            .any(|(_, d)| matches(d, filter))
        {
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
            params![collection, serde_json::to_string(&seed_document(filter, doc))?],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn remove(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let ids: Vec<i64> = Self::load_rows(&tx, collection)?
            .into_iter()
            .filter(|(_, d)| matches(d, filter))
            .map(|(id, _)| id)
            .collect();
        for id in &ids {
            tx.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(ids.len() as u64)
    }
}
