//! StateStore — redb-backed state persistence for scenegrid.
//!
//! `StateStore` owns the database; `Tx` is one write transaction over it.
//! The typed operations for each table live in sibling modules as `impl Tx`
//! blocks and are built on the JSON helpers defined here. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::{ALL_TABLES, JsonTable};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

/// A single write transaction.
///
/// redb admits one writer at a time, so `begin` blocks while another `Tx`
/// is live. Dropping a `Tx` without calling [`Tx::commit`] rolls it back.
pub struct Tx {
    txn: WriteTransaction,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        for def in ALL_TABLES {
            txn.open_table(def).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Begin a write transaction.
    pub fn begin(&self) -> StateResult<Tx> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        Ok(Tx { txn })
    }
}

impl Tx {
    /// Make every write of this transaction durable and visible.
    pub fn commit(self) -> StateResult<()> {
        self.txn.commit().map_err(map_err!(Transaction))
    }

    /// Discard every write of this transaction.
    pub fn rollback(self) -> StateResult<()> {
        self.txn.abort().map_err(map_err!(Transaction))
    }

    // ── JSON helpers ───────────────────────────────────────────────

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        def: JsonTable,
        key: &str,
    ) -> StateResult<Option<T>> {
        let table = self.txn.open_table(def).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn contains_key(&self, def: JsonTable, key: &str) -> StateResult<bool> {
        let table = self.txn.open_table(def).map_err(map_err!(Table))?;
        Ok(table.get(key).map_err(map_err!(Read))?.is_some())
    }

    /// Insert or overwrite.
    pub(crate) fn put_json<T: Serialize>(
        &self,
        def: JsonTable,
        key: &str,
        value: &T,
    ) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let mut table = self.txn.open_table(def).map_err(map_err!(Table))?;
        table
            .insert(key, bytes.as_slice())
            .map_err(map_err!(Write))?;
        Ok(())
    }

    /// Insert only if `key` is absent. Fails with `NotUnique` otherwise.
    pub(crate) fn insert_new_json<T: Serialize>(
        &self,
        def: JsonTable,
        key: &str,
        value: &T,
    ) -> StateResult<()> {
        if self.contains_key(def, key)? {
            return Err(StateError::NotUnique(key.to_string()));
        }
        self.put_json(def, key, value)
    }

    /// Remove a key. Returns true if it existed.
    pub(crate) fn remove_key(&self, def: JsonTable, key: &str) -> StateResult<bool> {
        let mut table = self.txn.open_table(def).map_err(map_err!(Table))?;
        let existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        Ok(existed)
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub(crate) fn scan_prefix<T: DeserializeOwned>(
        &self,
        def: JsonTable,
        prefix: &str,
    ) -> StateResult<Vec<(String, T)>> {
        let table = self.txn.open_table(def).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.range(prefix..).map_err(map_err!(Read))? {
            let (key_guard, value_guard) = entry.map_err(map_err!(Read))?;
            let key = key_guard.value();
            if !key.starts_with(prefix) {
                break;
            }
            let value: T =
                serde_json::from_slice(value_guard.value()).map_err(map_err!(Deserialize))?;
            results.push((key.to_string(), value));
        }
        Ok(results)
    }

    /// Remove every listed key. Returns number removed.
    pub(crate) fn remove_keys(&self, def: JsonTable, keys: &[String]) -> StateResult<u32> {
        let mut table = self.txn.open_table(def).map_err(map_err!(Table))?;
        let mut count = 0;
        for key in keys {
            if table.remove(key.as_str()).map_err(map_err!(Write))?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::RUNTIMES;
    use crate::types::Runtime;

    fn test_runtime(id: &str) -> Runtime {
        Runtime {
            id: id.to_string(),
            tenant: "t1".to_string(),
            name: format!("rt-{id}"),
            description: None,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    #[test]
    fn committed_writes_are_visible() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.put_json(RUNTIMES, "r1", &test_runtime("r1")).unwrap();
        tx.commit().unwrap();

        let tx = store.begin().unwrap();
        let rt: Option<Runtime> = tx.get_json(RUNTIMES, "r1").unwrap();
        assert_eq!(rt, Some(test_runtime("r1")));
    }

    #[test]
    fn rollback_discards_writes() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.put_json(RUNTIMES, "r1", &test_runtime("r1")).unwrap();
        tx.rollback().unwrap();

        let tx = store.begin().unwrap();
        assert!(!tx.contains_key(RUNTIMES, "r1").unwrap());
    }

    #[test]
    fn dropped_transaction_is_rolled_back() {
        let store = StateStore::open_in_memory().unwrap();
        {
            let tx = store.begin().unwrap();
            tx.put_json(RUNTIMES, "r1", &test_runtime("r1")).unwrap();
        }
        let tx = store.begin().unwrap();
        assert!(!tx.contains_key(RUNTIMES, "r1").unwrap());
    }

    #[test]
    fn insert_new_rejects_existing_key() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.insert_new_json(RUNTIMES, "r1", &test_runtime("r1")).unwrap();
        let err = tx
            .insert_new_json(RUNTIMES, "r1", &test_runtime("r1"))
            .unwrap_err();
        assert!(matches!(err, StateError::NotUnique(_)));
    }

    #[test]
    fn scan_prefix_stops_at_prefix_boundary() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        for key in ["a/1", "a/2", "ab/1", "b/1"] {
            tx.put_json(RUNTIMES, key, &test_runtime(key)).unwrap();
        }
        let found: Vec<(String, Runtime)> = tx.scan_prefix(RUNTIMES, "a/").unwrap();
        let keys: Vec<_> = found.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a/1", "a/2"]);

        let all: Vec<(String, Runtime)> = tx.scan_prefix(RUNTIMES, "").unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn remove_keys_counts_existing_only() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.put_json(RUNTIMES, "r1", &test_runtime("r1")).unwrap();
        let removed = tx
            .remove_keys(RUNTIMES, &["r1".to_string(), "r2".to_string()])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!tx.remove_key(RUNTIMES, "r1").unwrap());
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            let tx = store.begin().unwrap();
            tx.put_json(RUNTIMES, "r1", &test_runtime("r1")).unwrap();
            tx.commit().unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        let tx = store.begin().unwrap();
        let rt: Option<Runtime> = tx.get_json(RUNTIMES, "r1").unwrap();
        assert_eq!(rt.unwrap().name, "rt-r1");
    }
}
