//! StateStore — redb-backed record of which slot is live.
//!
//! The live record is the single source of truth the resolver reads at the
//! start of every run. It is updated in the same write transaction that
//! appends the deployment record, so the two never disagree.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use cutover_core::{DeploymentRecord, LiveRecord};

use crate::error::{StateError, StateResult};
use crate::tables::*;

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

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }
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

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(LIVE).map_err(map_err!(Table))?;
        txn.open_table(RECORDS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// The current live record, if any deployment has ever completed.
    pub fn live(&self) -> StateResult<Option<LiveRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(LIVE).map_err(map_err!(Table))?;
        match table.get(LIVE_KEY).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: LiveRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Commit a completed switch: replace the live record and append the
    /// deployment record in one transaction.
    pub fn record_switch(&self, record: &DeploymentRecord) -> StateResult<LiveRecord> {
        let live = LiveRecord {
            slot: record.new_slot,
            version: record.new_version.clone(),
            updated_at: record.timestamp,
        };
        let live_value = serde_json::to_vec(&live).map_err(map_err!(Serialize))?;
        let record_value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(LIVE).map_err(map_err!(Table))?;
            table
                .insert(LIVE_KEY, live_value.as_slice())
                .map_err(map_err!(Write))?;
            let mut table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            // Switches within the same millisecond get increasing suffixes.
            let mut seq = 0;
            let key = loop {
                let key = record_key(record, seq);
                if table.get(key.as_str()).map_err(map_err!(Read))?.is_none() {
                    break key;
                }
                seq += 1;
            };
            table
                .insert(key.as_str(), record_value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(slot = %live.slot, version = %live.version, "live record updated");
        Ok(live)
    }

    /// Most recent deployment records, newest first.
    pub fn recent_records(&self, limit: usize) -> StateResult<Vec<DeploymentRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))?.rev() {
            if results.len() >= limit {
                break;
            }
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: DeploymentRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }
}

fn record_key(record: &DeploymentRecord, seq: u32) -> String {
    format!("{:020}-{seq:04}", record.timestamp.timestamp_millis().max(0))
}
