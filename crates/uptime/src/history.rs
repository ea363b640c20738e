//! Durable per-endpoint probe history backed by redb.
//!
//! Each URL maps to one JSON-encoded list of outcomes, oldest first, capped
//! at the store's capacity. Appends run inside a single redb write
//! transaction; redb admits one writer at a time, so concurrent appends to
//! the same URL serialize and none is lost.

use crate::types::{FailureDescriptor, HttpMethod, ProbeOutcome};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Outcome lists keyed by endpoint URL.
const HISTORY: TableDefinition<&str, &[u8]> = TableDefinition::new("history");

/// Default number of outcomes kept per URL.
pub const DEFAULT_HISTORY_SIZE: usize = 48;

/// Result type alias for history store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during history store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupt history for {url}: {reason}")]
    Corrupt { url: String, reason: String },

    #[error("background task failed: {0}")]
    Join(String),
}

macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// One persisted history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredOutcome {
    url: String,
    method: String,
    status: u16,
    expected: u16,
    #[serde(default)]
    error: String,
    #[serde(default)]
    failure: Option<FailureDescriptor>,
    timestamp: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    duration: Duration,
}

impl From<&ProbeOutcome> for StoredOutcome {
    fn from(outcome: &ProbeOutcome) -> Self {
        Self {
            url: outcome.url.clone(),
            method: outcome.method.as_str().to_string(),
            status: outcome.status,
            expected: outcome.expected_status,
            error: outcome.error_message(),
            failure: outcome.failure.clone(),
            timestamp: outcome.started_at,
            duration: outcome.duration,
        }
    }
}

impl StoredOutcome {
    fn into_outcome(self) -> Result<ProbeOutcome, String> {
        if !self.error.is_empty() && self.failure.is_none() {
            return Err(format!("entry has message {:?} but no failure kind", self.error));
        }

        Ok(ProbeOutcome {
            url: self.url,
            method: HttpMethod::parse_lossy(&self.method),
            expected_status: self.expected,
            status: self.status,
            started_at: self.timestamp,
            duration: self.duration,
            failure: self.failure,
        })
    }
}

fn decode(url: &str, bytes: &[u8]) -> StoreResult<Vec<StoredOutcome>> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Thread-safe history store backed by redb.
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<Database>,
    capacity: usize,
}

impl HistoryStore {
    /// Open (or create) a persistent store at the given path.
    ///
    /// A `capacity` of zero falls back to [`DEFAULT_HISTORY_SIZE`].
    pub fn open(path: &Path, capacity: usize) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::with_database(db, capacity)?;
        debug!(?path, capacity = store.capacity, "history store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory(capacity: usize) -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::with_database(db, capacity)?;
        debug!(capacity = store.capacity, "in-memory history store opened");
        Ok(store)
    }

    fn with_database(db: Database, capacity: usize) -> StoreResult<Self> {
        let capacity = if capacity == 0 {
            DEFAULT_HISTORY_SIZE
        } else {
            capacity
        };
        let store = Self {
            db: Arc::new(db),
            capacity,
        };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(HISTORY).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Maximum number of outcomes kept per URL.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an outcome to its URL's history, evicting the oldest entries
    /// beyond capacity. Returns the resulting history length.
    pub fn append(&self, outcome: &ProbeOutcome) -> StoreResult<usize> {
        let url = outcome.url.as_str();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let len;
        {
            let mut table = txn.open_table(HISTORY).map_err(map_err!(Table))?;
            let mut entries = match table.get(url).map_err(map_err!(Read))? {
                Some(guard) => decode(url, guard.value())?,
                None => Vec::new(),
            };

            entries.push(StoredOutcome::from(outcome));
            if entries.len() > self.capacity {
                let excess = entries.len() - self.capacity;
                entries.drain(..excess);
            }
            len = entries.len();

            let value = serde_json::to_vec(&entries).map_err(map_err!(Serialize))?;
            table
                .insert(url, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%url, len, "outcome appended");
        Ok(len)
    }

    /// Full history for `url`, oldest first. Empty if the URL was never probed.
    pub fn read(&self, url: &str) -> StoreResult<Vec<ProbeOutcome>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(HISTORY).map_err(map_err!(Table))?;
        let entries = match table.get(url).map_err(map_err!(Read))? {
            Some(guard) => decode(url, guard.value())?,
            None => return Ok(Vec::new()),
        };

        entries
            .into_iter()
            .map(|entry| {
                entry.into_outcome().map_err(|reason| StoreError::Corrupt {
                    url: url.to_string(),
                    reason,
                })
            })
            .collect()
    }

    /// Every URL with a history record, in no particular order.
    pub fn list_keys(&self) -> StoreResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(HISTORY).map_err(map_err!(Table))?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    /// Decode every record, failing on the first corrupt one.
    /// Returns the number of records checked.
    pub fn verify(&self) -> StoreResult<usize> {
        let keys = self.list_keys()?;
        for url in &keys {
            self.read(url)?;
        }
        Ok(keys.len())
    }

    /// [`append`](Self::append) on the blocking thread pool.
    pub async fn append_async(&self, outcome: ProbeOutcome) -> StoreResult<usize> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.append(&outcome))
            .await
            .map_err(map_err!(Join))?
    }

    /// [`read`](Self::read) on the blocking thread pool.
    pub async fn read_async(&self, url: String) -> StoreResult<Vec<ProbeOutcome>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.read(&url))
            .await
            .map_err(map_err!(Join))?
    }

    /// [`list_keys`](Self::list_keys) on the blocking thread pool.
    pub async fn list_keys_async(&self) -> StoreResult<Vec<String>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.list_keys())
            .await
            .map_err(map_err!(Join))?
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, url: &str, bytes: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(HISTORY).map_err(map_err!(Table))?;
            table.insert(url, bytes).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}
