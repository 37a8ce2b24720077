//! State-store seam between the handler and the hosting ledger
//!
//! The handler never touches a database directly. Every invocation runs
//! against a [`StateTransaction`] that buffers writes and records the
//! version of each key it reads; [`StateBackend::commit`] applies the write
//! set atomically only if every read key is still at the observed version.
//! Two concurrent invocations that read-modify-write the same key therefore
//! cannot both commit: the loser fails with [`Error::Conflict`] and leaves
//! no partial state behind.
//!
//! [`MemoryBackend`] is the in-process fake used by tests and embedded
//! deployments; the durable RocksDB implementation lives in
//! [`crate::storage`].

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// UTC+8, the ledger's fixed display timezone for commit timestamps
const LEDGER_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// A stored value together with its commit version
///
/// Versions start at 1 on first write and increase by one per committed
/// overwrite. An absent key is observed as version 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    /// Commit version of this value
    pub version: u64,
    /// Raw stored bytes
    pub bytes: Vec<u8>,
}

/// Keyed byte-string store with read-conflict detection
///
/// Implementations must make `commit` atomic: either the whole write set
/// becomes visible or none of it does, and the read-set validation and the
/// apply must not interleave with another commit.
pub trait StateBackend: Send + Sync {
    /// Read the current value and version at `key`, if any
    fn snapshot(&self, key: &str) -> Result<Option<Versioned>>;

    /// Validate `reads` (key -> observed version) and, if every key is
    /// unchanged, apply `writes` atomically
    fn commit(&self, reads: &HashMap<String, u64>, writes: &HashMap<String, Vec<u8>>)
        -> Result<()>;
}

/// Per-invocation execution context supplied by the hosting runtime
///
/// Carries the transaction identifier and commit time that UplinkWork stamps
/// into new Work records. Production ledgers supply these; [`generate`]
/// mints them for embedded or test deployments.
///
/// [`generate`]: TxContext::generate
#[derive(Debug, Clone)]
pub struct TxContext {
    tx_id: String,
    commit_seconds: i64,
    commit_nanos: u32,
}

impl TxContext {
    /// Build a context from runtime-supplied values
    pub fn new(tx_id: impl Into<String>, commit_seconds: i64, commit_nanos: u32) -> Self {
        Self {
            tx_id: tx_id.into(),
            commit_seconds,
            commit_nanos,
        }
    }

    /// Mint a context from the local clock with a UUIDv7 transaction id
    pub fn generate() -> Self {
        let now = Utc::now();
        Self {
            tx_id: Uuid::now_v7().to_string(),
            commit_seconds: now.timestamp(),
            commit_nanos: now.timestamp_subsec_nanos(),
        }
    }

    /// Identifier of this invocation's transaction
    pub fn transaction_id(&self) -> &str {
        &self.tx_id
    }

    /// Commit time as (seconds, nanoseconds) since the Unix epoch
    pub fn commit_timestamp(&self) -> (i64, u32) {
        (self.commit_seconds, self.commit_nanos)
    }

    /// Commit time rendered as `YYYY-MM-DD HH:MM:SS` in UTC+8
    pub fn formatted_timestamp(&self) -> Result<String> {
        let offset = FixedOffset::east_opt(LEDGER_UTC_OFFSET_SECS)
            .ok_or_else(|| Error::Timestamp("ledger timezone offset out of range".to_string()))?;
        let utc = DateTime::<Utc>::from_timestamp(self.commit_seconds, self.commit_nanos)
            .ok_or_else(|| {
                Error::Timestamp(format!(
                    "commit time out of range: {}s {}ns",
                    self.commit_seconds, self.commit_nanos
                ))
            })?;
        Ok(utc
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string())
    }
}

/// Buffered read-modify-write session for one invocation
///
/// Reads go to the backend snapshot (recording the observed version, absent
/// keys as version 0) unless the key was already written in this session, in
/// which case the buffered value is returned. Nothing reaches the backend
/// until [`commit`](StateTransaction::commit).
pub struct StateTransaction<'a> {
    backend: &'a dyn StateBackend,
    ctx: TxContext,
    reads: HashMap<String, u64>,
    writes: HashMap<String, Vec<u8>>,
}

impl<'a> StateTransaction<'a> {
    /// Begin a session against `backend` with the given execution context
    pub fn begin(backend: &'a dyn StateBackend, ctx: TxContext) -> Self {
        Self {
            backend,
            ctx,
            reads: HashMap::new(),
            writes: HashMap::new(),
        }
    }

    /// Execution context of this invocation
    pub fn ctx(&self) -> &TxContext {
        &self.ctx
    }

    /// Read the value at `key`, observing this session's own writes first
    pub fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(Some(buffered.clone()));
        }

        match self.backend.snapshot(key)? {
            Some(entry) => {
                self.reads.entry(key.to_string()).or_insert(entry.version);
                Ok(Some(entry.bytes))
            }
            None => {
                self.reads.entry(key.to_string()).or_insert(0);
                Ok(None)
            }
        }
    }

    /// Buffer a write of `value` under `key`
    ///
    /// A key written without a prior read is a blind write: it does not
    /// join the read set and cannot cause a commit conflict.
    pub fn put(&mut self, key: &str, value: Vec<u8>) {
        tracing::debug!(tx_id = %self.ctx.tx_id, key, bytes = value.len(), "State write buffered");
        self.writes.insert(key.to_string(), value);
    }

    /// Validate the read set and apply the buffered writes atomically
    ///
    /// A read-only session commits trivially without touching the backend.
    pub fn commit(self) -> Result<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.backend.commit(&self.reads, &self.writes)
    }
}

/// In-memory versioned state store
///
/// Backend of record for tests and for embedding the handler without a
/// durable database. Conflict detection matches the durable backend:
/// commit takes the write lock, validates the read set, then applies.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Versioned>>,
}

impl MemoryBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored (for tests and diagnostics)
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StateBackend for MemoryBackend {
    fn snapshot(&self, key: &str) -> Result<Option<Versioned>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn commit(
        &self,
        reads: &HashMap<String, u64>,
        writes: &HashMap<String, Vec<u8>>,
    ) -> Result<()> {
        let mut entries = self.entries.write();

        for (key, observed) in reads {
            let current = entries.get(key).map(|e| e.version).unwrap_or(0);
            if current != *observed {
                return Err(Error::Conflict(key.clone()));
            }
        }

        for (key, bytes) in writes {
            let next = entries.get(key).map(|e| e.version).unwrap_or(0) + 1;
            entries.insert(
                key.clone(),
                Versioned {
                    version: next,
                    bytes: bytes.clone(),
                },
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(id: &str) -> TxContext {
        TxContext::new(id, 1_700_000_000, 0)
    }

    #[test]
    fn test_get_put_commit() {
        let backend = MemoryBackend::new();

        let mut tx = StateTransaction::begin(&backend, ctx("tx-1"));
        assert!(tx.get("k").unwrap().is_none());
        tx.put("k", b"v1".to_vec());
        assert_eq!(tx.get("k").unwrap().unwrap(), b"v1");
        tx.commit().unwrap();

        let mut tx = StateTransaction::begin(&backend, ctx("tx-2"));
        assert_eq!(tx.get("k").unwrap().unwrap(), b"v1");
    }

    #[test]
    fn test_lost_update_rejected() {
        let backend = MemoryBackend::new();

        let mut setup = StateTransaction::begin(&backend, ctx("tx-0"));
        setup.put("k", b"base".to_vec());
        setup.commit().unwrap();

        // Both sessions read version 1, then race to append.
        let mut first = StateTransaction::begin(&backend, ctx("tx-1"));
        let mut second = StateTransaction::begin(&backend, ctx("tx-2"));
        first.get("k").unwrap();
        second.get("k").unwrap();
        first.put("k", b"first".to_vec());
        second.put("k", b"second".to_vec());

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, Error::Conflict(ref key) if key.as_str() == "k"));

        let entry = backend.snapshot("k").unwrap().unwrap();
        assert_eq!(entry.bytes, b"first");
        assert_eq!(entry.version, 2);
    }

    #[test]
    fn test_blind_write_does_not_conflict() {
        let backend = MemoryBackend::new();

        let mut setup = StateTransaction::begin(&backend, ctx("tx-0"));
        setup.put("k", b"base".to_vec());
        setup.commit().unwrap();

        let mut overwriter = StateTransaction::begin(&backend, ctx("tx-1"));
        overwriter.put("k", b"replaced".to_vec());

        // Another commit lands in between; the blind write still succeeds.
        let mut other = StateTransaction::begin(&backend, ctx("tx-2"));
        other.put("k", b"interleaved".to_vec());
        other.commit().unwrap();

        overwriter.commit().unwrap();
        assert_eq!(backend.snapshot("k").unwrap().unwrap().bytes, b"replaced");
    }

    #[test]
    fn test_read_of_absent_key_conflicts_with_create() {
        let backend = MemoryBackend::new();

        let mut reader = StateTransaction::begin(&backend, ctx("tx-1"));
        assert!(reader.get("fresh").unwrap().is_none());
        reader.put("fresh", b"from-reader".to_vec());

        let mut creator = StateTransaction::begin(&backend, ctx("tx-2"));
        creator.put("fresh", b"from-creator".to_vec());
        creator.commit().unwrap();

        // The reader observed version 0; the key now exists at version 1.
        assert!(matches!(reader.commit(), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_read_only_commit_is_noop() {
        let backend = MemoryBackend::new();
        let mut tx = StateTransaction::begin(&backend, ctx("tx-1"));
        assert!(tx.get("missing").unwrap().is_none());
        tx.commit().unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_formatted_timestamp_is_utc_plus_8() {
        let ctx = TxContext::new("tx-1", 0, 0);
        assert_eq!(ctx.formatted_timestamp().unwrap(), "1970-01-01 08:00:00");

        let ctx = TxContext::new("tx-2", 1_700_000_000, 500);
        assert_eq!(ctx.formatted_timestamp().unwrap(), "2023-11-15 06:13:20");
    }

    #[test]
    fn test_generated_context_has_id_and_time() {
        let ctx = TxContext::generate();
        assert!(!ctx.transaction_id().is_empty());
        let (seconds, _) = ctx.commit_timestamp();
        assert!(seconds > 0);
        assert!(!ctx.formatted_timestamp().unwrap().is_empty());
    }
}
