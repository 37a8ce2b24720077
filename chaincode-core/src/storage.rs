//! Durable state backend using RocksDB
//!
//! # Layout
//!
//! One column family, `state`, holds every ledger key. Each value is an
//! 8-byte big-endian commit version followed by the stored payload; the
//! version feeds the read-set validation in [`StateBackend::commit`]. The
//! validate-and-apply path is serialized behind a commit lock and applies
//! the whole write set with a single atomic `WriteBatch`.

use crate::{
    error::{Error, Result},
    store::{StateBackend, Versioned},
    Config,
};
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options, WriteBatch, DB};
use std::collections::HashMap;

/// Column family holding the ledger state
const CF_STATE: &str = "state";

/// Length of the version prefix on every stored value
const VERSION_PREFIX_LEN: usize = 8;

/// RocksDB-backed state store
pub struct RocksBackend {
    db: DB,
    // Serializes read-set validation with write application.
    commit_lock: Mutex<()>,
}

impl RocksBackend {
    /// Open or create the database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for an append-heavy keyspace
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(CF_STATE, Self::cf_options_state())];
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB state store at {:?}", path);

        Ok(Self {
            db,
            commit_lock: Mutex::new(()),
        })
    }

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // State is frequently read back, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_STATE)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_STATE)))
    }

    fn decode_entry(raw: &[u8]) -> Result<Versioned> {
        if raw.len() < VERSION_PREFIX_LEN {
            return Err(Error::Storage(format!(
                "corrupt state entry: {} bytes, expected at least {}",
                raw.len(),
                VERSION_PREFIX_LEN
            )));
        }
        let version = u64::from_be_bytes(
            raw[..VERSION_PREFIX_LEN]
                .try_into()
                .map_err(|_| Error::Storage("corrupt version prefix".to_string()))?,
        );
        Ok(Versioned {
            version,
            bytes: raw[VERSION_PREFIX_LEN..].to_vec(),
        })
    }

    fn encode_entry(version: u64, payload: &[u8]) -> Vec<u8> {
        let mut raw = Vec::with_capacity(VERSION_PREFIX_LEN + payload.len());
        raw.extend_from_slice(&version.to_be_bytes());
        raw.extend_from_slice(payload);
        raw
    }

    fn current_version(&self, key: &str) -> Result<u64> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(raw) => Ok(Self::decode_entry(&raw)?.version),
            None => Ok(0),
        }
    }
}

impl StateBackend for RocksBackend {
    fn snapshot(&self, key: &str) -> Result<Option<Versioned>> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(raw) => Ok(Some(Self::decode_entry(&raw)?)),
            None => Ok(None),
        }
    }

    fn commit(
        &self,
        reads: &HashMap<String, u64>,
        writes: &HashMap<String, Vec<u8>>,
    ) -> Result<()> {
        let _guard = self.commit_lock.lock();

        for (key, observed) in reads {
            let current = self.current_version(key)?;
            if current != *observed {
                tracing::debug!(key = %key, observed = *observed, current, "Commit rejected on stale read");
                return Err(Error::Conflict(key.clone()));
            }
        }

        let cf = self.cf()?;
        let mut batch = WriteBatch::default();
        for (key, payload) in writes {
            let next = self.current_version(key)? + 1;
            batch.put_cf(cf, key.as_bytes(), Self::encode_entry(next, payload));
        }

        self.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StateTransaction, TxContext};
    use tempfile::TempDir;

    fn test_backend() -> (RocksBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (RocksBackend::open(&config).unwrap(), temp_dir)
    }

    #[test]
    fn test_open_and_round_trip() {
        let (backend, _temp) = test_backend();

        let mut tx = StateTransaction::begin(&backend, TxContext::new("tx-1", 0, 0));
        tx.put("k", b"payload".to_vec());
        tx.commit().unwrap();

        let entry = backend.snapshot("k").unwrap().unwrap();
        assert_eq!(entry.version, 1);
        assert_eq!(entry.bytes, b"payload");
    }

    #[test]
    fn test_versions_increment_per_commit() {
        let (backend, _temp) = test_backend();

        for expected in 1..=3u64 {
            let mut tx = StateTransaction::begin(&backend, TxContext::new("tx", 0, 0));
            tx.put("k", vec![expected as u8]);
            tx.commit().unwrap();
            assert_eq!(backend.snapshot("k").unwrap().unwrap().version, expected);
        }
    }

    #[test]
    fn test_stale_read_rejected() {
        let (backend, _temp) = test_backend();

        let mut setup = StateTransaction::begin(&backend, TxContext::new("tx-0", 0, 0));
        setup.put("k", b"base".to_vec());
        setup.commit().unwrap();

        let mut first = StateTransaction::begin(&backend, TxContext::new("tx-1", 0, 0));
        let mut second = StateTransaction::begin(&backend, TxContext::new("tx-2", 0, 0));
        first.get("k").unwrap();
        second.get("k").unwrap();
        first.put("k", b"first".to_vec());
        second.put("k", b"second".to_vec());

        first.commit().unwrap();
        assert!(matches!(second.commit(), Err(Error::Conflict(_))));
        assert_eq!(backend.snapshot("k").unwrap().unwrap().bytes, b"first");
    }

    #[test]
    fn test_write_set_is_atomic() {
        let (backend, _temp) = test_backend();

        let mut tx = StateTransaction::begin(&backend, TxContext::new("tx-1", 0, 0));
        tx.put("a", b"1".to_vec());
        tx.put("b", b"2".to_vec());
        tx.put("c", b"3".to_vec());
        tx.commit().unwrap();

        for key in ["a", "b", "c"] {
            assert!(backend.snapshot(key).unwrap().is_some());
        }
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        {
            let backend = RocksBackend::open(&config).unwrap();
            let mut tx = StateTransaction::begin(&backend, TxContext::new("tx-1", 0, 0));
            tx.put("durable", b"yes".to_vec());
            tx.commit().unwrap();
        }

        let backend = RocksBackend::open(&config).unwrap();
        let entry = backend.snapshot("durable").unwrap().unwrap();
        assert_eq!(entry.bytes, b"yes");
        assert_eq!(entry.version, 1);
    }
}
