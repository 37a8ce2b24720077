//! Copyright Provenance Chaincode
//!
//! Transaction handler registering ownership of digital works and the
//! identities of the parties that create or host them, as immutable
//! records in a keyed ledger state store.
//!
//! # Architecture
//!
//! - **Stateless invocations**: every operation starts from what it reads
//!   back out of the store; no in-process state survives between calls
//! - **Buffered transactions**: writes stage in a session and commit
//!   atomically, or not at all
//! - **Optimistic concurrency**: commit validates the read set per key, so
//!   racing appends to the same identity cannot both land
//! - **Append-only audit trail**: identities are never deleted, works never
//!   mutated
//!
//! # Invariants
//!
//! - Every uplinked work is traceable to both its creator and the
//!   organization that uplinked it
//! - Every write carries the committing transaction's id and timestamp
//! - Lost updates are rejected at commit, never silently absorbed

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod contract;
pub mod error;
pub mod metrics;
pub mod runtime;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use config::Config;
pub use contract::SmartContract;
pub use error::{Error, Result};
pub use runtime::Runtime;
pub use storage::RocksBackend;
pub use store::{MemoryBackend, StateBackend, StateTransaction, TxContext, Versioned};
pub use types::{Identity, IdentityKey, Work};
