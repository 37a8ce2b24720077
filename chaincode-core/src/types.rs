//! Core record types for the provenance ledger
//!
//! All records serialize to JSON with camelCase field names, which is the
//! payload shape the upstream HTTP glue renders to callers. Round-trips
//! must be lossless: a record written to the state store and read back
//! decodes field-for-field identical.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public-key identifier of a registered party
///
/// Derived externally from an asymmetric key pair and treated here as an
/// opaque string. It doubles as the ledger key under which the party's
/// [`Identity`] record is stored; there is no secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Create new identity key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered party: individual creator or hosting organization
///
/// Identities are created by explicit registration and never deleted. The
/// only mutation after creation is appending to `works`; insertion order is
/// registration order. Re-registering the same key overwrites the whole
/// record, silently discarding the accumulated `works` back-references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Ledger key this record is stored under
    #[serde(default)]
    pub public_key_id: String,

    /// Human-readable name of the party
    #[serde(default)]
    pub display_name: String,

    /// Works this party created or uplinked, in registration order
    #[serde(default)]
    pub works: Vec<Work>,
}

impl Identity {
    /// Create a fresh identity with no registered works
    pub fn new(display_name: impl Into<String>, key: &IdentityKey) -> Self {
        Self {
            public_key_id: key.as_str().to_string(),
            display_name: display_name.into(),
            works: Vec::new(),
        }
    }

    /// Serialize to the JSON wire form
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a record read back from the state store
    ///
    /// An absent key decodes to the zero-valued record rather than an
    /// explicit not-found error; queries against unknown keys therefore
    /// yield an empty name or an empty works list.
    pub fn decode(bytes: Option<&[u8]>) -> Result<Self> {
        match bytes {
            Some(buf) => Ok(serde_json::from_slice(buf)?),
            None => Ok(Self::default()),
        }
    }
}

/// Immutable provenance record of a creative work
///
/// Created exactly once at uplink time and never mutated or deleted. The
/// same value is embedded in the owner's and the organization's `works`
/// lists and stored independently under its `content_address` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    /// Identity key of the creator
    pub owner_key_id: String,

    /// Organization descriptor supplied by the uploading party; in practice
    /// a previously registered identity key
    pub org_info: String,

    /// Content-addressable storage identifier for the work's bytes
    pub content_address: String,

    /// File name of the work
    pub work_name: String,

    /// Commit time of the registering transaction, `YYYY-MM-DD HH:MM:SS`
    /// in UTC+8
    pub timestamp: String,

    /// Identifier of the registering transaction
    pub transaction_id: String,
}

impl Work {
    /// Serialize to the JSON wire form
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a record read back from the state store
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
