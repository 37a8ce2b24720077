//! The transaction handler: named operations over the keyed state store
//!
//! Each operation is a stateless "read key → decode → mutate → encode →
//! write key" sequence against the [`StateTransaction`] it is handed; the
//! invocation driver commits the session afterwards so the whole operation
//! is all-or-nothing. Wire operation names match the upstream glue:
//! `initialize`, `registerUser`, `queryUser`, `queryUplink`, `queryVideo`,
//! `videoUplink`.

use crate::{
    error::{Error, Result},
    store::StateTransaction,
    types::{Identity, IdentityKey, Work},
};

/// Wire name of the connectivity smoke-test operation
pub const OP_INITIALIZE: &str = "initialize";
/// Wire name of identity registration
pub const OP_REGISTER_USER: &str = "registerUser";
/// Wire name of the display-name query
pub const OP_QUERY_USER: &str = "queryUser";
/// Wire name of the per-identity works query
pub const OP_QUERY_UPLINK: &str = "queryUplink";
/// Wire name of the per-work query
pub const OP_QUERY_VIDEO: &str = "queryVideo";
/// Wire name of work registration
pub const OP_VIDEO_UPLINK: &str = "videoUplink";

/// The provenance smart contract
///
/// Holds no state of its own: all durable state lives behind the session's
/// backend, and every invocation starts from what it reads back.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmartContract;

impl SmartContract {
    /// Create the contract
    pub fn new() -> Self {
        Self
    }

    /// Route `(operation, args)` to the matching operation
    ///
    /// Unknown names fail with [`Error::UnknownOperation`] and buffer no
    /// writes. The returned payload may be empty.
    pub fn invoke(
        &self,
        tx: &mut StateTransaction<'_>,
        operation: &str,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>> {
        match operation {
            OP_INITIALIZE => self.initialize(tx, args),
            OP_REGISTER_USER => self.register_identity(tx, args),
            OP_QUERY_USER => self.query_identity_name(tx, args),
            OP_QUERY_UPLINK => self.query_works(tx, args),
            OP_QUERY_VIDEO => self.query_work(tx, args),
            OP_VIDEO_UPLINK => self.uplink_work(tx, args),
            other => Err(Error::UnknownOperation(other.to_string())),
        }
    }

    /// `initialize(key, value)`: write `value` under `key` verbatim
    ///
    /// Smoke-tests ledger connectivity; carries no domain semantics and no
    /// decoding of either argument.
    pub fn initialize(&self, tx: &mut StateTransaction<'_>, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        expect_args(args, 2)?;
        let key = text_arg(args, 0)?;
        tx.put(key, args[1].clone());
        Ok(Vec::new())
    }

    /// `registerUser(displayName, publicKeyId)`: create an identity record
    ///
    /// Writes unconditionally under `publicKeyId`, returning the serialized
    /// record. There is no prior-existence check: re-registering a key
    /// silently discards the previously accumulated works back-references
    /// at that key. Inherited behavior, kept for output compatibility, and
    /// a known correctness risk for callers that re-submit registrations.
    pub fn register_identity(
        &self,
        tx: &mut StateTransaction<'_>,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>> {
        expect_args(args, 2)?;
        let display_name = text_arg(args, 0)?;
        let key = IdentityKey::new(text_arg(args, 1)?);

        let identity = Identity::new(display_name, &key);
        let payload = identity.encode()?;
        tx.put(key.as_str(), payload.clone());

        tracing::info!(tx_id = %tx.ctx().transaction_id(), key = %key, "Identity registered");
        Ok(payload)
    }

    /// `queryUser(publicKeyId)`: return only the identity's display name
    ///
    /// An absent key decodes to the zero-valued record, so the payload is
    /// empty rather than a not-found error.
    pub fn query_identity_name(
        &self,
        tx: &mut StateTransaction<'_>,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>> {
        expect_args(args, 1)?;
        let key = IdentityKey::new(text_arg(args, 0)?);

        let stored = tx.get(key.as_str())?;
        if stored.is_none() {
            tracing::debug!(key = %key, "Identity key absent; returning empty name");
        }
        let identity = Identity::decode(stored.as_deref())?;
        Ok(identity.display_name.into_bytes())
    }

    /// `queryUplink(publicKeyId)`: return the identity's serialized works list
    ///
    /// Same absent-key leniency as `queryUser`: an unregistered key yields
    /// an empty JSON list.
    pub fn query_works(&self, tx: &mut StateTransaction<'_>, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        expect_args(args, 1)?;
        let key = IdentityKey::new(text_arg(args, 0)?);

        let stored = tx.get(key.as_str())?;
        if stored.is_none() {
            tracing::debug!(key = %key, "Identity key absent; returning empty works list");
        }
        let identity = Identity::decode(stored.as_deref())?;
        Ok(serde_json::to_vec(&identity.works)?)
    }

    /// `queryVideo(contentAddress)`: return the raw stored Work bytes
    ///
    /// Undecoded pass-through; a missing content address yields an empty
    /// payload with no error.
    pub fn query_work(&self, tx: &mut StateTransaction<'_>, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        expect_args(args, 1)?;
        let content_address = text_arg(args, 0)?;

        Ok(tx.get(content_address)?.unwrap_or_default())
    }

    /// `videoUplink(ownerKeyId, orgInfo, contentAddress, workName)`
    ///
    /// Stamps the new Work with the session's commit time and transaction
    /// id, appends a reference to both the owner's and the organization's
    /// identity records, and stores the Work independently under its
    /// content address. The three writes commit together or not at all;
    /// read-set validation at commit rejects lost updates against either
    /// identity key.
    pub fn uplink_work(&self, tx: &mut StateTransaction<'_>, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        expect_args(args, 4)?;
        let owner_key = IdentityKey::new(text_arg(args, 0)?);
        let org_key = IdentityKey::new(text_arg(args, 1)?);
        let content_address = text_arg(args, 2)?;
        let work_name = text_arg(args, 3)?;

        let work = Work {
            owner_key_id: owner_key.as_str().to_string(),
            org_info: org_key.as_str().to_string(),
            content_address: content_address.to_string(),
            work_name: work_name.to_string(),
            timestamp: tx.ctx().formatted_timestamp()?,
            transaction_id: tx.ctx().transaction_id().to_string(),
        };

        // Owner back-reference.
        let mut owner = Identity::decode(tx.get(owner_key.as_str())?.as_deref())?;
        owner.works.push(work.clone());
        tx.put(owner_key.as_str(), owner.encode()?);

        // Organization back-reference. When owner and org are the same key
        // this reads the buffered owner write, so both references land in
        // the single record instead of one silently overwriting the other.
        let mut org = Identity::decode(tx.get(org_key.as_str())?.as_deref())?;
        org.works.push(work.clone());
        tx.put(org_key.as_str(), org.encode()?);

        // Independent lookup by content address.
        tx.put(content_address, work.encode()?);

        tracing::info!(
            tx_id = %tx.ctx().transaction_id(),
            owner = %owner_key,
            org = %org_key,
            content_address,
            "Work uplinked"
        );
        Ok(Vec::new())
    }
}

/// Validate the argument count for an operation
fn expect_args(args: &[Vec<u8>], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::ArgumentCount {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

/// Decode argument `idx` as UTF-8 text
fn text_arg(args: &[Vec<u8>], idx: usize) -> Result<&str> {
    std::str::from_utf8(&args[idx])
        .map_err(|_| Error::InvalidArgument(format!("argument {} is not valid UTF-8", idx)))
}
