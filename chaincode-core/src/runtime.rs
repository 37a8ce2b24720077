//! Invocation driver tying the contract to a state backend
//!
//! Models the hosting ledger runtime at whole-invocation granularity: each
//! call to [`Runtime::invoke`] begins a fresh [`StateTransaction`],
//! dispatches through the contract, and commits the buffered write set only
//! if the operation succeeded. A failure at any step, including read-set
//! validation at commit, leaves the backend untouched, which is the
//! all-or-nothing contract UplinkWork's dual identity writes depend on.

use crate::{
    contract::SmartContract,
    error::Result,
    metrics::Metrics,
    store::{StateBackend, StateTransaction, TxContext},
};
use std::sync::Arc;
use std::time::Instant;

/// Dispatches invocations against a state backend
pub struct Runtime {
    backend: Arc<dyn StateBackend>,
    contract: SmartContract,
    metrics: Metrics,
}

impl Runtime {
    /// Create a runtime over `backend`
    pub fn new(backend: Arc<dyn StateBackend>) -> Result<Self> {
        Ok(Self {
            backend,
            contract: SmartContract::new(),
            metrics: Metrics::new()?,
        })
    }

    /// Execute one invocation with a locally minted execution context
    ///
    /// Use [`invoke_with_context`](Runtime::invoke_with_context) when the
    /// hosting ledger supplies the transaction id and commit time.
    pub fn invoke(&self, operation: &str, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        self.invoke_with_context(TxContext::generate(), operation, args)
    }

    /// Execute one invocation under the given execution context
    pub fn invoke_with_context(
        &self,
        ctx: TxContext,
        operation: &str,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>> {
        let start = Instant::now();
        let tx_id = ctx.transaction_id().to_string();
        self.metrics.record_invocation(operation);

        let mut tx = StateTransaction::begin(self.backend.as_ref(), ctx);
        let outcome = self
            .contract
            .invoke(&mut tx, operation, args)
            .and_then(|payload| {
                tx.commit()?;
                Ok(payload)
            });

        self.metrics.record_duration(start.elapsed().as_secs_f64());
        match &outcome {
            Ok(payload) => {
                tracing::debug!(tx_id = %tx_id, operation, payload_len = payload.len(), "Invocation committed");
            }
            Err(err) => {
                self.metrics.record_failure(operation);
                tracing::warn!(tx_id = %tx_id, operation, error = %err, "Invocation failed");
            }
        }
        outcome
    }

    /// Metrics registry for scraping
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
