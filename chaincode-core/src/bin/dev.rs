//! Development harness: opens the durable backend and smoke-tests the
//! dispatcher with a single `initialize` round-trip.

use chaincode_core::{contract::OP_INITIALIZE, Config, RocksBackend, Runtime};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(service = %config.service_name, data_dir = ?config.data_dir, "Starting chaincode dev harness");

    let backend = Arc::new(RocksBackend::open(&config)?);
    let runtime = Runtime::new(backend)?;

    runtime.invoke(
        OP_INITIALIZE,
        &[b"__probe".to_vec(), b"pong".to_vec()],
    )?;
    tracing::info!("State store reachable; initialize smoke test committed");

    Ok(())
}
