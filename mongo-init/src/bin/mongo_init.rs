//! MongoDB bootstrap entrypoint
//!
//! Runs once at environment startup, before the application accepts traffic.
//! Safe to re-run: everything already provisioned is left as it is.
//! Exits non-zero on any fatal error so the orchestrator can retry or halt.

use anyhow::{Context, Result};
use common::init_logging;
use mongo_init::{run_bootstrap, BootstrapConfig, MongoServer};
use tracing::{error, info, warn};

async fn run() -> Result<()> {
    let config = BootstrapConfig::load().context("Invalid bootstrap configuration")?;

    info!(
        database = %config.database,
        username = %config.credential.username,
        collections = ?config.collections,
        strategy = %config.strategy,
        "MongoDB bootstrap starting..."
    );

    if config.uses_default_password() {
        warn!(
            username = %config.credential.username,
            "Using the built-in default password, set MONGO_APP_PASSWORD"
        );
    }

    let server = MongoServer::connect(&config)
        .await
        .context("Failed to configure MongoDB client")?;

    run_bootstrap(&server, &config)
        .await
        .context("MongoDB bootstrap failed")?;

    Ok(())
}

#[tokio::main]
async fn main() {
    let _guard = init_logging("mongo-init");

    if let Err(e) = run().await {
        error!(error = %format!("{:#}", e), "Bootstrap aborted");
        std::process::exit(1);
    }
}
