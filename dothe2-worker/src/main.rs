//! # Dothe2 Worker
//!
//! Deletes expired login tokens on a fixed interval until Ctrl+C.
//!
//! ```bash
//! cargo run -p dothe2-worker
//! ```

use anyhow::Context;
use dothe2_shared::{clock::system_clock, db::pool, store::postgres::PgStore};
use dothe2_worker::{config::WorkerConfig, sweeper::TokenSweeper};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dothe2_worker=debug,dothe2_shared=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Dothe2 Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env().context("Failed to load configuration")?;
    let db = pool::create_pool(config.database.clone())
        .await
        .context("Failed to connect to database")?;

    let sweeper = TokenSweeper::new(
        Arc::new(PgStore::new(db.clone())),
        system_clock(),
        config.sweeper,
    );

    let shutdown = sweeper.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });

    sweeper.run().await;

    pool::close_pool(db).await;
    Ok(())
}
