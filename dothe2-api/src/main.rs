//! # Dothe2 API Server
//!
//! Passwordless login and an Eisenhower-matrix task board over HTTP.
//!
//! Startup: load configuration, connect to PostgreSQL, apply migrations, seed
//! the four default quadrants, then serve until Ctrl+C.
//!
//! ```bash
//! cargo run -p dothe2-api
//! ```

use anyhow::Context;
use dothe2_api::{
    app::{build_router, AppState},
    config::Config,
    email::SmtpSender,
};
use dothe2_shared::{
    auth::secret::OsSecretSource,
    clock::system_clock,
    db::{migrations::run_migrations, pool},
    notify::{LogNotifier, NotificationSender},
    services::Services,
    store::postgres::PgStore,
};
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dothe2_api=debug,dothe2_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Dothe2 API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    let db = pool::create_pool(config.pool_config())
        .await
        .context("Failed to connect to database")?;
    run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;

    let notifier: Arc<dyn NotificationSender> = match &config.email {
        Some(email) => {
            tracing::info!(host = %email.smtp_host, port = email.smtp_port, "SMTP delivery enabled");
            Arc::new(SmtpSender::new(email).context("Invalid SMTP configuration")?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, login emails will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let services = Services::new(
        Arc::new(PgStore::new(db.clone())),
        notifier,
        Arc::new(OsSecretSource),
        system_clock(),
        config.token_policy()?,
    );

    let seeded = services.quadrants.seed_defaults().await?;
    tracing::info!(seeded, "Default quadrants ready");

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(services, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
