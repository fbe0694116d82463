/// Expired login token sweeper
///
/// Login tokens are never deleted by the API; they expire in place. The
/// sweeper removes every token past `expires_at` on a fixed interval until
/// its shutdown token is cancelled.
///
/// # Example
///
/// ```no_run
/// use dothe2_worker::sweeper::{SweeperConfig, TokenSweeper};
/// use dothe2_shared::clock::system_clock;
/// use dothe2_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let sweeper = TokenSweeper::new(
///     Arc::new(MemoryStore::default()),
///     system_clock(),
///     SweeperConfig::default(),
/// );
///
/// let shutdown = sweeper.shutdown_token();
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     shutdown.cancel();
/// });
///
/// sweeper.run().await;
/// # Ok(())
/// # }
/// ```
use dothe2_shared::auth::manager::sweep_expired;
use dothe2_shared::clock::SharedClock;
use dothe2_shared::error::CoreResult;
use dothe2_shared::store::AuthTokenRepository;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Seconds between sweeps
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        SweeperConfig { interval_secs: 300 }
    }
}

/// Periodically deletes expired login tokens
pub struct TokenSweeper {
    tokens: Arc<dyn AuthTokenRepository>,
    clock: SharedClock,
    config: SweeperConfig,
    shutdown_token: CancellationToken,
}

impl TokenSweeper {
    pub fn new(
        tokens: Arc<dyn AuthTokenRepository>,
        clock: SharedClock,
        config: SweeperConfig,
    ) -> Self {
        TokenSweeper {
            tokens,
            clock,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets shutdown token
    ///
    /// Cancelling it stops [`run`](Self::run) after the current sweep.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs one sweep at the clock's current time
    pub async fn sweep_once(&self) -> CoreResult<u64> {
        sweep_expired(self.tokens.as_ref(), self.clock.utc()).await
    }

    /// Sweeps immediately, then every interval, until shutdown
    ///
    /// Failed sweeps are logged and retried on the next tick.
    pub async fn run(&self) {
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        tracing::info!(interval_secs = period.as_secs(), "Token sweeper starting");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Token sweeper shut down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::error!(error = %e, "Token sweep failed");
                    }
                }
            }
        }
    }
}
