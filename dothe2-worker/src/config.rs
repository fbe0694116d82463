/// Worker configuration
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 2)
/// - `SWEEP_INTERVAL_SECS`: seconds between sweeps (default: 300)
use crate::sweeper::SweeperConfig;
use dothe2_shared::db::pool::DatabaseConfig;
use std::env;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub sweeper: SweeperConfig,
}

impl WorkerConfig {
    /// Loads configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "2".to_string())
            .parse::<u32>()?;
        let interval_secs = lookup("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|| "300".to_string())
            .parse::<u64>()?;
        if interval_secs == 0 {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be positive");
        }

        Ok(WorkerConfig {
            database: DatabaseConfig {
                url,
                max_connections,
                ..Default::default()
            },
            sweeper: SweeperConfig { interval_secs },
        })
    }
}
