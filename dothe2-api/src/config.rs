/// Configuration management for the API server
///
/// Configuration comes from environment variables (a `.env` file is honoured
/// in development) and is parsed into typed structs once at startup.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: `0.0.0.0:8080`)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: `*`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: HS256 signing key, at least 32 characters (required)
/// - `ACCESS_TOKEN_EXPIRE_MINUTES`: session lifetime (default: 10080, 7 days)
/// - `MAGIC_LINK_EXPIRE_MINUTES`: login token lifetime (default: 15)
///
/// Both lifetimes must lie in `1..=525600` (one year).
/// - `PUBLIC_BASE_URL`: host used in magic links (default: `http://localhost:8080`)
/// - `FRONTEND_URL`: where magic-link verification redirects (default: `PUBLIC_BASE_URL`)
/// - `SMTP_*`: see [`EmailConfig`]; unset `SMTP_HOST` means log-only delivery
///
/// # Example
///
/// ```no_run
/// use dothe2_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```
use crate::email::EmailConfig;
use chrono::Duration;
use dothe2_shared::auth::manager::TokenPolicy;
use dothe2_shared::db::pool;
use std::env;

/// Upper bound for configured lifetimes, one year in minutes
pub const MAX_LIFETIME_MINUTES: i64 = 525_600;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session token configuration
    pub jwt: JwtConfig,

    /// Login token configuration
    pub login: LoginConfig,

    /// Outbound email, absent when delivery is log-only
    pub email: Option<EmailConfig>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must stay private and be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Access token lifetime in minutes
    pub access_token_expire_minutes: i64,
}

/// Magic link and code configuration
#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Login token lifetime in minutes
    pub token_expire_minutes: i64,

    /// Origin of this server as seen by mail recipients
    pub public_base_url: String,

    /// Frontend origin used for post-verification redirects
    pub frontend_url: String,
}

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - a numeric variable does not parse
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - a lifetime is zero or negative
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var_or("API_HOST", "0.0.0.0");
        let port = var_or("API_PORT", "8080").parse::<u16>()?;
        let cors_origins = var_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        let access_token_expire_minutes = lifetime_minutes(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            &var_or("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let token_expire_minutes = lifetime_minutes(
            "MAGIC_LINK_EXPIRE_MINUTES",
            &var_or("MAGIC_LINK_EXPIRE_MINUTES", "15"),
        )?;
        let public_base_url = var_or("PUBLIC_BASE_URL", DEFAULT_BASE_URL);
        let frontend_url = lookup("FRONTEND_URL").unwrap_or_else(|| public_base_url.clone());

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_token_expire_minutes,
            },
            login: LoginConfig {
                token_expire_minutes,
                public_base_url: public_base_url.trim_end_matches('/').to_string(),
                frontend_url: frontend_url.trim_end_matches('/').to_string(),
            },
            email: EmailConfig::from_lookup(&lookup),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Session token lifetime
    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.jwt.access_token_expire_minutes)
    }

    /// Login token policy for the auth service
    pub fn token_policy(&self) -> dothe2_shared::CoreResult<TokenPolicy> {
        Ok(TokenPolicy::new(
            Duration::minutes(self.login.token_expire_minutes),
            self.login.public_base_url.clone(),
        )?
        .with_app_url(self.login.frontend_url.clone()))
    }

    /// Pool settings for the shared database layer
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }
}

fn lifetime_minutes(key: &str, value: &str) -> anyhow::Result<i64> {
    let minutes = value
        .parse::<i64>()
        .map_err(|e| anyhow::anyhow!("{} must be an integer: {}", key, e))?;
    if !(1..=MAX_LIFETIME_MINUTES).contains(&minutes) {
        anyhow::bail!(
            "{} must be between 1 and {} minutes, got {}",
            key,
            MAX_LIFETIME_MINUTES,
            minutes
        );
    }
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/dothe2"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.access_token_ttl(), Duration::days(7));
        assert_eq!(config.login.token_expire_minutes, 15);
        assert_eq!(config.login.frontend_url, "http://localhost:8080");
        assert!(config.email.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/dothe2"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("PUBLIC_BASE_URL", "https://api.example.com/"),
            ("FRONTEND_URL", "https://app.example.com"),
            ("MAGIC_LINK_EXPIRE_MINUTES", "30"),
            ("SMTP_HOST", "smtp.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.login.public_base_url, "https://api.example.com");
        assert_eq!(
            config.token_policy().unwrap().magic_link("abc"),
            "https://api.example.com/v1/auth/verify?token=abc"
        );
        assert_eq!(config.token_policy().unwrap().ttl(), Duration::minutes(30));
        assert_eq!(config.email.unwrap().smtp_host, "smtp.example.com");
    }

    #[test]
    fn test_required_and_invalid_values() {
        assert!(Config::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)])).is_err());
        assert!(Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/dothe2"),
            ("JWT_SECRET", "short"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/dothe2"),
            ("JWT_SECRET", SECRET),
            ("MAGIC_LINK_EXPIRE_MINUTES", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn test_lifetimes_are_bounded() {
        let with = |key: &'static str, value: &'static str| {
            Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgresql://localhost/dothe2"),
                ("JWT_SECRET", SECRET),
                (key, value),
            ]))
        };

        assert!(with("ACCESS_TOKEN_EXPIRE_MINUTES", "525600").is_ok());
        assert!(with("MAGIC_LINK_EXPIRE_MINUTES", "525600").is_ok());

        for key in ["ACCESS_TOKEN_EXPIRE_MINUTES", "MAGIC_LINK_EXPIRE_MINUTES"] {
            assert!(with(key, "525601").is_err());
            assert!(with(key, "9223372036854775807").is_err());
            assert!(with(key, "-5").is_err());
            assert!(with(key, "soon").is_err());
        }
    }
}
