/// Database plumbing: pool creation and migrations
///
/// Queries themselves live in [`crate::store::postgres`].
///
/// # Example
///
/// ```no_run
/// use dothe2_shared::db::migrations::run_migrations;
/// use dothe2_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
