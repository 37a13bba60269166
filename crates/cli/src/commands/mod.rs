//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use delicious_web::config::DirectoryConfig;
use sqlx::PgPool;

/// Load configuration and connect, the way every command starts.
async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let config = DirectoryConfig::from_env()?;
    let pool = delicious_web::db::create_pool(&config.database_url).await?;
    tracing::info!("Connected to database");
    Ok(pool)
}
