//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! delicious migrate
//! ```
//!
//! Applies `crates/web/migrations/` (the `directory` schema) and then creates
//! the `tower_sessions` table used by the web server's session store.
//! Both steps are idempotent.

use tower_sessions_sqlx_store::PostgresStore;

/// Run all migrations against `DELICIOUS_DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is unreachable
/// or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running directory migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
