//! Postgres pool setup and schema migrations.
//!
//! DESIGN
//! ======
//! One shared pool serves every service: auth rows, group membership, chat
//! history, and the whiteboard documents flushed by the persistence task.
//! Migrations are embedded and applied on startup, so a fresh database is
//! usable the moment the server binds. Pool sizing is small by default; the
//! live whiteboard state is held in memory and only the debounced flushes
//! and REST queries reach Postgres.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 3;

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn max_connections() -> u32 {
    env_u64("DB_MAX_CONNECTIONS")
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(DEFAULT_MAX_CONNECTIONS)
}

fn acquire_timeout() -> Duration {
    Duration::from_secs(env_u64("DB_ACQUIRE_TIMEOUT_SECS").unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS))
}

/// Connect the shared pool and bring the schema up to date.
///
/// # Errors
///
/// Returns an error if the connection cannot be established or a migration
/// fails; the server must not start serving against a stale schema.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections())
        .acquire_timeout(acquire_timeout())
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
#[path = "db_test.rs"]
mod tests;
