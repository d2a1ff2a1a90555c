//! PostgreSQL pool setup.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Seconds to wait for a pooled connection before failing the query.
const ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Open the gateway's connection pool.
///
/// The pool connects eagerly so a bad `DATABASE_URL` fails at startup.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")
}

/// Whether the database answers a trivial query.
pub async fn check_health(pool: &PgPool) -> bool {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .is_ok()
}
