//! Database pool construction

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Create a connection pool from the database configuration.
///
/// Every connection carries a `statement_timeout`, so a stuck batch
/// transaction fails (and gets retried) instead of holding its pool
/// connection indefinitely.
pub async fn create_pool(config: &DatabaseConfig) -> DbResult<PgPool> {
    if config.url.is_empty() {
        return Err(DbError::Config("database URL is empty".to_string()));
    }

    let connect_options: PgConnectOptions = config.url.parse().map_err(DbError::Sqlx)?;
    let connect_options = connect_options.options([(
        "statement_timeout",
        (config.statement_timeout_secs * 1000).to_string(),
    )]);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_with(connect_options)
        .await?;

    Ok(pool)
}
