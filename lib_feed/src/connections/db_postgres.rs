//! # PostgreSQL Connection Manager
//!
//! Builds the `deadpool_postgres` pool the content store runs on and applies the
//! idempotent table definitions in `sql/schema.sql`. This is not a migration
//! tool: every statement is `CREATE ... IF NOT EXISTS`, safe to run on each start.

use deadpool_postgres::{Config as DeadpoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use thiserror::Error;
use tokio_postgres::NoTls;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Custom error types for Database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to create database pool: {0}")]
    ConnectionError(String),
    #[error("Failed to acquire database connection: {0}")]
    PoolError(#[from] deadpool_postgres::PoolError),
    #[error("Query execution failed: {0}")]
    QueryError(#[from] tokio_postgres::Error),
}

/// Creates a pool for `database_url` with at most `max_size` connections.
///
/// Connections are opened lazily, so a bad URL surfaces on first use; call
/// [`ping`] right after to fail fast.
pub fn create_pool(database_url: &str, max_size: usize) -> Result<Pool, DbError> {
    let mut cfg = DeadpoolConfig::new();
    cfg.url = Some(database_url.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(deadpool_postgres::PoolConfig::new(max_size));

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| DbError::ConnectionError(e.to_string()))
}

/// Checks the health of the database connection by running a simple query.
pub async fn ping(pool: &Pool) -> Result<(), DbError> {
    let client = pool.get().await?;
    client.simple_query("SELECT 1").await?;
    Ok(())
}

/// Applies the table definitions.
pub async fn ensure_schema(pool: &Pool) -> Result<(), DbError> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("Database schema verified");
    Ok(())
}
