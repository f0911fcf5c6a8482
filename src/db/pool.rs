//! Database connection pool management
//!
//! This module provides connection pooling using SQLx with configuration
//! options for connection limits and timeouts.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// Type alias for the database connection pool
pub type DbPool = PgPool;

/// Create a new database connection pool
///
/// # Arguments
/// * `config` - Database configuration
///
/// # Returns
/// A configured connection pool ready for use
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    // Parse connection options from URL
    let connect_options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| Error::config(format!("Invalid database URL: {}", e)))?
        // Set application name for monitoring
        .application_name("message-service")
        // Enable statement logging in debug mode
        .log_statements(tracing::log::LevelFilter::Debug)
        .statement_cache_capacity(100);

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_max_size)
        .min_connections(config.pool_min_idle)
        .acquire_timeout(config.pool_timeout())
        .idle_timeout(Some(config.idle_timeout()))
        // Test connections before use
        .test_before_acquire(true)
        .max_lifetime(Some(Duration::from_secs(3600)))
        .connect_with(connect_options)
        .await
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    // Verify connectivity
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| Error::database(format!("Failed to verify database connection: {}", e)))?;

    tracing::info!(
        max_connections = config.pool_max_size,
        min_idle = config.pool_min_idle,
        "Database connection pool created"
    );

    Ok(pool)
}
