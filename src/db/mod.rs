//! Database module for the message service
//!
//! This module provides database connectivity, connection pooling,
//! and repository implementations for persistent storage.

pub mod message_repo;
pub mod pool;
pub mod repository;

// Re-export commonly used types
pub use message_repo::{MessageRepository, PgMessageRepository};
pub use pool::{create_pool, DbPool};
pub use repository::{RepositoryError, RepositoryResult};

use sqlx::migrate::Migrator;

/// Database migrator for running schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
