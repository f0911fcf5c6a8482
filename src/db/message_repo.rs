//! Message repository implementation
//!
//! PostgreSQL persistence for consumed messages. The insert runs inside a
//! single transaction so a partial write is never observable: insert,
//! retrieve the generated identifier, commit, with rollback on any failure
//! before the error is returned.

use async_trait::async_trait;

use crate::{
    db::{
        repository::{RepositoryError, RepositoryResult},
        DbPool,
    },
    models::MessageData,
};

/// Message repository trait
///
/// The seam between the processing pipeline and the persistence store.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Store a consumed message, returning the generated identifier
    async fn create(&self, message: &MessageData) -> RepositoryResult<i64>;

    /// Health check for the repository
    async fn health_check(&self) -> RepositoryResult<()>;
}

/// PostgreSQL implementation of MessageRepository
pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    /// Create a new PostgreSQL message repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: &MessageData) -> RepositoryResult<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Transaction(e.to_string()))?;

        // On error the transaction is dropped, which rolls it back
        let message_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO consumed_messages (message, trigger_by)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&message.message)
        .bind(&message.trigger_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Transaction(e.to_string()))?;

        tracing::debug!(
            message_id = message_id,
            trigger_by = %message.trigger_by,
            "Stored consumed message"
        );

        Ok(message_id)
    }

    async fn health_check(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| RepositoryError::Connection(format!("Health check failed: {}", e)))
    }
}
