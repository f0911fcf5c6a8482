//! Message transformation and persistence hand-off

use std::sync::Arc;

use tracing::info;

use crate::config::DurabilityMode;
use crate::db::MessageRepository;
use crate::error::{Error, Result};
use crate::models::{MessageData, ResponseCatalog, StoredConversation};

/// Result of processing one message payload
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The record was written before the offset commit
    Stored(i64),

    /// The record is ready but the write is deferred until after the
    /// offset commit
    Pending(MessageData),
}

/// Transforms inbound payloads into persistable records
///
/// The transform itself is pure: the same inbound text always yields the
/// same response. The durability mode decides whether the database write
/// happens before or after the offset commit.
pub struct MessageProcessor {
    repo: Arc<dyn MessageRepository>,
    catalog: ResponseCatalog,
    durability: DurabilityMode,
}

impl MessageProcessor {
    /// Create a new message processor
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        catalog: ResponseCatalog,
        durability: DurabilityMode,
    ) -> Self {
        Self {
            repo,
            catalog,
            durability,
        }
    }

    /// Process a raw payload into a persistable record
    ///
    /// Parse and transform failures, and store failures in
    /// commit-after-store mode, are recoverable-application errors that
    /// feed the retry/dead-letter decision.
    pub async fn process(&self, payload: &[u8]) -> Result<ProcessOutcome> {
        let record = self.transform(payload)?;

        match self.durability {
            DurabilityMode::CommitAfterStore => {
                let id = self.store(&record).await?;
                Ok(ProcessOutcome::Stored(id))
            },
            DurabilityMode::CommitThenStore => Ok(ProcessOutcome::Pending(record)),
        }
    }

    /// Pure transform of an inbound payload into the record to persist
    pub fn transform(&self, payload: &[u8]) -> Result<MessageData> {
        let inbound: MessageData = serde_json::from_slice(payload)
            .map_err(|e| Error::kafka(format!("Malformed message payload: {}", e)))?;

        let response = self.catalog.respond(&inbound.message);

        info!(
            trigger_by = %inbound.trigger_by,
            message = %inbound.message,
            response = %response,
            "Generated response"
        );

        let conversation = StoredConversation {
            received_message: inbound.message,
            response_message: response.to_string(),
        };

        let document = serde_json::to_string(&conversation)?;

        Ok(MessageData {
            message: document,
            trigger_by: inbound.trigger_by,
        })
    }

    /// Persist a transformed record, returning its generated identifier
    pub async fn store(&self, record: &MessageData) -> Result<i64> {
        let id = self.repo.create(record).await?;
        Ok(id)
    }
}
