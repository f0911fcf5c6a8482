//! Kafka integration module for the message pipeline
//!
//! This module provides:
//! - Consumption loop with manual offset commits and rebalance logging
//! - Per-message retry/dead-letter coordination
//! - Publisher with per-call delivery acknowledgment
//! - Message transformation and persistence hand-off

pub mod config;
pub mod consumer;
pub mod coordinator;
pub mod processor;
pub mod publisher;

pub use config::KafkaConfig;
pub use consumer::MessageConsumer;
pub use coordinator::{PartitionOffset, Resolution, RetryCoordinator, RetryDecision};
pub use processor::{MessageProcessor, ProcessOutcome};
pub use publisher::{KafkaPublisher, MessagePublisher};

use rdkafka::error::KafkaError;
use thiserror::Error;

/// Suffix appended to the primary topic name to derive its dead-letter topic
pub const DEAD_LETTER_SUFFIX: &str = "-dead-letter-queue";

/// Derive the dead-letter topic name for a primary topic
pub fn dead_letter_topic(topic: &str) -> String {
    format!("{}{}", topic, DEAD_LETTER_SUFFIX)
}

/// Kafka-specific error types
#[derive(Debug, Error)]
pub enum KafkaIntegrationError {
    #[error("Kafka connection error: {0}")]
    Connection(#[from] KafkaError),

    #[error("Message serialization failed: {0}")]
    Serialization(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl From<KafkaIntegrationError> for crate::error::Error {
    fn from(err: KafkaIntegrationError) -> Self {
        crate::error::Error::Kafka(err.to_string())
    }
}
