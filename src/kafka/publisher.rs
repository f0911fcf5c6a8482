//! Kafka publisher with per-call delivery acknowledgment

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::KafkaIntegrationError;
use crate::error::Result;
use crate::models::MessageData;

/// Publishing seam for the fan-out and dead-letter paths
///
/// Keyed and keyless variants behave identically except for whether the
/// key field is populated; a key gives related messages partition affinity.
/// The raw variant carries pre-encoded bytes unchanged.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a message with a partition key
    async fn publish_with_key(&self, topic: &str, key: &str, message: &MessageData) -> Result<()>;

    /// Publish a message without a key
    async fn publish_without_key(&self, topic: &str, message: &MessageData) -> Result<()>;

    /// Publish pre-encoded bytes, preserving key and payload unchanged
    ///
    /// Used by the dead-letter path to forward the original message as-is.
    async fn publish_raw(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> Result<()>;
}

/// Publisher backed by an rdkafka `FutureProducer`
///
/// Every send awaits the delivery report for that specific record, so a
/// caller observes the success or failure of the message it sent rather
/// than an aggregate report.
pub struct KafkaPublisher {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaPublisher {
    /// Create a new publisher from an rdkafka client configuration
    pub fn new(config: ClientConfig, send_timeout: Duration) -> Result<Self> {
        let producer: FutureProducer = config
            .create()
            .map_err(KafkaIntegrationError::Connection)?;

        Ok(Self {
            producer,
            send_timeout,
        })
    }

    /// Serialize a payload and publish it
    ///
    /// A serialization failure is returned before the broker is contacted.
    pub async fn publish<T: Serialize + Sync>(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &T,
    ) -> Result<()> {
        let encoded = serde_json::to_vec(payload)
            .map_err(|e| KafkaIntegrationError::Serialization(e.to_string()))?;

        self.send(topic, key.map(str::as_bytes), &encoded).await
    }

    async fn send(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> Result<()> {
        let mut record: FutureRecord<'_, [u8], [u8]> = FutureRecord::to(topic).payload(payload);
        if let Some(key) = key {
            record = record.key(key);
        }

        // Bounded wait on the per-record delivery future; an unreachable
        // broker surfaces as an error instead of a hang
        match self.producer.send(record, self.send_timeout).await {
            Ok(delivery) => {
                debug!(
                    topic = topic,
                    partition = delivery.0,
                    offset = delivery.1,
                    "Message delivered"
                );
                Ok(())
            },
            Err((kafka_error, _)) => Err(KafkaIntegrationError::Delivery(format!(
                "topic '{}': {}",
                topic, kafka_error
            ))
            .into()),
        }
    }

    /// Flush any pending messages
    pub fn flush(&self) -> Result<()> {
        self.producer
            .flush(self.send_timeout)
            .map_err(KafkaIntegrationError::Connection)?;
        Ok(())
    }
}

#[async_trait]
impl MessagePublisher for KafkaPublisher {
    async fn publish_with_key(&self, topic: &str, key: &str, message: &MessageData) -> Result<()> {
        self.publish(topic, Some(key), message).await
    }

    async fn publish_without_key(&self, topic: &str, message: &MessageData) -> Result<()> {
        self.publish(topic, None, message).await
    }

    async fn publish_raw(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> Result<()> {
        self.send(topic, key, payload).await
    }
}
