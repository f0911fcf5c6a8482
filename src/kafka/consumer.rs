//! Kafka consumption loop with manual offset management
//!
//! Reads one message at a time from the primary topic, drives it through
//! the retry/dead-letter coordinator, and commits the offset only once the
//! message is resolved. The next broker read never happens before the
//! current message resolves, so processing order follows delivery order
//! within a partition.

use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::message::Message;
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::ClientContext;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::{
    dead_letter_topic, KafkaConfig, MessageProcessor, MessagePublisher, PartitionOffset,
    ProcessOutcome, Resolution, RetryCoordinator,
};
use crate::error::{Error, Result};
use crate::models::MessageData;

/// Consumer context that logs partition assignment changes
///
/// A stateless observer: rebalance events carry no side effects that
/// affect correctness.
pub struct LoggingConsumerContext;

impl ClientContext for LoggingConsumerContext {}

impl ConsumerContext for LoggingConsumerContext {
    fn pre_rebalance(&self, _consumer: &BaseConsumer<Self>, rebalance: &Rebalance<'_>) {
        match rebalance {
            Rebalance::Assign(partitions) => {
                info!(count = partitions.count(), assignment = ?partitions, "Partitions assigned");
            },
            Rebalance::Revoke(partitions) => {
                info!(count = partitions.count(), assignment = ?partitions, "Partitions revoked");
            },
            Rebalance::Error(e) => {
                error!(error = %e, "Rebalance error");
            },
        }
    }

    fn post_rebalance(&self, _consumer: &BaseConsumer<Self>, rebalance: &Rebalance<'_>) {
        debug!(rebalance = ?rebalance, "Rebalance complete");
    }

    fn commit_callback(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        if let Err(e) = result {
            warn!(error = %e, offsets = ?offsets, "Offset commit reported an error");
        }
    }
}

/// Consumes messages from the primary topic until shutdown or a fatal
/// transport error
pub struct MessageConsumer {
    consumer: StreamConsumer<LoggingConsumerContext>,
    processor: MessageProcessor,
    publisher: Arc<dyn MessagePublisher>,
    coordinator: RetryCoordinator,
    config: KafkaConfig,
}

impl MessageConsumer {
    /// Create a consumer and subscribe to the primary topic
    pub fn new(
        config: KafkaConfig,
        processor: MessageProcessor,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Result<Self> {
        let consumer: StreamConsumer<LoggingConsumerContext> = config
            .build_consumer_config()
            .create_with_context(LoggingConsumerContext)
            .map_err(|e| Error::kafka(format!("Failed to create Kafka consumer: {}", e)))?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|e| Error::kafka(format!("Failed to subscribe to topic: {}", e)))?;

        let coordinator = RetryCoordinator::new(config.max_retries);

        Ok(Self {
            consumer,
            processor,
            publisher,
            coordinator,
            config,
        })
    }

    /// Run the consumption loop
    ///
    /// Returns `Ok(())` on a clean shutdown. A transport-level read error
    /// is fatal: it is returned to the supervising task and the loop
    /// terminates without retrying the read.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let Self {
            consumer,
            processor,
            publisher,
            mut coordinator,
            config,
        } = self;

        info!(
            topic = %config.topic,
            group_id = %config.group_id,
            max_retries = config.max_retries,
            "Starting Kafka consumer"
        );

        loop {
            // Shutdown is observed between messages, never mid-message
            let message = tokio::select! {
                _ = shutdown.changed() => {
                    info!("Shutdown signal received, stopping consumer");
                    break;
                },
                received = consumer.recv() => match received {
                    Ok(message) => message,
                    Err(e) => {
                        error!(error = %e, "Fatal consumer read error");
                        return Err(Error::kafka(format!("Consumer read failed: {}", e)));
                    },
                },
            };

            let pending = Self::handle_message(
                PartitionOffset::new(message.topic(), message.partition(), message.offset()),
                message.key(),
                message.payload().unwrap_or_default(),
                &mut coordinator,
                &processor,
                publisher.as_ref(),
            )
            .await;

            // The message is resolved; commit synchronously, best effort.
            // A missed commit is covered by broker redelivery.
            if let Err(e) =
                consumer.commit_message(&message, rdkafka::consumer::CommitMode::Sync)
            {
                warn!(
                    error = %e,
                    partition = message.partition(),
                    offset = message.offset(),
                    "Failed to commit offset"
                );
            }

            // Deferred write in commit-then-store mode: runs after the
            // commit, failures are logged and never retried
            if let Some(record) = pending {
                if let Err(e) = processor.store(&record).await {
                    error!(
                        error = %e,
                        trigger_by = %record.trigger_by,
                        "Store after commit failed, record dropped"
                    );
                }
            }
        }

        info!("Kafka consumer stopped");
        Ok(())
    }

    /// Drive a single message to resolution
    ///
    /// Retries run synchronously in place until the message succeeds or
    /// exhausts its retry budget, in which case the original payload and
    /// key are forwarded unchanged to the dead-letter topic. A dead-letter
    /// publish failure is logged and does not block offset advancement.
    async fn handle_message(
        key: PartitionOffset,
        message_key: Option<&[u8]>,
        payload: &[u8],
        coordinator: &mut RetryCoordinator,
        processor: &MessageProcessor,
        publisher: &dyn MessagePublisher,
    ) -> Option<MessageData> {
        let position = key.clone();

        let resolution = coordinator
            .drive(key, || async move { processor.process(payload).await })
            .await;

        match resolution {
            Resolution::Succeeded { attempts, value } => {
                debug!(
                    partition = position.partition,
                    offset = position.offset,
                    attempts,
                    "Message resolved"
                );
                match value {
                    ProcessOutcome::Stored(_) => None,
                    ProcessOutcome::Pending(record) => Some(record),
                }
            },
            Resolution::RetriesExhausted { attempts } => {
                let dlq_topic = dead_letter_topic(&position.topic);

                if let Err(e) = publisher.publish_raw(&dlq_topic, message_key, payload).await {
                    error!(
                        error = %e,
                        topic = %dlq_topic,
                        partition = position.partition,
                        offset = position.offset,
                        "Failed to publish dead-letter message"
                    );
                } else {
                    info!(
                        topic = %dlq_topic,
                        partition = position.partition,
                        offset = position.offset,
                        attempts,
                        "Message dead-lettered"
                    );
                }

                None
            },
        }
    }
}
