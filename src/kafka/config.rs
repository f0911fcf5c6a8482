//! Kafka configuration module

use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kafka configuration settings
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct KafkaConfig {
    /// Kafka broker addresses (comma-separated)
    #[serde(default = "default_brokers")]
    #[envconfig(from = "KAFKA_BROKERS", default = "127.0.0.1:9092")]
    pub brokers: String,

    /// Consumer group ID
    #[serde(default = "default_group_id")]
    #[envconfig(from = "KAFKA_GROUP_ID", default = "message-consumer-group")]
    pub group_id: String,

    /// Primary topic to consume from and publish to
    #[serde(default = "default_topic")]
    #[envconfig(from = "KAFKA_TOPIC", default = "message.publish")]
    pub topic: String,

    /// Maximum retry attempts before a message is dead-lettered
    #[serde(default = "default_max_retries")]
    #[envconfig(from = "KAFKA_MAX_RETRIES", default = "3")]
    pub max_retries: u32,

    /// Enable auto-commit (must stay false for manual offset management)
    #[serde(default = "default_auto_commit")]
    #[envconfig(from = "KAFKA_AUTO_COMMIT", default = "false")]
    pub auto_commit: bool,

    /// Session timeout in milliseconds
    #[serde(default = "default_session_timeout")]
    #[envconfig(from = "KAFKA_SESSION_TIMEOUT_MS", default = "30000")]
    pub session_timeout_ms: u32,

    /// Maximum poll interval in milliseconds
    #[serde(default = "default_max_poll_interval")]
    #[envconfig(from = "KAFKA_MAX_POLL_INTERVAL_MS", default = "300000")]
    pub max_poll_interval_ms: u32,

    /// Producer send timeout in milliseconds
    #[serde(default = "default_send_timeout")]
    #[envconfig(from = "KAFKA_SEND_TIMEOUT_MS", default = "30000")]
    pub send_timeout_ms: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            group_id: default_group_id(),
            topic: default_topic(),
            max_retries: default_max_retries(),
            auto_commit: default_auto_commit(),
            session_timeout_ms: default_session_timeout(),
            max_poll_interval_ms: default_max_poll_interval(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

impl KafkaConfig {
    /// Create a new KafkaConfig from environment variables
    pub fn from_env() -> Result<Self, envconfig::Error> {
        <Self as envconfig::Envconfig>::init_from_env()
    }

    /// Dead-letter topic derived from the primary topic name
    pub fn dead_letter_topic(&self) -> String {
        super::dead_letter_topic(&self.topic)
    }

    /// Get session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms as u64)
    }

    /// Get producer send timeout as Duration
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Build rdkafka consumer configuration
    pub fn build_consumer_config(&self) -> rdkafka::ClientConfig {
        let mut config = rdkafka::ClientConfig::new();

        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", self.auto_commit.to_string())
            .set("session.timeout.ms", self.session_timeout_ms.to_string())
            .set(
                "max.poll.interval.ms",
                self.max_poll_interval_ms.to_string(),
            )
            .set("partition.assignment.strategy", "roundrobin")
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", "earliest");

        config
    }

    /// Build rdkafka producer configuration
    pub fn build_producer_config(&self) -> rdkafka::ClientConfig {
        let mut config = rdkafka::ClientConfig::new();

        config
            .set("bootstrap.servers", &self.brokers)
            .set("message.timeout.ms", self.send_timeout_ms.to_string());

        config
    }
}

// Default value functions
fn default_brokers() -> String {
    "127.0.0.1:9092".to_string()
}

fn default_group_id() -> String {
    "message-consumer-group".to_string()
}

fn default_topic() -> String {
    "message.publish".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_auto_commit() -> bool {
    false
}

fn default_session_timeout() -> u32 {
    30000 // 30 seconds
}

fn default_max_poll_interval() -> u32 {
    300000 // 5 minutes
}

fn default_send_timeout() -> u64 {
    30000
}
