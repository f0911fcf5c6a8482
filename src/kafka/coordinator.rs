//! Retry/dead-letter coordination
//!
//! Tracks per-partition-offset retry attempts and decides when a failing
//! message is retried versus routed to the dead-letter topic. The ledger is
//! in-memory only and owned exclusively by the consumption loop, so no lock
//! guards it; a process restart resets all counts, with the broker's
//! redelivery of uncommitted messages as the backstop.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;

use tracing::{debug, warn};

/// Identifies a broker partition position being consumed
///
/// Key for all retry bookkeeping. Exists in the ledger only while its
/// message is unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl PartitionOffset {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl Display for PartitionOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

/// Decision after a processing failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry immediately; carries the attempt count so far
    Retry(u32),

    /// Retries exhausted, route to the dead-letter topic
    DeadLetter,
}

/// How a message left the retry loop
#[derive(Debug)]
pub enum Resolution<T> {
    /// Processing succeeded; carries the attempt total and the final
    /// processing value
    Succeeded { attempts: u32, value: T },

    /// Every allowed attempt failed; the message must be dead-lettered
    RetriesExhausted { attempts: u32 },
}

/// Per-message retry state machine
///
/// Counters live only while a message is unresolved and are erased on
/// resolution, whether by success or dead-letter hand-off.
#[derive(Debug)]
pub struct RetryCoordinator {
    max_retries: u32,
    ledger: HashMap<PartitionOffset, u32>,
}

impl RetryCoordinator {
    /// Create a coordinator with the configured retry ceiling
    ///
    /// A ceiling of zero dead-letters on the first failure.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ledger: HashMap::new(),
        }
    }

    /// Record a processing failure and decide what happens next
    pub fn record_failure(&mut self, key: &PartitionOffset) -> RetryDecision {
        let count = self.ledger.entry(key.clone()).or_insert(0);

        if *count < self.max_retries {
            *count += 1;
            RetryDecision::Retry(*count)
        } else {
            RetryDecision::DeadLetter
        }
    }

    /// Clear the ledger entry for a resolved message
    pub fn resolve(&mut self, key: &PartitionOffset) {
        self.ledger.remove(key);
    }

    /// Current attempt counter for a key, if any
    pub fn attempts(&self, key: &PartitionOffset) -> Option<u32> {
        self.ledger.get(key).copied()
    }

    /// True when no message is mid-retry
    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Run a processing attempt to resolution
    ///
    /// Repeats the attempt synchronously on each local retry decision;
    /// attempts for one message never overlap. The ledger entry is cleared
    /// before returning in both outcomes.
    pub async fn drive<F, Fut, T, E>(&mut self, key: PartitionOffset, mut attempt: F) -> Resolution<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match attempt().await {
                Ok(value) => {
                    self.resolve(&key);
                    debug!(key = %key, attempts, "Message processed");
                    return Resolution::Succeeded { attempts, value };
                },
                Err(error) => match self.record_failure(&key) {
                    RetryDecision::Retry(count) => {
                        warn!(
                            key = %key,
                            retry_count = count,
                            error = %error,
                            "Processing failed, retrying"
                        );
                    },
                    RetryDecision::DeadLetter => {
                        warn!(
                            key = %key,
                            attempts,
                            error = %error,
                            "Retries exhausted, routing to dead-letter topic"
                        );
                        self.resolve(&key);
                        return Resolution::RetriesExhausted { attempts };
                    },
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key() -> PartitionOffset {
        PartitionOffset::new("message.publish", 0, 42)
    }

    #[test]
    fn test_retry_until_ceiling() {
        let mut coordinator = RetryCoordinator::new(2);
        let key = key();

        assert_eq!(coordinator.record_failure(&key), RetryDecision::Retry(1));
        assert_eq!(coordinator.record_failure(&key), RetryDecision::Retry(2));
        assert_eq!(coordinator.record_failure(&key), RetryDecision::DeadLetter);
    }

    #[test]
    fn test_zero_retries_dead_letters_immediately() {
        let mut coordinator = RetryCoordinator::new(0);
        let key = key();

        assert_eq!(coordinator.record_failure(&key), RetryDecision::DeadLetter);
    }

    #[test]
    fn test_resolve_clears_ledger() {
        let mut coordinator = RetryCoordinator::new(3);
        let key = key();

        assert!(coordinator.attempts(&key).is_none());

        coordinator.record_failure(&key);
        assert_eq!(coordinator.attempts(&key), Some(1));

        coordinator.resolve(&key);
        assert!(coordinator.attempts(&key).is_none());
        assert!(coordinator.is_empty());
    }

    #[tokio::test]
    async fn test_drive_success_on_first_attempt() {
        let mut coordinator = RetryCoordinator::new(3);

        let resolution = coordinator
            .drive(key(), || async { Ok::<_, String>("stored") })
            .await;

        match resolution {
            Resolution::Succeeded { attempts, value } => {
                assert_eq!(attempts, 1);
                assert_eq!(value, "stored");
            },
            Resolution::RetriesExhausted { .. } => panic!("expected success"),
        }
        assert!(coordinator.is_empty());
    }

    #[tokio::test]
    async fn test_drive_fails_twice_then_succeeds() {
        // max retries 2, failures on attempts 1 and 2, success on attempt 3
        let mut coordinator = RetryCoordinator::new(2);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let resolution = coordinator
            .drive(key(), || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(())
                }
            })
            .await;

        match resolution {
            Resolution::Succeeded { attempts, .. } => assert_eq!(attempts, 3),
            Resolution::RetriesExhausted { .. } => panic!("expected success"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(coordinator.is_empty());
    }

    #[tokio::test]
    async fn test_drive_exhausts_retries() {
        let mut coordinator = RetryCoordinator::new(2);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let resolution = coordinator
            .drive(key(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("persistent".to_string())
            })
            .await;

        match resolution {
            Resolution::RetriesExhausted { attempts } => assert_eq!(attempts, 3),
            Resolution::Succeeded { .. } => panic!("expected exhaustion"),
        }

        // Attempt total is bounded by max retries + 1
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(coordinator.is_empty());
    }

    #[tokio::test]
    async fn test_drive_zero_retries_single_attempt() {
        let mut coordinator = RetryCoordinator::new(0);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let resolution = coordinator
            .drive(key(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("boom".to_string())
            })
            .await;

        match resolution {
            Resolution::RetriesExhausted { attempts } => assert_eq!(attempts, 1),
            Resolution::Succeeded { .. } => panic!("expected exhaustion"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(coordinator.is_empty());
    }

    #[test]
    fn test_independent_keys() {
        let mut coordinator = RetryCoordinator::new(1);
        let a = PartitionOffset::new("message.publish", 0, 1);
        let b = PartitionOffset::new("message.publish", 1, 1);

        assert_eq!(coordinator.record_failure(&a), RetryDecision::Retry(1));
        assert_eq!(coordinator.record_failure(&b), RetryDecision::Retry(1));
        assert_eq!(coordinator.record_failure(&a), RetryDecision::DeadLetter);

        coordinator.resolve(&a);
        assert_eq!(coordinator.attempts(&b), Some(1));
    }
}
