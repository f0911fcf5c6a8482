//! Mock implementations and helpers for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::db::MessageRepository;
use crate::error::{Error, Result};
use crate::kafka::MessagePublisher;
use crate::models::MessageData;

/// Mock implementation of MessageRepository for testing
///
/// Assigns sequential identifiers starting at 1, mirroring a fresh serial
/// column.
#[derive(Debug, Clone)]
pub struct MockMessageRepository {
    records: Arc<Mutex<Vec<MessageData>>>,
    fail_next: Arc<Mutex<bool>>,
    error_message: Arc<Mutex<Option<String>>>,
}

impl Default for MockMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMessageRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
            error_message: Arc::new(Mutex::new(None)),
        }
    }

    /// Configure the mock to fail on the next operation
    pub fn fail_next_operation(&self, error_message: &str) {
        *self.fail_next.lock().unwrap() = true;
        *self.error_message.lock().unwrap() = Some(error_message.to_string());
    }

    /// Get all stored records
    pub fn stored(&self) -> Vec<MessageData> {
        self.records.lock().unwrap().clone()
    }

    /// Clear all stored records
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    fn check_failure(&self) -> RepositoryResult<()> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            let msg = self
                .error_message
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "Mock failure".to_string());
            return Err(RepositoryError::QueryExecution(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MockMessageRepository {
    async fn create(&self, message: &MessageData) -> RepositoryResult<i64> {
        self.check_failure()?;
        let mut records = self.records.lock().unwrap();
        records.push(message.clone());
        Ok(records.len() as i64)
    }

    async fn health_check(&self) -> RepositoryResult<()> {
        self.check_failure()?;
        Ok(())
    }
}

/// Mock implementation of MessagePublisher for testing
///
/// Records every successful publish along with its topic and key, and can
/// be configured to fail the first N calls or to panic on a specific
/// message body.
#[derive(Debug, Clone)]
pub struct MockPublisher {
    published: Arc<Mutex<Vec<(String, Option<String>, MessageData)>>>,
    published_raw: Arc<Mutex<Vec<(String, Option<Vec<u8>>, Vec<u8>)>>>,
    attempts: Arc<AtomicUsize>,
    failures_remaining: Arc<AtomicUsize>,
    panic_message: Arc<Mutex<Option<String>>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    /// Create a new mock publisher
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            published_raw: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            failures_remaining: Arc::new(AtomicUsize::new(0)),
            panic_message: Arc::new(Mutex::new(None)),
        }
    }

    /// Fail the first `count` publish calls, then succeed
    pub fn fail_first(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Panic when asked to publish this exact message body
    pub fn panic_on(&self, message: &str) {
        *self.panic_message.lock().unwrap() = Some(message.to_string());
    }

    /// Get all successfully published messages as (topic, key, message)
    pub fn published(&self) -> Vec<(String, Option<String>, MessageData)> {
        self.published.lock().unwrap().clone()
    }

    /// Get all successfully published raw messages as (topic, key, payload)
    pub fn published_raw(&self) -> Vec<(String, Option<Vec<u8>>, Vec<u8>)> {
        self.published_raw.lock().unwrap().clone()
    }

    /// Total publish calls, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn record(&self, topic: &str, key: Option<&str>, message: &MessageData) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        // Clone and drop the guard before panicking so the mutex is not
        // poisoned for sibling tasks
        let trigger = self.panic_message.lock().unwrap().clone();
        if let Some(trigger) = trigger {
            if trigger == message.message {
                panic!("mock publisher panic on '{}'", trigger);
            }
        }

        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::kafka("Mock publish failure"));
        }

        self.published.lock().unwrap().push((
            topic.to_string(),
            key.map(str::to_string),
            message.clone(),
        ));
        Ok(())
    }
}

#[async_trait]
impl MessagePublisher for MockPublisher {
    async fn publish_with_key(&self, topic: &str, key: &str, message: &MessageData) -> Result<()> {
        self.record(topic, Some(key), message)
    }

    async fn publish_without_key(&self, topic: &str, message: &MessageData) -> Result<()> {
        self.record(topic, None, message)
    }

    async fn publish_raw(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::kafka("Mock publish failure"));
        }

        self.published_raw.lock().unwrap().push((
            topic.to_string(),
            key.map(<[u8]>::to_vec),
            payload.to_vec(),
        ));
        Ok(())
    }
}
