//! Message service: the fan-out producer path
//!
//! For each API request the service publishes one message per repetition of
//! the fixed query set, each on its own task. Concurrency is capped by a
//! semaphore sized from configuration. Failures stay inside their task: a
//! publish error or a panic is logged and never cancels sibling tasks or
//! changes the reported outcome. The caller blocks until every task has
//! completed.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::kafka::MessagePublisher;
use crate::models::{CreateMessageRequest, MessageData, QUERY_SET};

/// Publishes fan-out batches to the primary topic
pub struct MessageService {
    publisher: Arc<dyn MessagePublisher>,
    topic: String,
    semaphore: Arc<Semaphore>,
}

impl MessageService {
    /// Create a new message service
    ///
    /// `publish_concurrency` caps the number of in-flight publish tasks.
    pub fn new(
        publisher: Arc<dyn MessagePublisher>,
        topic: impl Into<String>,
        publish_concurrency: usize,
    ) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            semaphore: Arc::new(Semaphore::new(publish_concurrency)),
        }
    }

    /// Publish `qty × QUERY_SET.len()` keyless messages
    ///
    /// Waits for all tasks to finish, then reports success regardless of
    /// individual publish outcomes.
    pub async fn post_message(&self, request: &CreateMessageRequest) -> Result<()> {
        info!(
            trigger_by = %request.trigger_by,
            qty = request.qty,
            queries = QUERY_SET.len(),
            "Fan-out publish requested"
        );

        let mut tasks = JoinSet::new();

        for _ in 0..request.qty {
            for query in QUERY_SET {
                let publisher = Arc::clone(&self.publisher);
                let semaphore = Arc::clone(&self.semaphore);
                let topic = self.topic.clone();
                let message = MessageData::new(query, request.trigger_by.clone());

                tasks.spawn(async move {
                    // The semaphore is never closed while tasks run
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return,
                    };

                    if let Err(e) = publisher.publish_without_key(&topic, &message).await {
                        warn!(
                            error = %e,
                            topic = %topic,
                            message = %message.message,
                            "Publish failed, continuing batch"
                        );
                    }
                });
            }
        }

        // Completion barrier: a panicked task is contained and logged,
        // siblings keep running
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Publish task failed to complete");
            }
        }

        info!(
            trigger_by = %request.trigger_by,
            qty = request.qty,
            "Fan-out publish finished"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockPublisher;

    fn request(qty: i64) -> CreateMessageRequest {
        CreateMessageRequest {
            trigger_by: "u1".to_string(),
            qty,
        }
    }

    #[tokio::test]
    async fn test_fan_out_publishes_qty_times_query_set() {
        let publisher = Arc::new(MockPublisher::new());
        let service = MessageService::new(publisher.clone(), "message.publish", 4);

        service.post_message(&request(2)).await.unwrap();

        let published = publisher.published();
        assert_eq!(published.len(), 2 * QUERY_SET.len());

        // All keyless, all on the primary topic
        for (topic, key, message) in &published {
            assert_eq!(topic, "message.publish");
            assert!(key.is_none());
            assert_eq!(message.trigger_by, "u1");
        }

        // Each query appears exactly qty times
        for query in QUERY_SET {
            let count = published.iter().filter(|(_, _, m)| m.message == query).count();
            assert_eq!(count, 2, "query '{}' published wrong number of times", query);
        }
    }

    #[tokio::test]
    async fn test_zero_qty_publishes_nothing() {
        let publisher = Arc::new(MockPublisher::new());
        let service = MessageService::new(publisher.clone(), "message.publish", 4);

        service.post_message(&request(0)).await.unwrap();

        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failures_do_not_fail_the_batch() {
        let publisher = Arc::new(MockPublisher::new());
        publisher.fail_first(3);
        let service = MessageService::new(publisher.clone(), "message.publish", 4);

        // 12 publish attempts, 3 of which fail: still reported as success
        let result = service.post_message(&request(2)).await;
        assert!(result.is_ok());

        assert_eq!(publisher.attempts(), 12);
        assert_eq!(publisher.published().len(), 9);
    }

    #[tokio::test]
    async fn test_panicking_task_is_contained() {
        let publisher = Arc::new(MockPublisher::new());
        publisher.panic_on("Hello");
        let service = MessageService::new(publisher.clone(), "message.publish", 2);

        let result = service.post_message(&request(1)).await;
        assert!(result.is_ok());

        // The five non-panicking queries still go out
        assert_eq!(publisher.published().len(), QUERY_SET.len() - 1);
    }

    #[tokio::test]
    async fn test_concurrency_cap_of_one_still_completes() {
        let publisher = Arc::new(MockPublisher::new());
        let service = MessageService::new(publisher.clone(), "message.publish", 1);

        service.post_message(&request(3)).await.unwrap();

        assert_eq!(publisher.published().len(), 3 * QUERY_SET.len());
    }
}
