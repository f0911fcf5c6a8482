//! End-to-end pipeline tests using in-memory mocks
//!
//! Exercises the publish, transform, retry and persistence stages together
//! without a broker or database.

use std::sync::Arc;

use message_service::config::DurabilityMode;
use message_service::kafka::coordinator::{PartitionOffset, Resolution, RetryCoordinator};
use message_service::kafka::{MessageProcessor, ProcessOutcome};
use message_service::models::{
    CreateMessageRequest, MessageData, ResponseCatalog, StoredConversation, QUERY_SET,
};
use message_service::service::MessageService;
use message_service::test_utils::{MockMessageRepository, MockPublisher};

fn processor(repo: Arc<MockMessageRepository>) -> MessageProcessor {
    MessageProcessor::new(repo, ResponseCatalog::default(), DurabilityMode::CommitAfterStore)
}

#[tokio::test]
async fn test_round_trip_from_publish_to_store() {
    // Fan-out side: the service publishes the query set
    let publisher = Arc::new(MockPublisher::new());
    let service = MessageService::new(publisher.clone(), "message.publish", 4);

    let request = CreateMessageRequest {
        trigger_by: "it-user".to_string(),
        qty: 1,
    };
    service.post_message(&request).await.unwrap();

    let published = publisher.published();
    assert_eq!(published.len(), QUERY_SET.len());

    // Consume side: feed each published payload through the processor
    let repo = Arc::new(MockMessageRepository::new());
    let processor = processor(repo.clone());

    for (_, _, message) in &published {
        let payload = serde_json::to_vec(message).unwrap();
        let outcome = processor.process(&payload).await.unwrap();
        match outcome {
            ProcessOutcome::Stored(id) => assert!(id > 0),
            ProcessOutcome::Pending(_) => panic!("expected an eager store"),
        }
    }

    let stored = repo.stored();
    assert_eq!(stored.len(), QUERY_SET.len());

    // The greeting got its canned response and kept its trigger
    let hello = stored
        .iter()
        .find(|r| r.message.contains("\"Hello\""))
        .expect("greeting not stored");
    assert_eq!(hello.trigger_by, "it-user");

    let doc: StoredConversation = serde_json::from_str(&hello.message).unwrap();
    assert_eq!(doc.received_message, "Hello");
    assert_eq!(doc.response_message, "Hi there! 😊");
}

#[tokio::test]
async fn test_transient_store_failure_recovers_within_retry_budget() {
    let repo = Arc::new(MockMessageRepository::new());
    repo.fail_next_operation("connection reset");
    let processor = processor(repo.clone());

    let payload = serde_json::to_vec(&MessageData::new("Hello", "it-user")).unwrap();
    let payload = payload.as_slice();
    let processor = &processor;

    let mut coordinator = RetryCoordinator::new(3);
    let resolution = coordinator
        .drive(PartitionOffset::new("message.publish", 0, 7), || async move {
            processor.process(payload).await
        })
        .await;

    match resolution {
        Resolution::Succeeded { attempts, .. } => assert_eq!(attempts, 2),
        Resolution::RetriesExhausted { .. } => panic!("expected recovery"),
    }
    assert_eq!(repo.stored().len(), 1);
    assert!(coordinator.is_empty());
}

#[tokio::test]
async fn test_malformed_payload_exhausts_retries() {
    let repo = Arc::new(MockMessageRepository::new());
    let processor = processor(repo.clone());
    let processor = &processor;

    let mut coordinator = RetryCoordinator::new(2);
    let resolution = coordinator
        .drive(PartitionOffset::new("message.publish", 0, 8), || async move {
            processor.process(b"not json").await
        })
        .await;

    // Parsing never succeeds, so the message burns its whole budget
    match resolution {
        Resolution::RetriesExhausted { attempts } => assert_eq!(attempts, 3),
        Resolution::Succeeded { .. } => panic!("expected exhaustion"),
    }
    assert!(repo.stored().is_empty());
}

#[tokio::test]
async fn test_deferred_store_happens_after_resolution() {
    let repo = Arc::new(MockMessageRepository::new());
    let processor = MessageProcessor::new(
        repo.clone(),
        ResponseCatalog::default(),
        DurabilityMode::CommitThenStore,
    );

    let payload = serde_json::to_vec(&MessageData::new("Tell me a joke", "it-user")).unwrap();
    let outcome = processor.process(&payload).await.unwrap();

    let record = match outcome {
        ProcessOutcome::Pending(record) => record,
        ProcessOutcome::Stored(_) => panic!("expected a deferred store"),
    };
    assert!(repo.stored().is_empty());

    processor.store(&record).await.unwrap();

    let stored = repo.stored();
    assert_eq!(stored.len(), 1);
    let doc: StoredConversation = serde_json::from_str(&stored[0].message).unwrap();
    assert_eq!(
        doc.response_message,
        "Why did the chicken cross the road? To get to the other side! 😂"
    );
}
