//! Message service entrypoint
//!
//! Wires the pipeline together: configuration, logging, the database pool,
//! the Kafka consumer and publisher, the fan-out service and the HTTP
//! server, then supervises the consumer and server tasks until shutdown.

use std::sync::Arc;

use tokio::sync::watch;

use message_service::api::health::{health_monitor, HealthState};
use message_service::api::server::{create_server, shutdown_signal, AppState};
use message_service::config::Config;
use message_service::db::{self, MessageRepository, PgMessageRepository};
use message_service::error::{Error, Result};
use message_service::kafka::{KafkaPublisher, MessageConsumer, MessageProcessor};
use message_service::models::ResponseCatalog;
use message_service::service::MessageService;
use message_service::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load and validate configuration from environment
    let config = Arc::new(Config::from_env()?);
    config.validate()?;

    logging::init_tracing(&config.server.log_level, &config.server.environment)?;
    config.log_config();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting message service"
    );

    // Database
    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| Error::database(format!("Migration failed: {}", e)))?;
    let repo: Arc<dyn MessageRepository> = Arc::new(PgMessageRepository::new(pool));

    // Kafka publisher, shared by the fan-out service and the consumer's
    // dead-letter path
    let publisher = Arc::new(KafkaPublisher::new(
        config.kafka.build_producer_config(),
        config.kafka.send_timeout(),
    )?);

    // Consumer pipeline
    let processor = MessageProcessor::new(
        repo.clone(),
        ResponseCatalog::default(),
        config.processing.durability_mode()?,
    );
    let consumer = MessageConsumer::new(config.kafka.clone(), processor, publisher.clone())?;

    // Fan-out service and HTTP state
    let service = Arc::new(MessageService::new(
        publisher.clone(),
        config.kafka.topic.clone(),
        config.processing.publish_concurrency,
    ));
    let health = HealthState::new();
    let state = AppState {
        service,
        health: health.clone(),
    };

    tokio::spawn(health_monitor(health, repo));

    // One shutdown channel observed by the consumer loop and the server
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut consumer_handle = tokio::spawn(consumer.run(shutdown_rx.clone()));
    let mut server_handle = tokio::spawn(create_server(config.clone(), state, shutdown_rx));

    // Supervise: a fatal error in either task ends the process; otherwise
    // wait for a shutdown signal
    let outcome: Result<()> = tokio::select! {
        _ = shutdown_signal() => Ok(()),
        joined = &mut consumer_handle => match joined {
            Ok(result) => result,
            Err(e) => Err(Error::internal(format!("Consumer task panicked: {}", e))),
        },
        joined = &mut server_handle => match joined {
            Ok(result) => result,
            Err(e) => Err(Error::internal(format!("Server task panicked: {}", e))),
        },
    };

    if let Err(e) = &outcome {
        tracing::error!(error = %e, "Shutting down after fatal error");
    }

    // Broadcast shutdown and give both tasks a bounded window to drain
    let _ = shutdown_tx.send(true);
    let drain = async {
        if !consumer_handle.is_finished() {
            let _ = (&mut consumer_handle).await;
        }
        if !server_handle.is_finished() {
            let _ = (&mut server_handle).await;
        }
    };
    if tokio::time::timeout(config.server.shutdown_timeout(), drain)
        .await
        .is_err()
    {
        tracing::warn!("Shutdown timed out, aborting remaining tasks");
        consumer_handle.abort();
        server_handle.abort();
    }

    // Flush any messages still queued in the producer
    if let Err(e) = publisher.flush() {
        tracing::warn!(error = %e, "Producer flush failed during shutdown");
    }

    tracing::info!("Message service shutdown complete");
    outcome
}
