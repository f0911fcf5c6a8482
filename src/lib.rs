//! Message service library
//!
//! Exposes the core modules for use in integration tests and as a library
//! for other applications.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod kafka;
pub mod logging;
pub mod models;
pub mod service;
pub mod test_utils;

// Re-export commonly used types at the crate root
pub use config::{Config, DurabilityMode};
pub use error::{Error, Result};

// Re-export model types
pub use models::{CreateMessageRequest, MessageData, ResponseCatalog, StoredConversation};

// Re-export the pipeline building blocks
pub use kafka::{KafkaPublisher, MessageConsumer, MessageProcessor, MessagePublisher};
pub use service::MessageService;

// Re-export API server functions
pub use api::server::{create_router, create_server, shutdown_signal, AppState};

// Re-export health check types
pub use api::{
    BuildInfo, ComponentHealth, HealthResponse, HealthState, HealthStatus, ReadyResponse,
};
