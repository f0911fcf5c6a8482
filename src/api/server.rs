//! HTTP server setup
//!
//! Builds the Axum router with all routes and middleware, and runs the
//! server with graceful shutdown driven by the shared shutdown channel.

use axum::{
    extract::MatchedPath,
    http::{header, Method, Request},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderName;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use uuid::Uuid;

use crate::{
    api::health::{build_info, health_check, ready_check, HealthState},
    api::messages::post_message,
    config::Config,
    error::Result,
    service::MessageService,
};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    /// Fan-out publisher service
    pub service: Arc<MessageService>,
    /// Component health tracking
    pub health: HealthState,
}

/// Request ID generator
#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// Create the main application router
pub fn create_router(config: Arc<Config>, state: AppState) -> Router {
    let app = Router::new()
        .route("/messages", post(post_message))
        .route("/healthz", get(health_check))
        .route("/readyz", get(ready_check))
        .route("/build", get(build_info))
        .with_state(state);

    // Apply middleware
    app.layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            MakeRequestUuid::default(),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path =
                        request.extensions().get::<MatchedPath>().map(MatchedPath::as_str);
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "http_request",
                        method = ?request.method(),
                        matched_path,
                        request_id,
                        latency = tracing::field::Empty,
                        status = tracing::field::Empty,
                    )
                })
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(tracing::Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
}

/// Create and start the HTTP server
///
/// Runs until the shutdown channel fires, then stops accepting new
/// connections and drains in-flight requests.
pub async fn create_server(
    config: Arc<Config>,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let app = create_router(config.clone(), state);
    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .map_err(|e| crate::error::Error::config(format!("Invalid server address: {}", e)))?;

    tracing::info!(
        address = %addr,
        environment = %config.server.environment,
        "Starting HTTP server"
    );

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| crate::error::Error::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(
        address = %addr,
        "HTTP server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
            tracing::info!("HTTP server shutting down");
        })
        .await
        .map_err(|e| crate::error::Error::internal(format!("Server error: {}", e)))
}

/// Shutdown signal handler
///
/// Waits for CTRL+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockPublisher;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            server: crate::config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                log_level: "info".to_string(),
                environment: "test".to_string(),
                request_timeout_secs: 30,
                shutdown_timeout_secs: 30,
            },
            kafka: crate::kafka::KafkaConfig::default(),
            database: crate::config::DatabaseConfig {
                url: "postgresql://test@localhost/test".to_string(),
                pool_max_size: 10,
                pool_min_idle: 1,
                pool_timeout_seconds: 30,
                pool_idle_timeout_seconds: 600,
            },
            processing: crate::config::ProcessingConfig {
                durability: "commit-after-store".to_string(),
                publish_concurrency: 4,
            },
        })
    }

    fn test_state() -> (AppState, Arc<MockPublisher>) {
        let publisher = Arc::new(MockPublisher::new());
        let service = Arc::new(MessageService::new(
            publisher.clone(),
            "message.publish",
            4,
        ));
        (
            AppState {
                service,
                health: HealthState::new(),
            },
            publisher,
        )
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _) = test_state();
        let app = create_router(test_config(), state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/healthz")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_build_endpoint() {
        let (state, _) = test_state();
        let app = create_router(test_config(), state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/build")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_messages_publishes_batch() {
        let (state, publisher) = test_state();
        let app = create_router(test_config(), state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/messages")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(
                        r#"{"trigger_by": "user-1", "qty": 1}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            publisher.published().len(),
            crate::models::QUERY_SET.len()
        );
    }

    #[tokio::test]
    async fn test_post_messages_rejects_invalid_request() {
        let (state, publisher) = test_state();
        let app = create_router(test_config(), state);

        // Negative quantity fails validation before anything is published
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/messages")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(
                        r#"{"trigger_by": "user-1", "qty": -1}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_post_messages_rejects_empty_trigger() {
        let (state, _) = test_state();
        let app = create_router(test_config(), state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/messages")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"trigger_by": "", "qty": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
