//! Fan-out trigger endpoint

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::api::server::AppState;
use crate::api::MessageAccepted;
use crate::error::{Error, Result};
use crate::models::{CreateMessageRequest, QUERY_SET};

/// Publish a batch of messages to the primary topic
///
/// Validation failures are rejected with 400 before anything is
/// published. A valid request returns 200 once the whole batch has been
/// attempted; individual publish failures do not change the outcome.
///
/// # Example
/// ```
/// POST /messages
/// {"trigger_by": "user-1", "qty": 2}
/// ```
pub async fn post_message(
    State(state): State<AppState>,
    Json(request): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<MessageAccepted>)> {
    request
        .validate()
        .map_err(|e| Error::validation(e.to_string()))?;

    state.service.post_message(&request).await?;

    let total = request.qty * QUERY_SET.len() as i64;
    Ok((
        StatusCode::OK,
        Json(MessageAccepted {
            status: "success".to_string(),
            message: format!("Published {} messages", total),
        }),
    ))
}
