//! Message data models
//!
//! Defines the wire format consumed from and produced to Kafka, the
//! request body accepted by the HTTP API, and the canned response
//! catalog used by the transformer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Fallback reply when a message has no canned response
pub const FALLBACK_RESPONSE: &str = "I'm sorry, I didn't understand that. 🤔";

/// Fixed query set used by the fan-out producer path
pub const QUERY_SET: [&str; 6] = [
    "Hello",
    "Weather update",
    "Tell me a joke",
    "Good morning",
    "What's your name?",
    "How are you?",
];

/// Message as it travels on the wire
///
/// Flat JSON object with at least `message` and `trigger_by` fields.
/// Immutable once read from the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    /// Free-form text content
    pub message: String,

    /// Originator identifier
    pub trigger_by: String,
}

impl MessageData {
    pub fn new(message: impl Into<String>, trigger_by: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trigger_by: trigger_by.into(),
        }
    }
}

/// Request body for `POST /messages`
///
/// Validated at the API boundary before any broker interaction.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateMessageRequest {
    /// Originator identifier, required and non-empty
    #[validate(length(min = 1, message = "trigger_by must not be empty"))]
    pub trigger_by: String,

    /// Number of repetitions of the fixed query set to publish
    #[validate(range(min = 0, message = "qty must be zero or greater"))]
    pub qty: i64,
}

/// Document persisted for each consumed message
///
/// Serialized as a single opaque JSON string into the `message` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConversation {
    /// Original inbound text
    pub received_message: String,

    /// Generated reply
    pub response_message: String,
}

/// Canned response lookup table
///
/// Maps inbound text to a reply by exact match, falling back to
/// [`FALLBACK_RESPONSE`]. The table is a placeholder business rule and
/// can be replaced wholesale via [`ResponseCatalog::new`].
#[derive(Debug, Clone)]
pub struct ResponseCatalog {
    responses: HashMap<String, String>,
}

impl Default for ResponseCatalog {
    fn default() -> Self {
        let responses = [
            ("Hello", "Hi there! 😊"),
            ("Weather update", "The weather is sunny and bright! ☀"),
            (
                "Tell me a joke",
                "Why did the chicken cross the road? To get to the other side! 😂",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self { responses }
    }
}

impl ResponseCatalog {
    /// Create a catalog from an arbitrary mapping
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self { responses }
    }

    /// Look up the reply for a message, falling back to the fixed default
    pub fn respond(&self, message: &str) -> &str {
        self.responses
            .get(message)
            .map(String::as_str)
            .unwrap_or(FALLBACK_RESPONSE)
    }
}
