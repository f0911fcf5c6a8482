//! Data models for the message service
//!
//! This module contains the domain models used throughout the pipeline:
//! the message wire format, the inbound API request, and the canned
//! response catalog.

pub mod message;

// Re-export commonly used types
pub use message::{
    CreateMessageRequest, MessageData, ResponseCatalog, StoredConversation, FALLBACK_RESPONSE,
    QUERY_SET,
};
