//! Error types shared by both services.
//!
//! Two taxonomies live here:
//!
//! - [`ServiceError`]: synchronous failures of the domain layer (validation,
//!   not-found, storage). These surface to the caller at the REST boundary.
//! - [`EventError`]: failures of the replication subsystem (broker transport,
//!   envelope decoding, handler execution). These never surface to a live
//!   caller; they are retried, logged, or dead-lettered by the consumer loop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specialized Result type for domain operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Domain Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors produced by the domain services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller-supplied data failed a business rule. Never retried, never
    /// published.
    #[error("{0}")]
    Validation(String),

    /// A referenced local or cached entity is absent.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Storage failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    /// Replication subsystem failure.
    #[error(transparent)]
    Event(#[from] EventError),
}

impl ServiceError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Stable machine-readable code for API responses.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Event(_) => "EVENT_ERROR",
        }
    }

    /// HTTP status equivalent for the REST boundary.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Database(_) | Self::Configuration(_) | Self::Event(_) => 500,
        }
    }

    /// Build the structured response body for this error.
    pub fn to_response(&self, correlation_id: impl Into<String>) -> ErrorResponse {
        ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            correlation_id: correlation_id.into(),
        }
    }
}

/// Structured error body returned to API clients, carrying the request's
/// correlation id so a failed call can be matched to its log lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Replication Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors produced by the event publish/consume infrastructure.
#[derive(Debug, Error)]
pub enum EventError {
    /// Failed to open a connection to the broker.
    #[error("connection to broker {broker} failed: {cause}")]
    ConnectionFailed { broker: String, cause: String },

    /// Broker did not accept a published event.
    #[error("failed to publish to topic {topic}: {cause}")]
    PublishFailed { topic: String, cause: String },

    /// Subscription or mid-stream read failure.
    #[error("consume failed: {cause}")]
    ConsumeFailed { cause: String },

    /// Message payload did not parse as an envelope. Dropped, not retried.
    #[error("invalid event payload: {reason}")]
    Decode { reason: String },

    /// Envelope could not be serialized for publishing.
    #[error("failed to serialize envelope: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A topic was registered twice when building the handler registry.
    #[error("handler already registered for topic {0}")]
    DuplicateHandler(String),
}

impl EventError {
    /// True if this error is transient and worth retrying.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::PublishFailed { .. } | Self::ConsumeFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::validation("too short").status_code(), 400);
        assert_eq!(ServiceError::not_found("author", 7).status_code(), 404);
        assert_eq!(
            ServiceError::Event(EventError::Decode {
                reason: "bad".into()
            })
            .status_code(),
            500
        );
    }

    #[test]
    fn test_error_response_carries_correlation_id() {
        let err = ServiceError::not_found("book", 42);
        let response = err.to_response("req-123");

        assert_eq!(response.error, "NOT_FOUND");
        assert_eq!(response.correlation_id, "req-123");
        assert!(response.message.contains("42"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(EventError::ConsumeFailed {
            cause: "broker gone".into()
        }
        .is_transient());
        assert!(!EventError::Decode {
            reason: "not json".into()
        }
        .is_transient());
        assert!(!EventError::DuplicateHandler("book.created".into()).is_transient());
    }
}
