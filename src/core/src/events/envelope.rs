//! Event envelope: the wire-level message shape shared by both services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::EventError;

/// Envelope wrapping every published event.
///
/// `event_id` is generated per publish and used only for tracing; handlers
/// must tolerate redelivery independently of it. `correlation_id` threads
/// from the originating request through to the consumer-side log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event_type: String,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub data: Value,
}

impl Envelope {
    /// Construct an envelope for publishing.
    ///
    /// A fresh `event_id` and UTC timestamp are generated; `correlation_id`
    /// defaults to a fresh UUID when the caller supplies none.
    pub fn new(event_type: impl Into<String>, data: Value, correlation_id: Option<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            correlation_id: correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            data,
        }
    }

    /// Serialize to UTF-8 JSON for the broker.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Tolerant decode of an incoming message.
///
/// Only a payload that fails to parse as a JSON object counts as malformed;
/// missing fields fall back to defaults so the consumer can still dispatch
/// (the event type falls back to the raw topic name).
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingEnvelope {
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_id: Option<Uuid>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl IncomingEnvelope {
    /// Parse from raw broker payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(bytes).map_err(|e| EventError::Decode {
            reason: e.to_string(),
        })
    }

    /// The event type, falling back to the topic the message arrived on.
    pub fn event_type_or<'a>(&'a self, topic: &'a str) -> &'a str {
        self.event_type.as_deref().unwrap_or(topic)
    }

    /// The correlation id, or `"unknown"` when the publisher sent none.
    pub fn correlation_id(&self) -> &str {
        self.correlation_id.as_deref().unwrap_or("unknown")
    }
}
