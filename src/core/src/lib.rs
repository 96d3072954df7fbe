//! # Libris Core
//!
//! Shared infrastructure for the Libris service pair (authors-service and
//! books-service). Each service owns one entity type and keeps a local,
//! eventually-consistent read cache of the other service's entities, kept in
//! sync by asynchronous domain events over Kafka.
//!
//! This crate holds everything the two services would otherwise duplicate:
//!
//! - **Event Envelope**: the wire-level message shape shared by both services
//! - **Publisher**: broker connection with a scoped start/stop lifecycle
//! - **Handler Registry**: explicit topic → handler table built at startup
//! - **Consumer Loop**: subscribe/dispatch/retry with unbounded reconnect
//! - **Config / Telemetry / Errors**: the ambient stack both services share

pub mod config;
pub mod error;
pub mod events;
pub mod telemetry;

pub use error::{ErrorResponse, EventError, Result, ServiceError};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, KafkaConfig, ObservabilityConfig};
    pub use crate::error::{ErrorResponse, EventError, Result, ServiceError};
    pub use crate::events::{
        Envelope, EventConsumer, EventHandler, EventPublisher, HandlerRegistry,
        KafkaEventPublisher, KafkaMessageSource, RetryPolicy,
    };
}
