//! Event-driven replication subsystem.
//!
//! The publish path wraps a `(topic, data, correlation_id)` triple in an
//! [`Envelope`] and hands it to the broker, returning only after the broker
//! has acknowledged receipt. The consume path subscribes to every topic in
//! the [`HandlerRegistry`], decodes envelopes, and dispatches to handlers
//! with retry-and-backoff, reconnecting forever on transport failure.

pub mod consumer;
pub mod envelope;
pub mod publisher;
pub mod registry;
pub mod retry;
pub mod testing;

pub use consumer::{
    EventConsumer, IncomingMessage, KafkaMessageSource, MessageSource, MessageStream,
};
pub use envelope::{Envelope, IncomingEnvelope};
pub use publisher::{EventPublisher, KafkaEventPublisher};
pub use registry::{EventHandler, HandlerError, HandlerRegistry};
pub use retry::RetryPolicy;
