//! Handler registry: maps event-type names to asynchronous handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EventError;

/// Error type returned by event handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A consumer-side event handler.
///
/// A handler receives only the envelope's `data` payload and must be
/// idempotent: applying the same logical event twice leaves state unchanged
/// on the second application. Handlers never emit further events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, data: Value) -> Result<(), HandlerError>;
}

/// Explicit topic → handler table, built once at startup.
///
/// The topic set subscribed by the consumer loop is derived from the
/// registered handlers; registering the same topic twice is a configuration
/// error rather than a silent overwrite.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a topic.
    pub fn register(
        &mut self,
        topic: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), EventError> {
        let topic = topic.into();
        if self.handlers.contains_key(&topic) {
            return Err(EventError::DuplicateHandler(topic));
        }
        self.handlers.insert(topic, handler);
        Ok(())
    }

    /// Look up the handler for an event type.
    pub fn get(&self, event_type: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(event_type)
    }

    /// The full set of topics to subscribe to.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl EventHandler for NoopHandler {
        async fn handle(&self, _data: Value) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = HandlerRegistry::new();
        registry.register("book.created", Arc::new(NoopHandler)).unwrap();
        registry.register("book.deleted", Arc::new(NoopHandler)).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("book.created").is_some());
        assert!(registry.get("book.updated").is_none());
        assert_eq!(registry.topics(), vec!["book.created", "book.deleted"]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register("book.created", Arc::new(NoopHandler)).unwrap();

        let err = registry
            .register("book.created", Arc::new(NoopHandler))
            .unwrap_err();
        assert!(matches!(err, EventError::DuplicateHandler(topic) if topic == "book.created"));
    }
}
