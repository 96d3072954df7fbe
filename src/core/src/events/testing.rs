//! In-memory doubles for the publish and consume seams.
//!
//! Used by the service crates' tests to assert on published events and to
//! drive the consumer loop without a broker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EventError;
use crate::events::consumer::{IncomingMessage, MessageSource, MessageStream};
use crate::events::publisher::EventPublisher;

/// One event captured by [`RecordingPublisher`].
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub topic: String,
    pub data: Value,
    pub correlation_id: Option<String>,
}

/// Publisher that records every publish instead of talking to a broker.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PublishedEvent>>,
    fail_next: AtomicUsize,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` publishes fail with a transport error.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|e| e.topic.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        data: Value,
        correlation_id: Option<String>,
    ) -> Result<(), EventError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(EventError::PublishFailed {
                topic: topic.to_string(),
                cause: "injected failure".to_string(),
            });
        }

        self.events.lock().unwrap().push(PublishedEvent {
            topic: topic.to_string(),
            data,
            correlation_id,
        });
        Ok(())
    }
}

/// One step of a scripted consumer run.
pub enum ScriptStep {
    /// Deliver a message on the given topic.
    Message(IncomingMessage),
    /// Fail the stream with a transport error, forcing a reconnect.
    Error(String),
}

impl ScriptStep {
    pub fn message(topic: &str, payload: impl Into<Vec<u8>>) -> Self {
        Self::Message(IncomingMessage {
            topic: topic.to_string(),
            payload: payload.into(),
        })
    }
}

/// Message source that replays a fixed script, then parks forever.
///
/// Each `connect` call continues from where the previous stream left off, so
/// a script containing an [`ScriptStep::Error`] exercises the reconnect path.
pub struct ScriptedSource {
    script: Arc<Mutex<Vec<ScriptStep>>>,
    connects: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps)),
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle for asserting on the number of `connect` calls after the
    /// source has been moved into a consumer.
    pub fn connect_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connects)
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    type Stream = ScriptedStream;

    async fn connect(&self, _topics: &[String]) -> Result<Self::Stream, EventError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedStream {
            script: Arc::clone(&self.script),
        })
    }
}

pub struct ScriptedStream {
    script: Arc<Mutex<Vec<ScriptStep>>>,
}

#[async_trait]
impl MessageStream for ScriptedStream {
    async fn next(&mut self) -> Result<IncomingMessage, EventError> {
        let step = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };

        match step {
            Some(ScriptStep::Message(message)) => Ok(message),
            Some(ScriptStep::Error(cause)) => Err(EventError::ConsumeFailed { cause }),
            // script exhausted: block until the test cancels the consumer
            None => std::future::pending().await,
        }
    }
}
