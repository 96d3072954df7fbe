//! Consumer loop: subscribe, decode, dispatch, retry, reconnect.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::EventError;
use crate::events::envelope::IncomingEnvelope;
use crate::events::registry::HandlerRegistry;
use crate::events::retry::RetryPolicy;

/// Delay between reconnect attempts after a transport failure.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// A raw message pulled off the broker.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// An open subscription yielding messages until the transport fails.
#[async_trait]
pub trait MessageStream: Send {
    async fn next(&mut self) -> Result<IncomingMessage, EventError>;
}

/// Transport seam for the consumer loop.
///
/// The loop re-calls `connect` after every transport failure, so a source
/// must be able to produce a fresh subscription repeatedly.
#[async_trait]
pub trait MessageSource: Send + Sync {
    type Stream: MessageStream;

    async fn connect(&self, topics: &[String]) -> Result<Self::Stream, EventError>;
}

/// Kafka-backed message source.
pub struct KafkaMessageSource {
    config: KafkaConfig,
    group_id: String,
}

impl KafkaMessageSource {
    pub fn new(config: KafkaConfig, group_id: impl Into<String>) -> Self {
        Self {
            config,
            group_id: group_id.into(),
        }
    }
}

#[async_trait]
impl MessageSource for KafkaMessageSource {
    type Stream = KafkaMessageStream;

    async fn connect(&self, topics: &[String]) -> Result<Self::Stream, EventError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.config.bootstrap_servers)
            .set("group.id", &self.group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true")
            .create()
            .map_err(|e| EventError::ConnectionFailed {
                broker: self.config.bootstrap_servers.clone(),
                cause: e.to_string(),
            })?;

        let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer
            .subscribe(&topic_refs)
            .map_err(|e| EventError::ConnectionFailed {
                broker: self.config.bootstrap_servers.clone(),
                cause: e.to_string(),
            })?;

        Ok(KafkaMessageStream { consumer })
    }
}

pub struct KafkaMessageStream {
    consumer: StreamConsumer,
}

#[async_trait]
impl MessageStream for KafkaMessageStream {
    async fn next(&mut self) -> Result<IncomingMessage, EventError> {
        let message = self.consumer.recv().await.map_err(|e| EventError::ConsumeFailed {
            cause: e.to_string(),
        })?;

        Ok(IncomingMessage {
            topic: message.topic().to_string(),
            payload: message.payload().unwrap_or_default().to_vec(),
        })
    }
}

/// The long-running consumer loop.
///
/// Subscribes to the registry's topic set and dispatches each message to its
/// handler. Transport failures trigger reconnection after a fixed delay,
/// forever; handler failures are retried per the [`RetryPolicy`] and then
/// dead-lettered (logged with the full payload and skipped). The loop never
/// exits on its own; only cancellation stops it.
pub struct EventConsumer<S: MessageSource> {
    source: S,
    registry: HandlerRegistry,
    retry: RetryPolicy,
    reconnect_delay: Duration,
}

impl<S: MessageSource> EventConsumer<S> {
    pub fn new(source: S, registry: HandlerRegistry) -> Self {
        Self {
            source,
            registry,
            retry: RetryPolicy::default(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        if self.registry.is_empty() {
            warn!("no event handlers registered; consumer not started");
            return;
        }

        let topics = self.registry.topics();
        info!(?topics, "event consumer starting");

        'outer: loop {
            let mut stream = tokio::select! {
                _ = shutdown.cancelled() => break 'outer,
                result = self.source.connect(&topics) => match result {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!(error = %e, delay_secs = self.reconnect_delay.as_secs(),
                            "failed to connect consumer; retrying");
                        tokio::select! {
                            _ = shutdown.cancelled() => break 'outer,
                            _ = tokio::time::sleep(self.reconnect_delay) => continue 'outer,
                        }
                    }
                },
            };

            info!(?topics, "event consumer subscribed");

            loop {
                let message = tokio::select! {
                    _ = shutdown.cancelled() => break 'outer,
                    result = stream.next() => match result {
                        Ok(message) => message,
                        Err(e) => {
                            error!(error = %e, delay_secs = self.reconnect_delay.as_secs(),
                                "consumer transport failed; reconnecting");
                            break;
                        }
                    },
                };

                self.process_message(&message, &shutdown).await;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break 'outer,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        info!("event consumer stopped");
    }

    /// Decode and dispatch one message. Never fails: malformed payloads and
    /// unknown event types are logged and dropped, handler errors are retried
    /// and ultimately dead-lettered. Cancellation lands in the backoff sleep
    /// between attempts; an in-flight handler invocation runs to completion.
    async fn process_message(&self, message: &IncomingMessage, shutdown: &CancellationToken) {
        let envelope = match IncomingEnvelope::from_bytes(&message.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(topic = %message.topic, error = %e, "malformed event payload; skipping");
                return;
            }
        };

        let event_type = envelope.event_type_or(&message.topic).to_string();
        let correlation_id = envelope.correlation_id().to_string();

        let Some(handler) = self.registry.get(&event_type) else {
            warn!(topic = %message.topic, event_type, correlation_id,
                "no handler for event type; skipping");
            return;
        };

        debug!(event_type, correlation_id, "dispatching event");

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match handler.handle(envelope.data.clone()).await {
                Ok(()) => {
                    info!(event_type, correlation_id, attempt, "event handled");
                    return;
                }
                Err(e) => match self.retry.backoff(attempt) {
                    Some(delay) => {
                        warn!(event_type, correlation_id, attempt, error = %e,
                            delay_secs = delay.as_secs(), "handler failed; retrying");
                        tokio::select! {
                            _ = shutdown.cancelled() => {
                                warn!(event_type, correlation_id, attempt,
                                    "shutdown requested during retry backoff; abandoning event");
                                return;
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    None => {
                        let payload = String::from_utf8_lossy(&message.payload);
                        error!(event_type, correlation_id, attempt, error = %e,
                            payload = %payload, "handler failed after final attempt; dead-lettered");
                        return;
                    }
                },
            }
        }
    }
}
