//! Event publisher with a scoped start/stop lifecycle.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::KafkaConfig;
use crate::error::EventError;
use crate::events::envelope::Envelope;

/// Outbound event publishing.
///
/// The domain services publish through this trait; publish failures must
/// never unwind the local write that already committed, so callers log and
/// continue on `Err`.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        data: Value,
        correlation_id: Option<String>,
    ) -> Result<(), EventError>;
}

/// Kafka-backed publisher.
///
/// Owned by the service binary and passed into the domain layer; [`start`]
/// is called at service startup and [`stop`] at shutdown. Publishing before
/// `start` is a logged no-op rather than an error, so an in-flight request
/// is never failed by publisher lifecycle races.
///
/// [`start`]: KafkaEventPublisher::start
/// [`stop`]: KafkaEventPublisher::stop
pub struct KafkaEventPublisher {
    config: KafkaConfig,
    client_id: String,
    producer: RwLock<Option<FutureProducer>>,
}

impl KafkaEventPublisher {
    pub fn new(config: KafkaConfig, client_id: impl Into<String>) -> Self {
        Self {
            config,
            client_id: client_id.into(),
            producer: RwLock::new(None),
        }
    }

    /// Create the underlying producer and begin accepting publishes.
    pub async fn start(&self) -> Result<(), EventError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &self.config.bootstrap_servers)
            .set("client.id", &self.client_id)
            .set("message.timeout.ms", self.config.message_timeout_ms.to_string())
            .set("acks", "all")
            .create()
            .map_err(|e| EventError::ConnectionFailed {
                broker: self.config.bootstrap_servers.clone(),
                cause: e.to_string(),
            })?;

        *self.producer.write().await = Some(producer);
        info!(
            bootstrap_servers = %self.config.bootstrap_servers,
            client_id = %self.client_id,
            "event publisher started"
        );
        Ok(())
    }

    /// Flush pending deliveries and drop the producer.
    pub async fn stop(&self) {
        if let Some(producer) = self.producer.write().await.take() {
            if let Err(e) = producer.flush(Duration::from_secs(5)) {
                warn!(error = %e, "event publisher flush failed during shutdown");
            }
            info!("event publisher stopped");
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(
        &self,
        topic: &str,
        data: Value,
        correlation_id: Option<String>,
    ) -> Result<(), EventError> {
        let guard = self.producer.read().await;
        let Some(producer) = guard.as_ref() else {
            warn!(topic, "publish before start; event dropped");
            return Ok(());
        };

        let envelope = Envelope::new(topic, data, correlation_id);
        let payload = envelope.to_bytes()?;

        let record = FutureRecord::<str, _>::to(topic).payload(&payload);

        // Returns only after the broker acknowledged receipt.
        producer
            .send(record, Duration::from_millis(self.config.message_timeout_ms))
            .await
            .map_err(|(err, _)| EventError::PublishFailed {
                topic: topic.to_string(),
                cause: err.to_string(),
            })?;

        info!(
            topic,
            event_id = %envelope.event_id,
            correlation_id = %envelope.correlation_id,
            "event published"
        );
        Ok(())
    }
}
