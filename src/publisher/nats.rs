//! NATS outbound publisher.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::nats::NatsClient;
use crate::types::{DomainOutboundEvent, PlateauEvent};

use super::{OutboundPublisher, PublishError};

/// Configuration for the outbound publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Prefix for outbound event subjects
    pub subject_prefix: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            subject_prefix: "junction.event".to_string(),
        }
    }
}

/// Publishes domain events as JSON on `<prefix>.instance` and
/// plateau side events on `<prefix>.karma`.
pub struct NatsPublisher {
    nats: NatsClient,
    instance_subject: String,
    karma_subject: String,
}

impl NatsPublisher {
    pub fn new(nats: NatsClient, config: PublisherConfig) -> Self {
        Self {
            nats,
            instance_subject: format!("{}.instance", config.subject_prefix),
            karma_subject: format!("{}.karma", config.subject_prefix),
        }
    }

    async fn publish_json<T: Serialize>(
        &self,
        subject: &str,
        event: &T,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event)?;
        self.nats
            .publish(subject, Bytes::from(payload))
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        debug!(subject = subject, "Outbound event published");
        Ok(())
    }
}

#[async_trait]
impl OutboundPublisher for NatsPublisher {
    async fn publish_instance(&self, event: &DomainOutboundEvent) -> Result<(), PublishError> {
        self.publish_json(&self.instance_subject, event).await
    }

    async fn publish_plateau(&self, event: &PlateauEvent) -> Result<(), PublishError> {
        self.publish_json(&self.karma_subject, event).await
    }
}
