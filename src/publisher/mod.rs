//! Outbound event publication
//!
//! Delivery-best-effort sink for assembled domain events. Delivery
//! guarantees are the transport's concern; the classifier treats publication
//! as fire-and-forget and only logs failures.

mod nats;

pub use nats::{NatsPublisher, PublisherConfig};

use async_trait::async_trait;

use crate::types::{DomainOutboundEvent, PlateauEvent};

/// Failures while handing an event to the transport.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Sink for outbound domain events.
#[async_trait]
pub trait OutboundPublisher: Send + Sync {
    /// Publish a domain event about an instance change.
    async fn publish_instance(&self, event: &DomainOutboundEvent) -> Result<(), PublishError>;

    /// Publish a karma plateau side event.
    async fn publish_plateau(&self, event: &PlateauEvent) -> Result<(), PublishError>;
}
