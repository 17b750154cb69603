//! Inbound notification listener
//!
//! Subscribes to the cohort notification subject and feeds each notification
//! to the classifier: at-most-once, in delivery order, one at a time. The
//! listener does not reorder, deduplicate, or buffer.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::classifier::EventClassifier;
use crate::nats::NatsClient;
use crate::types::{InstanceChangeNotification, Result};

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Subject carrying cohort instance notifications
    pub subject: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            subject: "cohort.notifications".to_string(),
        }
    }
}

/// Consumes cohort notifications and drives the classifier.
pub struct NotificationListener {
    nats: NatsClient,
    classifier: Arc<EventClassifier>,
    config: ListenerConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl NotificationListener {
    pub fn new(nats: NatsClient, classifier: Arc<EventClassifier>, config: ListenerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            nats,
            classifier,
            config,
            shutdown_tx,
        }
    }

    /// Signal the listener to stop after the in-flight notification.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the subscription loop until shutdown or stream end.
    pub async fn run(&self) -> Result<()> {
        let mut subscriber = self.nats.subscribe(&self.config.subject).await?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(subject = %self.config.subject, "Notification listener started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Notification listener shutting down");
                    break;
                }
                message = subscriber.next() => {
                    let Some(message) = message else {
                        info!("Notification stream closed");
                        break;
                    };

                    let notification: InstanceChangeNotification =
                        match serde_json::from_slice(&message.payload) {
                            Ok(notification) => notification,
                            Err(e) => {
                                warn!(
                                    subject = %self.config.subject,
                                    error = %e,
                                    "Malformed notification, skipping"
                                );
                                continue;
                            }
                        };

                    debug!(
                        guid = notification.payload.guid(),
                        kind = ?notification.kind,
                        source = %notification.origin.source_name,
                        "Notification received"
                    );

                    self.classifier.process(notification).await;
                }
            }
        }

        Ok(())
    }
}
