//! NATS client wrapper
//!
//! Connection management with keep-alive, publish, subscribe, and
//! request/response with timeouts.

use async_nats::{Client, ConnectOptions, Subscriber};
use bytes::Bytes;
use std::time::Duration;
use tracing::info;

use crate::config::NatsArgs;
use crate::types::JunctionError;

/// Default request timeout for RPC-style calls
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default ping interval for keep-alive
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

/// NATS client wrapper
#[derive(Clone)]
pub struct NatsClient {
    /// Underlying NATS client
    client: Client,
    /// Request timeout for RPC calls
    request_timeout: Duration,
}

impl NatsClient {
    /// Create a new NATS client
    pub async fn new(args: &NatsArgs, name: &str) -> Result<Self, JunctionError> {
        info!("Connecting to NATS at {}", args.nats_url);

        // Fail fast if NATS isn't available; reconnection still works after
        // the initial successful connection.
        let mut options = ConnectOptions::new()
            .name(name)
            .ping_interval(DEFAULT_PING_INTERVAL)
            .connection_timeout(Duration::from_secs(5));

        if let (Some(user), Some(pass)) = (&args.nats_user, &args.nats_password) {
            options = options.user_and_password(user.clone(), pass.clone());
        }

        let client = options
            .connect(&args.nats_url)
            .await
            .map_err(|e| JunctionError::Nats(format!("Failed to connect: {}", e)))?;

        info!("Connected to NATS at {}", args.nats_url);

        Ok(Self {
            client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Set the request timeout for RPC calls
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Get the underlying NATS client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Publish a message to a subject
    pub async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), JunctionError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| JunctionError::Nats(format!("Publish failed: {}", e)))
    }

    /// Subscribe to a subject
    pub async fn subscribe(&self, subject: &str) -> Result<Subscriber, JunctionError> {
        self.client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| JunctionError::Nats(format!("Subscribe failed: {}", e)))
    }

    /// Request/response pattern with timeout
    pub async fn request(
        &self,
        subject: &str,
        payload: Bytes,
    ) -> Result<async_nats::Message, JunctionError> {
        tokio::time::timeout(
            self.request_timeout,
            self.client.request(subject.to_string(), payload),
        )
        .await
        .map_err(|_| JunctionError::Nats(format!("Request to {} timed out", subject)))?
        .map_err(|e| JunctionError::Nats(format!("Request failed: {}", e)))
    }
}
