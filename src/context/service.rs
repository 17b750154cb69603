//! Context query service
//!
//! Answers context requests over NATS request/reply so downstream consumers
//! can ask for table contexts and column listings without talking to the
//! cohort directly.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::nats::NatsClient;
use crate::types::Result;

use super::builder::ContextBuilder;
use super::nodes::{AssetSummary, TableColumn, TableContext};

/// Configuration for the context query service.
#[derive(Debug, Clone)]
pub struct ContextServiceConfig {
    /// Subject context requests arrive on
    pub subject: String,
}

impl Default for ContextServiceConfig {
    fn default() -> Self {
        Self {
            subject: "junction.context".to_string(),
        }
    }
}

/// Context request from a downstream consumer.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ContextRequest {
    TableContext {
        table_guid: String,
    },
    TableColumns {
        table_guid: String,
        #[serde(default)]
        start_from: usize,
        #[serde(default)]
        page_size: usize,
    },
    TablesForDatabase {
        database_guid: String,
        #[serde(default)]
        start_from: usize,
        #[serde(default)]
        page_size: usize,
    },
}

/// Context response to a downstream consumer.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ContextResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<TableContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<TableColumn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tables: Option<Vec<AssetSummary>>,
}

impl ContextResponse {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Serves context projections over NATS request/reply.
pub struct ContextQueryService {
    nats: NatsClient,
    builder: Arc<ContextBuilder>,
    config: ContextServiceConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl ContextQueryService {
    pub fn new(nats: NatsClient, builder: Arc<ContextBuilder>, config: ContextServiceConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            nats,
            builder,
            config,
            shutdown_tx,
        }
    }

    /// Signal the service to stop after the in-flight request.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the request loop until shutdown or stream end.
    pub async fn run(&self) -> Result<()> {
        let mut subscriber = self.nats.subscribe(&self.config.subject).await?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(subject = %self.config.subject, "Context query service started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Context query service shutting down");
                    break;
                }
                message = subscriber.next() => {
                    let Some(message) = message else {
                        info!("Context request stream closed");
                        break;
                    };

                    let response = self.handle(&message.payload).await;
                    let Some(reply) = message.reply else {
                        warn!("Context request without reply subject, dropping response");
                        continue;
                    };

                    match serde_json::to_vec(&response) {
                        Ok(payload) => {
                            if let Err(e) = self.nats.publish(reply.as_str(), Bytes::from(payload)).await {
                                warn!(error = %e, "Failed to publish context response");
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to serialize context response"),
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle(&self, payload: &[u8]) -> ContextResponse {
        let request: ContextRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed context request");
                return ContextResponse::failure(format!("Malformed request: {e}"));
            }
        };

        debug!(request = ?request, "Context request received");

        match request {
            ContextRequest::TableContext { table_guid } => {
                match self.builder.table_context(&table_guid).await {
                    Ok(context) => ContextResponse {
                        success: true,
                        context: Some(context),
                        ..ContextResponse::default()
                    },
                    Err(e) => ContextResponse::failure(e.to_string()),
                }
            }
            ContextRequest::TableColumns {
                table_guid,
                start_from,
                page_size,
            } => {
                match self
                    .builder
                    .table_columns(&table_guid, start_from, page_size)
                    .await
                {
                    Ok(columns) => ContextResponse {
                        success: true,
                        columns: Some(columns),
                        ..ContextResponse::default()
                    },
                    Err(e) => ContextResponse::failure(e.to_string()),
                }
            }
            ContextRequest::TablesForDatabase {
                database_guid,
                start_from,
                page_size,
            } => {
                match self
                    .builder
                    .tables_for_database(&database_guid, start_from, page_size)
                    .await
                {
                    Ok(tables) => ContextResponse {
                        success: true,
                        tables: Some(tables),
                        ..ContextResponse::default()
                    },
                    Err(e) => ContextResponse::failure(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization_defaults_paging() {
        let json = r#"{"op": "table_columns", "table_guid": "table-1"}"#;
        let request: ContextRequest = serde_json::from_str(json).unwrap();
        match request {
            ContextRequest::TableColumns {
                table_guid,
                start_from,
                page_size,
            } => {
                assert_eq!(table_guid, "table-1");
                assert_eq!(start_from, 0);
                assert_eq!(page_size, 0);
            }
            other => panic!("expected TableColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_response_shape() {
        let response = ContextResponse::failure("no such table".to_string());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("no such table"));
        assert!(!json.contains("columns"));
    }
}
