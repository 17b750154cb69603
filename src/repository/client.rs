//! NATS-backed repository client
//!
//! Request/reply against the cohort query service with JSON DTOs and
//! correlation ids. The query service is expected to answer on a single
//! subject; timeouts come from the underlying NATS client.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::nats::NatsClient;
use crate::types::{EntityRecord, Relationship};

use super::{RepositoryError, RepositoryFacade};

/// Configuration for the repository client.
#[derive(Debug, Clone)]
pub struct RepositoryClientConfig {
    /// Subject the cohort query service answers on
    pub query_subject: String,
}

impl Default for RepositoryClientConfig {
    fn default() -> Self {
        Self {
            query_subject: "cohort.query".to_string(),
        }
    }
}

/// Query request sent to the cohort query service.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum QueryRequest {
    GetEntity {
        request_id: String,
        guid: String,
    },
    GetRelationships {
        request_id: String,
        entity_guid: String,
        relationship_type_name: String,
        start_from: usize,
        page_size: usize,
    },
}

/// Query response from the cohort query service.
#[derive(Debug, Serialize, Deserialize)]
struct QueryResponse {
    success: bool,
    /// Machine-readable failure kind when success is false
    #[serde(default)]
    error_kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    entity: Option<EntityRecord>,
    #[serde(default)]
    relationships: Option<Vec<Relationship>>,
}

/// Repository facade implementation speaking to the cohort over NATS.
pub struct NatsRepositoryClient {
    nats: NatsClient,
    config: RepositoryClientConfig,
}

impl NatsRepositoryClient {
    pub fn new(nats: NatsClient, config: RepositoryClientConfig) -> Self {
        Self { nats, config }
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, RepositoryError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| RepositoryError::Backend(e.to_string()))?;

        let message = self
            .nats
            .request(&self.config.query_subject, Bytes::from(payload))
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        let response: QueryResponse = serde_json::from_slice(&message.payload)
            .map_err(|e| RepositoryError::Backend(format!("Malformed query response: {e}")))?;

        debug!(
            subject = %self.config.query_subject,
            success = response.success,
            "Cohort query completed"
        );
        Ok(response)
    }

    fn failure(response: QueryResponse, guid: &str, type_name: &str) -> RepositoryError {
        let detail = response.error.unwrap_or_else(|| "unspecified".to_string());
        match response.error_kind.as_deref() {
            Some("not_found") => RepositoryError::NotFound {
                guid: guid.to_string(),
            },
            Some("proxy_only") => RepositoryError::ProxyOnly {
                guid: guid.to_string(),
            },
            Some("unauthorized") => RepositoryError::Unauthorized(detail),
            Some("unknown_type") => RepositoryError::UnknownType {
                type_name: type_name.to_string(),
            },
            Some("paging") => RepositoryError::Paging(detail),
            _ => RepositoryError::Backend(detail),
        }
    }
}

#[async_trait]
impl RepositoryFacade for NatsRepositoryClient {
    async fn entity(&self, guid: &str) -> Result<EntityRecord, RepositoryError> {
        let request = QueryRequest::GetEntity {
            request_id: Uuid::new_v4().to_string(),
            guid: guid.to_string(),
        };

        let response = self.query(&request).await?;
        if !response.success {
            return Err(Self::failure(response, guid, ""));
        }

        response.entity.ok_or_else(|| {
            RepositoryError::Backend("Query response missing entity record".to_string())
        })
    }

    async fn relationships(
        &self,
        entity_guid: &str,
        relationship_type_name: &str,
        start_from: usize,
        page_size: usize,
    ) -> Result<Vec<Relationship>, RepositoryError> {
        let request = QueryRequest::GetRelationships {
            request_id: Uuid::new_v4().to_string(),
            entity_guid: entity_guid.to_string(),
            relationship_type_name: relationship_type_name.to_string(),
            start_from,
            page_size,
        };

        let response = self.query(&request).await?;
        if !response.success {
            return Err(Self::failure(response, entity_guid, relationship_type_name));
        }

        response.relationships.ok_or_else(|| {
            RepositoryError::Backend("Query response missing relationship list".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = QueryRequest::GetRelationships {
            request_id: "req-1".to_string(),
            entity_guid: "e-1".to_string(),
            relationship_type_name: "AttributeForSchema".to_string(),
            start_from: 0,
            page_size: 50,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"op\":\"get_relationships\""));
        assert!(json.contains("AttributeForSchema"));
    }

    #[test]
    fn test_failure_mapping() {
        let response = QueryResponse {
            success: false,
            error_kind: Some("not_found".to_string()),
            error: Some("no such entity".to_string()),
            entity: None,
            relationships: None,
        };

        match NatsRepositoryClient::failure(response, "e-1", "") {
            RepositoryError::NotFound { guid } => assert_eq!(guid, "e-1"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_failure_kind_maps_to_backend() {
        let response = QueryResponse {
            success: false,
            error_kind: Some("something_else".to_string()),
            error: Some("boom".to_string()),
            entity: None,
            relationships: None,
        };

        match NatsRepositoryClient::failure(response, "e-1", "") {
            RepositoryError::Backend(detail) => assert_eq!(detail, "boom"),
            other => panic!("expected Backend, got {other:?}"),
        }
    }
}
