//! Repository query facade
//!
//! The single I/O dependency of the context builder: fetch a full entity
//! record, or page through the active relationships of a given type touching
//! an entity.

mod client;
mod memory;

pub use client::{NatsRepositoryClient, RepositoryClientConfig};
pub use memory::MemoryRepository;

use async_trait::async_trait;

use crate::types::{EntityRecord, Relationship};

/// Failures surfaced by the repository facade.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity {guid} not found")]
    NotFound { guid: String },

    #[error("Entity {guid} is only known as a proxy")]
    ProxyOnly { guid: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unknown type {type_name}")]
    UnknownType { type_name: String },

    #[error("Paging error: {0}")]
    Paging(String),

    #[error("Repository backend error: {0}")]
    Backend(String),
}

/// Read access to the cohort's instance graph.
///
/// Relationship listings return active instances only, in a stable order,
/// honoring the start offset and page size (`page_size` 0 means no limit).
#[async_trait]
pub trait RepositoryFacade: Send + Sync {
    /// Fetch the full record for an entity.
    async fn entity(&self, guid: &str) -> Result<EntityRecord, RepositoryError>;

    /// List active relationships of `relationship_type_name` touching
    /// `entity_guid`.
    async fn relationships(
        &self,
        entity_guid: &str,
        relationship_type_name: &str,
        start_from: usize,
        page_size: usize,
    ) -> Result<Vec<Relationship>, RepositoryError>;
}
