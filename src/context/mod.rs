//! Context graph assembly
//!
//! Reconstructs the logical hierarchy around relational assets (column →
//! table → schema → database → connection → endpoint) from the cohort's
//! entity/relationship graph. Mandatory hops fail hard with the entity and
//! relationship type that broke the chain; column decorations are
//! best-effort annotations that default to absent.

mod builder;
mod nodes;
mod service;

pub use builder::ContextBuilder;
pub use nodes::{
    AssetSummary, BusinessTerm, ConnectorSummary, EndpointSummary, ForeignKeyRef, TableColumn,
    TableContext,
};
pub use service::{ContextQueryService, ContextServiceConfig};

use crate::repository::RepositoryError;

/// Relationship type names for each hop in the context chain.
pub const SCHEMA_ATTRIBUTE_TYPE: &str = "SchemaAttributeType";
pub const ATTRIBUTE_FOR_SCHEMA: &str = "AttributeForSchema";
pub const ASSET_SCHEMA_TYPE: &str = "AssetSchemaType";
pub const DATA_CONTENT_FOR_DATASET: &str = "DataContentForDataset";
pub const CONNECTION_TO_ASSET: &str = "ConnectionToAsset";
pub const CONNECTION_TO_ENDPOINT: &str = "ConnectionToEndpoint";
pub const CONNECTION_CONNECTOR_TYPE: &str = "ConnectionConnectorType";
pub const SEMANTIC_ASSIGNMENT: &str = "SemanticAssignment";
pub const FOREIGN_KEY: &str = "ForeignKey";

/// Classification carried by primary key columns.
pub const PRIMARY_KEY_CLASSIFICATION: &str = "PrimaryKey";

/// Failures while assembling a context projection.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A mandatory hop found no relationships where one was expected.
    #[error("No {relationship_type} relationship found for entity {entity_guid}")]
    MissingHop {
        entity_guid: String,
        relationship_type: &'static str,
    },

    /// A relationship exists but its far end could not be determined.
    #[error("Relationship {relationship_guid} has no usable far end for entity {entity_guid}")]
    DanglingRelationship {
        entity_guid: String,
        relationship_guid: String,
    },

    /// The repository failed while resolving a hop.
    #[error("Repository failure at {relationship_type} hop for entity {entity_guid}: {source}")]
    Hop {
        entity_guid: String,
        relationship_type: &'static str,
        #[source]
        source: RepositoryError,
    },

    /// The repository failed while fetching an entity record.
    #[error("Repository failure fetching entity {entity_guid}: {source}")]
    Entity {
        entity_guid: String,
        #[source]
        source: RepositoryError,
    },
}
