//! Context projection nodes
//!
//! Immutable nodes composed bottom-up during traversal; built fresh per
//! query and discarded after serialization to the consumer.

use serde::{Deserialize, Serialize};

/// Summary of an asset in the context chain (table, schema, database).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
}

/// Network location serving a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSummary {
    pub guid: String,
    pub network_address: String,
    pub protocol: String,
}

/// Connector implementation reachable through a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSummary {
    pub guid: String,
    pub connector_provider: String,
}

/// Glossary term assigned to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessTerm {
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
}

/// Column referenced by a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub column_guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
}

/// A column projection with its mandatory declared type and best-effort
/// decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// Base data type from the column's declared type
    pub data_type: String,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_column: Option<ForeignKeyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_term: Option<BusinessTerm>,
}

/// Full upward context for a table: where it lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContext {
    pub table: AssetSummary,
    pub schema: AssetSummary,
    pub database: AssetSummary,
    pub endpoint: EndpointSummary,
    pub connector: ConnectorSummary,
}
