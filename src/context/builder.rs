//! Bottom-up context assembly over the repository facade.
//!
//! Each hop resolves as "find relationships of type R touching entity X,
//! take first or all per the hop's cardinality, resolve each far end by
//! identifier". Single-canonical hops take the first relationship; the
//! cohort is assumed to hold one. Column decoration is fanned out
//! concurrently since each column reads an independent subgraph.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error};

use crate::repository::RepositoryFacade;
use crate::types::{EntityRecord, Relationship};

use super::nodes::{
    AssetSummary, BusinessTerm, ConnectorSummary, EndpointSummary, ForeignKeyRef, TableColumn,
    TableContext,
};
use super::{
    ContextError, ASSET_SCHEMA_TYPE, ATTRIBUTE_FOR_SCHEMA, CONNECTION_CONNECTOR_TYPE,
    CONNECTION_TO_ASSET, CONNECTION_TO_ENDPOINT, DATA_CONTENT_FOR_DATASET, FOREIGN_KEY,
    PRIMARY_KEY_CLASSIFICATION, SCHEMA_ATTRIBUTE_TYPE, SEMANTIC_ASSIGNMENT,
};

/// Assembles context projections by walking the cohort's instance graph.
///
/// Owns no state beyond the repository handle; every projection is built
/// fresh per call.
pub struct ContextBuilder {
    repository: Arc<dyn RepositoryFacade>,
}

impl ContextBuilder {
    pub fn new(repository: Arc<dyn RepositoryFacade>) -> Self {
        Self { repository }
    }

    /// Full upward context for a table: schema, database, endpoint, and
    /// connector. Every hop in this chain is mandatory.
    pub async fn table_context(&self, table_guid: &str) -> Result<TableContext, ContextError> {
        let table = self.fetch_entity(table_guid).await?;
        let table_type = self.required_far_entity(&table, SCHEMA_ATTRIBUTE_TYPE).await?;
        let schema = self.required_far_entity(&table_type, ASSET_SCHEMA_TYPE).await?;
        let database = self
            .required_far_entity(&schema, DATA_CONTENT_FOR_DATASET)
            .await?;
        let connection = self
            .required_far_entity(&database, CONNECTION_TO_ASSET)
            .await?;
        let endpoint = self
            .required_far_entity(&connection, CONNECTION_TO_ENDPOINT)
            .await?;
        let connector = self
            .required_far_entity(&connection, CONNECTION_CONNECTOR_TYPE)
            .await?;

        debug!(
            table = table_guid,
            database = %database.guid,
            "Table context assembled"
        );

        Ok(TableContext {
            table: summarize(&table),
            schema: summarize(&schema),
            database: summarize(&database),
            endpoint: EndpointSummary {
                guid: endpoint.guid.clone(),
                network_address: endpoint
                    .string_property("networkAddress")
                    .unwrap_or_default()
                    .to_string(),
                protocol: endpoint
                    .string_property("protocol")
                    .unwrap_or_default()
                    .to_string(),
            },
            connector: ConnectorSummary {
                guid: connector.guid.clone(),
                connector_provider: connector
                    .string_property("connectorProviderClassName")
                    .unwrap_or_default()
                    .to_string(),
            },
        })
    }

    /// Paged, decorated column listing for a table, ordered by column
    /// position. An empty page past the end of the column list is a valid
    /// result, not a failure.
    pub async fn table_columns(
        &self,
        table_guid: &str,
        start_from: usize,
        page_size: usize,
    ) -> Result<Vec<TableColumn>, ContextError> {
        let relationships = self
            .hop_relationships(table_guid, ATTRIBUTE_FOR_SCHEMA, start_from, page_size)
            .await?;

        let mut columns = Vec::with_capacity(relationships.len());
        for relationship in &relationships {
            let far = relationship.far_end(table_guid).ok_or_else(|| {
                ContextError::DanglingRelationship {
                    entity_guid: table_guid.to_string(),
                    relationship_guid: relationship.guid.clone(),
                }
            })?;
            columns.push(self.fetch_entity(&far.guid).await?);
        }

        // Decoration reads independent subgraphs per column; run them
        // concurrently and keep the original order for determinism.
        let decorated = join_all(columns.iter().map(|column| self.build_column(column))).await;
        let mut result = decorated.into_iter().collect::<Result<Vec<_>, _>>()?;
        result.sort_by_key(|c| c.position.unwrap_or(i64::MAX));
        Ok(result)
    }

    /// Downward mode: tables reachable under a database, flattened across
    /// its deployed schemas and paged over the combined listing.
    pub async fn tables_for_database(
        &self,
        database_guid: &str,
        start_from: usize,
        page_size: usize,
    ) -> Result<Vec<AssetSummary>, ContextError> {
        let database = self.fetch_entity(database_guid).await?;

        let mut tables = Vec::new();
        let schema_links = self
            .hop_relationships(&database.guid, DATA_CONTENT_FOR_DATASET, 0, 0)
            .await?;
        for schema_link in &schema_links {
            let Some(schema) = schema_link.far_end(&database.guid) else {
                debug!(relationship = %schema_link.guid, "Skipping schema link without far end");
                continue;
            };
            let type_links = self
                .hop_relationships(&schema.guid, ASSET_SCHEMA_TYPE, 0, 0)
                .await?;
            for type_link in &type_links {
                let Some(table_type) = type_link.far_end(&schema.guid) else {
                    continue;
                };
                let table_links = self
                    .hop_relationships(&table_type.guid, SCHEMA_ATTRIBUTE_TYPE, 0, 0)
                    .await?;
                for table_link in &table_links {
                    let Some(table) = table_link.far_end(&table_type.guid) else {
                        continue;
                    };
                    let record = self.fetch_entity(&table.guid).await?;
                    tables.push(summarize(&record));
                }
            }
        }

        let paged = tables.into_iter().skip(start_from);
        Ok(if page_size == 0 {
            paged.collect()
        } else {
            paged.take(page_size).collect()
        })
    }

    /// Column projection: the declared type is mandatory, everything else
    /// is best-effort decoration.
    async fn build_column(&self, column: &EntityRecord) -> Result<TableColumn, ContextError> {
        let column_type = self
            .required_far_entity(column, SCHEMA_ATTRIBUTE_TYPE)
            .await?;
        let data_type = column_type
            .string_property("dataType")
            .unwrap_or_default()
            .to_string();

        let (primary_key, primary_key_name) =
            match column.classification(PRIMARY_KEY_CLASSIFICATION) {
                Some(classification) => (
                    true,
                    classification
                        .properties
                        .get("name")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                ),
                None => (false, None),
            };

        let referenced_column = self.referenced_column(column).await;
        let business_term = self.assigned_term(column).await;

        Ok(TableColumn {
            guid: column.guid.clone(),
            name: column.display_name().map(str::to_string),
            qualified_name: column.string_property("qualifiedName").map(str::to_string),
            position: column.int_property("position"),
            data_type,
            nullable: column.bool_property("isNullable").unwrap_or(false),
            unique: column.bool_property("isUnique").unwrap_or(false),
            primary_key,
            primary_key_name,
            referenced_column,
            business_term,
        })
    }

    /// Foreign key target, best-effort. A column referencing more than one
    /// column is logged as an error and left unset rather than guessed at.
    async fn referenced_column(&self, column: &EntityRecord) -> Option<ForeignKeyRef> {
        let relationships = match self
            .repository
            .relationships(&column.guid, FOREIGN_KEY, 0, 0)
            .await
        {
            Ok(relationships) => relationships,
            Err(e) => {
                debug!(column = %column.guid, error = %e, "Foreign key lookup failed");
                return None;
            }
        };

        // The referencing (many-side) column sits on end two; the referenced
        // column on end one.
        let referenced: Vec<_> = relationships
            .iter()
            .filter(|r| r.end_two.as_ref().is_some_and(|p| p.guid == column.guid))
            .filter_map(|r| r.end_one.as_ref())
            .collect();

        match referenced.as_slice() {
            [] => None,
            [target] => match self.repository.entity(&target.guid).await {
                Ok(record) => Some(ForeignKeyRef {
                    column_guid: record.guid.clone(),
                    column_name: record.display_name().map(str::to_string),
                    qualified_name: record.string_property("qualifiedName").map(str::to_string),
                }),
                Err(e) => {
                    debug!(
                        column = %column.guid,
                        referenced = %target.guid,
                        error = %e,
                        "Referenced column could not be resolved"
                    );
                    None
                }
            },
            many => {
                let guids: Vec<&str> = many.iter().map(|p| p.guid.as_str()).collect();
                error!(
                    column = %column.guid,
                    referenced = ?guids,
                    "Column references multiple foreign key targets, attaching none"
                );
                None
            }
        }
    }

    /// Assigned glossary term, best-effort.
    async fn assigned_term(&self, column: &EntityRecord) -> Option<BusinessTerm> {
        let relationships = match self
            .repository
            .relationships(&column.guid, SEMANTIC_ASSIGNMENT, 0, 0)
            .await
        {
            Ok(relationships) => relationships,
            Err(e) => {
                debug!(column = %column.guid, error = %e, "Semantic assignment lookup failed");
                return None;
            }
        };

        let term = relationships
            .first()
            .and_then(|r| r.far_end(&column.guid))?;

        match self.repository.entity(&term.guid).await {
            Ok(record) => Some(BusinessTerm {
                guid: record.guid.clone(),
                name: record.display_name().map(str::to_string),
                qualified_name: record.string_property("qualifiedName").map(str::to_string),
            }),
            Err(e) => {
                debug!(column = %column.guid, term = %term.guid, error = %e, "Assigned term could not be resolved");
                None
            }
        }
    }

    /// First relationship of the hop type, resolved to its far-end record.
    /// Zero relationships is a structural failure of the chain.
    async fn required_far_entity(
        &self,
        from: &EntityRecord,
        hop: &'static str,
    ) -> Result<EntityRecord, ContextError> {
        let relationships = self.hop_relationships(&from.guid, hop, 0, 0).await?;
        let Some(first) = relationships.first() else {
            return Err(ContextError::MissingHop {
                entity_guid: from.guid.clone(),
                relationship_type: hop,
            });
        };
        let far = first
            .far_end(&from.guid)
            .ok_or_else(|| ContextError::DanglingRelationship {
                entity_guid: from.guid.clone(),
                relationship_guid: first.guid.clone(),
            })?;
        self.fetch_entity(&far.guid).await
    }

    async fn hop_relationships(
        &self,
        entity_guid: &str,
        relationship_type: &'static str,
        start_from: usize,
        page_size: usize,
    ) -> Result<Vec<Relationship>, ContextError> {
        self.repository
            .relationships(entity_guid, relationship_type, start_from, page_size)
            .await
            .map_err(|source| ContextError::Hop {
                entity_guid: entity_guid.to_string(),
                relationship_type,
                source,
            })
    }

    async fn fetch_entity(&self, guid: &str) -> Result<EntityRecord, ContextError> {
        self.repository
            .entity(guid)
            .await
            .map_err(|source| ContextError::Entity {
                entity_guid: guid.to_string(),
                source,
            })
    }
}

fn summarize(entity: &EntityRecord) -> AssetSummary {
    AssetSummary {
        guid: entity.guid.clone(),
        name: entity.display_name().map(str::to_string),
        qualified_name: entity.string_property("qualifiedName").map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::repository::MemoryRepository;
    use crate::types::{Classification, EntityProxy, InstanceProperties};

    fn props(pairs: &[(&str, serde_json::Value)]) -> InstanceProperties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn entity(guid: &str, type_name: &str, properties: InstanceProperties) -> EntityRecord {
        EntityRecord {
            guid: guid.to_string(),
            type_name: type_name.to_string(),
            metadata_collection_id: "mc-1".to_string(),
            properties,
            classifications: vec![],
            created_by: "etl".to_string(),
            updated_by: None,
            version: 1,
        }
    }

    fn proxy(guid: &str) -> EntityProxy {
        EntityProxy {
            guid: guid.to_string(),
            type_name: "Referenceable".to_string(),
            metadata_collection_id: "mc-1".to_string(),
            unique_properties: InstanceProperties::new(),
        }
    }

    fn link(guid: &str, type_name: &str, one: &str, two: &str) -> Relationship {
        Relationship {
            guid: guid.to_string(),
            type_name: type_name.to_string(),
            metadata_collection_id: "mc-1".to_string(),
            properties: InstanceProperties::new(),
            end_one: Some(proxy(one)),
            end_two: Some(proxy(two)),
            created_by: None,
            updated_by: None,
        }
    }

    /// Graph: orders table → type → schema → database → connection with
    /// endpoint and connector type.
    fn seeded_repository() -> Arc<MemoryRepository> {
        let repository = MemoryRepository::new();

        repository.insert_entity(entity(
            "table-1",
            "RelationalTable",
            props(&[
                ("displayName", json!("orders")),
                ("qualifiedName", json!("shop.public.orders")),
            ]),
        ));
        repository.insert_entity(entity("table-type-1", "RelationalTableType", props(&[])));
        repository.insert_entity(entity(
            "schema-1",
            "DeployedDatabaseSchema",
            props(&[("displayName", json!("public"))]),
        ));
        repository.insert_entity(entity(
            "db-1",
            "Database",
            props(&[("displayName", json!("shop"))]),
        ));
        repository.insert_entity(entity("conn-1", "Connection", props(&[])));
        repository.insert_entity(entity(
            "endpoint-1",
            "Endpoint",
            props(&[
                ("networkAddress", json!("db.example.com:5432")),
                ("protocol", json!("postgresql")),
            ]),
        ));
        repository.insert_entity(entity(
            "connector-1",
            "ConnectorType",
            props(&[(
                "connectorProviderClassName",
                json!("org.example.PostgresProvider"),
            )]),
        ));

        repository.insert_relationship(link(
            "r-tt",
            SCHEMA_ATTRIBUTE_TYPE,
            "table-1",
            "table-type-1",
        ));
        repository.insert_relationship(link("r-ts", ASSET_SCHEMA_TYPE, "table-type-1", "schema-1"));
        repository.insert_relationship(link(
            "r-sd",
            DATA_CONTENT_FOR_DATASET,
            "schema-1",
            "db-1",
        ));
        repository.insert_relationship(link("r-dc", CONNECTION_TO_ASSET, "conn-1", "db-1"));
        repository.insert_relationship(link("r-ce", CONNECTION_TO_ENDPOINT, "conn-1", "endpoint-1"));
        repository.insert_relationship(link(
            "r-cp",
            CONNECTION_CONNECTOR_TYPE,
            "conn-1",
            "connector-1",
        ));

        Arc::new(repository)
    }

    fn add_column(
        repository: &MemoryRepository,
        guid: &str,
        position: i64,
        properties: InstanceProperties,
        classifications: Vec<Classification>,
    ) {
        let mut column = entity(guid, "RelationalColumn", properties);
        column
            .properties
            .insert("position".to_string(), json!(position));
        column.classifications = classifications;
        repository.insert_entity(column);

        let type_guid = format!("{guid}-type");
        repository.insert_entity(entity(
            &type_guid,
            "RelationalColumnType",
            props(&[("dataType", json!("VARCHAR"))]),
        ));
        repository.insert_relationship(link(
            &format!("r-{guid}-type"),
            SCHEMA_ATTRIBUTE_TYPE,
            guid,
            &type_guid,
        ));
        repository.insert_relationship(link(
            &format!("r-{guid}-member"),
            ATTRIBUTE_FOR_SCHEMA,
            "table-1",
            guid,
        ));
    }

    #[tokio::test]
    async fn test_full_table_context() {
        let repository = seeded_repository();
        let builder = ContextBuilder::new(repository);

        let context = builder.table_context("table-1").await.unwrap();
        assert_eq!(context.table.name.as_deref(), Some("orders"));
        assert_eq!(context.schema.name.as_deref(), Some("public"));
        assert_eq!(context.database.name.as_deref(), Some("shop"));
        assert_eq!(context.endpoint.network_address, "db.example.com:5432");
        assert_eq!(context.endpoint.protocol, "postgresql");
        assert_eq!(
            context.connector.connector_provider,
            "org.example.PostgresProvider"
        );
    }

    #[tokio::test]
    async fn test_missing_schema_hop_is_hard_failure() {
        let repository = MemoryRepository::new();
        repository.insert_entity(entity("table-1", "RelationalTable", props(&[])));
        repository.insert_entity(entity("table-type-1", "RelationalTableType", props(&[])));
        repository.insert_relationship(link(
            "r-tt",
            SCHEMA_ATTRIBUTE_TYPE,
            "table-1",
            "table-type-1",
        ));

        let builder = ContextBuilder::new(Arc::new(repository));
        match builder.table_context("table-1").await {
            Err(ContextError::MissingHop {
                entity_guid,
                relationship_type,
            }) => {
                assert_eq!(entity_guid, "table-type-1");
                assert_eq!(relationship_type, ASSET_SCHEMA_TYPE);
            }
            other => panic!("expected MissingHop, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_table_is_typed_failure() {
        let builder = ContextBuilder::new(Arc::new(MemoryRepository::new()));
        match builder.table_context("nope").await {
            Err(ContextError::Entity { entity_guid, .. }) => assert_eq!(entity_guid, "nope"),
            other => panic!("expected Entity failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plain_column_decoration_defaults() {
        let repository = seeded_repository();
        add_column(
            &repository,
            "col-1",
            1,
            props(&[("isNullable", json!(true))]),
            vec![],
        );

        let builder = ContextBuilder::new(repository);
        let columns = builder.table_columns("table-1", 0, 0).await.unwrap();

        assert_eq!(columns.len(), 1);
        let column = &columns[0];
        assert_eq!(column.data_type, "VARCHAR");
        assert!(column.nullable);
        assert!(!column.primary_key);
        assert!(column.primary_key_name.is_none());
        assert!(column.referenced_column.is_none());
        assert!(column.business_term.is_none());
    }

    #[tokio::test]
    async fn test_primary_key_and_term_decoration() {
        let repository = seeded_repository();
        add_column(
            &repository,
            "col-1",
            1,
            props(&[("isUnique", json!(true))]),
            vec![Classification {
                name: PRIMARY_KEY_CLASSIFICATION.to_string(),
                properties: props(&[("name", json!("orders_pk"))]),
            }],
        );
        repository.insert_entity(entity(
            "term-1",
            "GlossaryTerm",
            props(&[
                ("displayName", json!("Order Identifier")),
                ("qualifiedName", json!("glossary/order-id")),
            ]),
        ));
        repository.insert_relationship(link("r-term", SEMANTIC_ASSIGNMENT, "col-1", "term-1"));

        let builder = ContextBuilder::new(repository);
        let columns = builder.table_columns("table-1", 0, 0).await.unwrap();

        let column = &columns[0];
        assert!(column.primary_key);
        assert_eq!(column.primary_key_name.as_deref(), Some("orders_pk"));
        assert!(column.unique);
        let term = column.business_term.as_ref().unwrap();
        assert_eq!(term.name.as_deref(), Some("Order Identifier"));
    }

    #[tokio::test]
    async fn test_single_foreign_key_resolves() {
        let repository = seeded_repository();
        add_column(&repository, "col-1", 1, props(&[]), vec![]);
        repository.insert_entity(entity(
            "ref-col",
            "RelationalColumn",
            props(&[("displayName", json!("customer_id"))]),
        ));
        repository.insert_relationship(link("r-fk", FOREIGN_KEY, "ref-col", "col-1"));

        let builder = ContextBuilder::new(repository);
        let columns = builder.table_columns("table-1", 0, 0).await.unwrap();

        let reference = columns[0].referenced_column.as_ref().unwrap();
        assert_eq!(reference.column_guid, "ref-col");
        assert_eq!(reference.column_name.as_deref(), Some("customer_id"));
    }

    #[tokio::test]
    async fn test_ambiguous_foreign_keys_attach_none() {
        let repository = seeded_repository();
        add_column(&repository, "col-1", 1, props(&[]), vec![]);
        repository.insert_entity(entity("ref-a", "RelationalColumn", props(&[])));
        repository.insert_entity(entity("ref-b", "RelationalColumn", props(&[])));
        repository.insert_relationship(link("r-fk-a", FOREIGN_KEY, "ref-a", "col-1"));
        repository.insert_relationship(link("r-fk-b", FOREIGN_KEY, "ref-b", "col-1"));

        let builder = ContextBuilder::new(repository);
        let columns = builder.table_columns("table-1", 0, 0).await.unwrap();

        assert!(columns[0].referenced_column.is_none());
    }

    #[tokio::test]
    async fn test_foreign_key_where_column_is_referenced_side_only() {
        let repository = seeded_repository();
        add_column(&repository, "col-1", 1, props(&[]), vec![]);
        repository.insert_entity(entity("other-col", "RelationalColumn", props(&[])));
        // col-1 is the referenced (one) side here, not the many side.
        repository.insert_relationship(link("r-fk", FOREIGN_KEY, "col-1", "other-col"));

        let builder = ContextBuilder::new(repository);
        let columns = builder.table_columns("table-1", 0, 0).await.unwrap();

        assert!(columns[0].referenced_column.is_none());
    }

    #[tokio::test]
    async fn test_column_without_declared_type_fails() {
        let repository = seeded_repository();
        repository.insert_entity(entity("col-1", "RelationalColumn", props(&[])));
        repository.insert_relationship(link(
            "r-member",
            ATTRIBUTE_FOR_SCHEMA,
            "table-1",
            "col-1",
        ));

        let builder = ContextBuilder::new(repository);
        match builder.table_columns("table-1", 0, 0).await {
            Err(ContextError::MissingHop {
                relationship_type, ..
            }) => assert_eq!(relationship_type, SCHEMA_ATTRIBUTE_TYPE),
            other => panic!("expected MissingHop, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_columns_ordered_by_position_and_paged() {
        let repository = seeded_repository();
        add_column(&repository, "col-c", 3, props(&[]), vec![]);
        add_column(&repository, "col-a", 1, props(&[]), vec![]);
        add_column(&repository, "col-b", 2, props(&[]), vec![]);

        let builder = ContextBuilder::new(repository);

        let all = builder.table_columns("table-1", 0, 0).await.unwrap();
        let positions: Vec<_> = all.iter().filter_map(|c| c.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);

        let page = builder.table_columns("table-1", 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);

        let past_end = builder.table_columns("table-1", 10, 5).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_decoration_is_deterministic_across_runs() {
        let repository = seeded_repository();
        for i in 0..8 {
            add_column(&repository, &format!("col-{i}"), i, props(&[]), vec![]);
        }

        let builder = ContextBuilder::new(repository);
        let first = builder.table_columns("table-1", 0, 0).await.unwrap();
        let second = builder.table_columns("table-1", 0, 0).await.unwrap();
        assert_eq!(first, second);

        // Page-at-a-time traversal sees the same columns in the same order.
        let mut paged = Vec::new();
        for start in 0..8 {
            paged.extend(builder.table_columns("table-1", start, 1).await.unwrap());
        }
        assert_eq!(first, paged);
    }

    #[tokio::test]
    async fn test_tables_for_database_downward_listing() {
        let repository = seeded_repository();

        // A second table type under the same schema.
        let second = entity(
            "table-2",
            "RelationalTable",
            props(&[("displayName", json!("customers"))]),
        );
        repository.insert_entity(second);
        repository.insert_entity(entity("table-type-2", "RelationalTableType", props(&[])));
        repository.insert_relationship(link(
            "r-tt2",
            SCHEMA_ATTRIBUTE_TYPE,
            "table-2",
            "table-type-2",
        ));
        repository.insert_relationship(link(
            "r-ts2",
            ASSET_SCHEMA_TYPE,
            "table-type-2",
            "schema-1",
        ));

        let builder = ContextBuilder::new(repository);

        let tables = builder.tables_for_database("db-1", 0, 0).await.unwrap();
        let names: Vec<_> = tables.iter().filter_map(|t| t.name.as_deref()).collect();
        assert_eq!(names, vec!["orders", "customers"]);

        let page = builder.tables_for_database("db-1", 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name.as_deref(), Some("customers"));
    }
}
