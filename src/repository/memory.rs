//! In-process repository for dev mode and tests.
//!
//! Holds the instance graph in memory. Relationship order is insertion
//! order, which keeps paging deterministic.

use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::{EntityRecord, Relationship};

use super::{RepositoryError, RepositoryFacade};

#[derive(Debug, Default)]
pub struct MemoryRepository {
    entities: DashMap<String, EntityRecord>,
    relationships: RwLock<Vec<Relationship>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity record.
    pub fn insert_entity(&self, entity: EntityRecord) {
        self.entities.insert(entity.guid.clone(), entity);
    }

    /// Append a relationship. Both ends should be present; a relationship
    /// without ends can never be returned by a touching-entity query.
    pub fn insert_relationship(&self, relationship: Relationship) {
        if let Ok(mut relationships) = self.relationships.write() {
            relationships.push(relationship);
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

#[async_trait]
impl RepositoryFacade for MemoryRepository {
    async fn entity(&self, guid: &str) -> Result<EntityRecord, RepositoryError> {
        self.entities
            .get(guid)
            .map(|e| e.clone())
            .ok_or_else(|| RepositoryError::NotFound {
                guid: guid.to_string(),
            })
    }

    async fn relationships(
        &self,
        entity_guid: &str,
        relationship_type_name: &str,
        start_from: usize,
        page_size: usize,
    ) -> Result<Vec<Relationship>, RepositoryError> {
        let relationships = self
            .relationships
            .read()
            .map_err(|_| RepositoryError::Backend("relationship store poisoned".to_string()))?;

        let matching = relationships
            .iter()
            .filter(|r| r.type_name == relationship_type_name)
            .filter(|r| {
                r.end_one.as_ref().is_some_and(|p| p.guid == entity_guid)
                    || r.end_two.as_ref().is_some_and(|p| p.guid == entity_guid)
            })
            .skip(start_from);

        let page: Vec<Relationship> = if page_size == 0 {
            matching.cloned().collect()
        } else {
            matching.take(page_size).cloned().collect()
        };

        Ok(page)
    }
}
