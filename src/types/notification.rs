//! Instance change notifications delivered by the repository cohort.

use serde::{Deserialize, Serialize};

use super::instance::{EntityPayload, Relationship};

/// Identity of the cohort member that originated a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeOrigin {
    /// Source name (cohort/repository/mapper identity)
    pub source_name: String,
    /// Metadata collection the change originated from
    pub metadata_collection_id: String,
    pub server_name: String,
    pub server_type: String,
    pub organization: String,
}

/// Semantic kind of an instance change. Exactly one per notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// New instance created
    Created,
    /// Instance state re-sent by its home repository
    Refreshed,
    /// Instance properties updated
    Updated,
    /// Classification attached to an entity
    Classified,
    /// Classification removed from an entity
    Declassified,
    /// Classification properties changed
    Reclassified,
    /// Instance soft-deleted
    Deleted,
    /// Instance permanently removed
    Purged,
    /// Instance given a new unique identifier
    ReIdentified,
    /// Instance moved to a different type
    ReTyped,
    /// Instance moved to a different home collection
    ReHomed,
}

/// Payload of a change notification: the affected entity or relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "instance", rename_all = "snake_case")]
pub enum ChangePayload {
    Entity(EntityPayload),
    Relationship(Relationship),
}

impl ChangePayload {
    pub fn guid(&self) -> &str {
        match self {
            Self::Entity(payload) => payload.guid(),
            Self::Relationship(relationship) => &relationship.guid,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Entity(payload) => payload.type_name(),
            Self::Relationship(relationship) => &relationship.type_name,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Entity(_))
    }
}

/// A raw repository change notification as delivered on the cohort topic.
///
/// Re-identify/re-type/re-home notifications carry the new instance state
/// only; there is no old identity to reconcile against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceChangeNotification {
    pub origin: ChangeOrigin,
    pub kind: ChangeKind,
    pub payload: ChangePayload,
    /// Name of the classification that changed, carried for
    /// classify/declassify/reclassify kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_name: Option<String>,
}
