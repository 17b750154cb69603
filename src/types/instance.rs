//! Instance records exchanged with the repository cohort.
//!
//! Entities and relationships are the typed nodes and edges of the cohort's
//! metadata graph. A relationship references its two ends as proxies: partial
//! records carrying identity and type but no full property bag.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Property bag attached to an instance. Junction never interprets property
/// values beyond the handful of well-known keys used for summaries.
pub type InstanceProperties = Map<String, JsonValue>;

/// Property keys consulted, in order, when summarizing an instance for display.
const DISPLAY_NAME_KEYS: [&str; 3] = ["displayName", "name", "qualifiedName"];

/// A named, typed attachment of additional properties to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub name: String,
    #[serde(default)]
    pub properties: InstanceProperties,
}

/// Full entity record: identity, type, properties, classifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Globally unique instance identifier
    pub guid: String,
    /// Type name within the cohort's type system
    pub type_name: String,
    /// Home metadata collection
    pub metadata_collection_id: String,
    #[serde(default)]
    pub properties: InstanceProperties,
    #[serde(default)]
    pub classifications: Vec<Classification>,
    /// User that created the instance
    pub created_by: String,
    /// User that last updated the instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// Instance version, incremented by the home repository on update
    #[serde(default)]
    pub version: u64,
}

impl EntityRecord {
    /// Best-effort display name: displayName, then name, then qualifiedName.
    pub fn display_name(&self) -> Option<&str> {
        DISPLAY_NAME_KEYS
            .iter()
            .find_map(|key| self.string_property(key))
    }

    /// Look up a string property by name.
    pub fn string_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(|v| v.as_str())
    }

    /// Look up a boolean property by name.
    pub fn bool_property(&self, name: &str) -> Option<bool> {
        self.properties.get(name).and_then(|v| v.as_bool())
    }

    /// Look up an integer property by name.
    pub fn int_property(&self, name: &str) -> Option<i64> {
        self.properties.get(name).and_then(|v| v.as_i64())
    }

    /// Find a classification by name.
    pub fn classification(&self, name: &str) -> Option<&Classification> {
        self.classifications.iter().find(|c| c.name == name)
    }
}

/// Partial entity record: identity and type only, used when a relationship
/// or notification references an entity homed elsewhere in the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProxy {
    pub guid: String,
    pub type_name: String,
    pub metadata_collection_id: String,
    /// Unique properties only (typically qualifiedName)
    #[serde(default)]
    pub unique_properties: InstanceProperties,
}

impl EntityProxy {
    /// Best-effort display name from the unique properties.
    pub fn display_name(&self) -> Option<&str> {
        DISPLAY_NAME_KEYS
            .iter()
            .find_map(|key| self.unique_properties.get(*key).and_then(|v| v.as_str()))
    }
}

/// Entity payload of a change notification: either a full record or a proxy.
///
/// Translation logic is written once against the shared accessors below
/// rather than duplicated per payload form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum EntityPayload {
    Full(EntityRecord),
    Proxy(EntityProxy),
}

impl EntityPayload {
    pub fn guid(&self) -> &str {
        match self {
            Self::Full(record) => &record.guid,
            Self::Proxy(proxy) => &proxy.guid,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Full(record) => &record.type_name,
            Self::Proxy(proxy) => &proxy.type_name,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Full(record) => record.display_name(),
            Self::Proxy(proxy) => proxy.display_name(),
        }
    }

    /// Contributing user: the last updater, falling back to the creator.
    /// Proxies carry no provenance, so they have no contributor.
    pub fn contributor(&self) -> Option<&str> {
        match self {
            Self::Full(record) => record
                .updated_by
                .as_deref()
                .filter(|u| !u.is_empty())
                .or_else(|| Some(record.created_by.as_str()).filter(|u| !u.is_empty())),
            Self::Proxy(_) => None,
        }
    }
}

/// Typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub guid: String,
    pub type_name: String,
    pub metadata_collection_id: String,
    #[serde(default)]
    pub properties: InstanceProperties,
    /// First end of the relationship.
    ///
    /// Ends are optional because a degraded notification payload can arrive
    /// without them; repository query results always carry both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_one: Option<EntityProxy>,
    /// Second end of the relationship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_two: Option<EntityProxy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Relationship {
    /// The end opposite to `guid`, when both ends are present and one matches.
    pub fn far_end(&self, guid: &str) -> Option<&EntityProxy> {
        match (&self.end_one, &self.end_two) {
            (Some(one), Some(two)) if one.guid == guid => Some(two),
            (Some(one), Some(two)) if two.guid == guid => Some(one),
            _ => None,
        }
    }
}
