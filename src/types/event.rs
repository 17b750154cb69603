//! Outbound domain events.
//!
//! Built once per accepted notification, immutable after construction, and
//! handed to the outbound publisher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::instance::{EntityPayload, EntityProxy};
use super::notification::ChangeKind;

/// Kind of outbound domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundEventKind {
    Created,
    Updated,
    Refreshed,
    Deleted,
    Classified,
    Declassified,
    Reclassified,
    GuidChanged,
    TypeChanged,
    HomeChanged,
}

impl OutboundEventKind {
    /// Fixed 1:1 mapping from notification kind to outbound event kind.
    ///
    /// Purges collapse into deletes: subscribers see a single removal signal.
    /// Re-identify/re-type/re-home map forward-looking, describing the
    /// instance's current state.
    pub fn from_change(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Created => Self::Created,
            ChangeKind::Refreshed => Self::Refreshed,
            ChangeKind::Updated => Self::Updated,
            ChangeKind::Classified => Self::Classified,
            ChangeKind::Declassified => Self::Declassified,
            ChangeKind::Reclassified => Self::Reclassified,
            ChangeKind::Deleted | ChangeKind::Purged => Self::Deleted,
            ChangeKind::ReIdentified => Self::GuidChanged,
            ChangeKind::ReTyped => Self::TypeChanged,
            ChangeKind::ReHomed => Self::HomeChanged,
        }
    }
}

/// Compact instance summary carried in outbound events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub guid: String,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl InstanceSummary {
    pub fn from_payload(payload: &EntityPayload) -> Self {
        Self {
            guid: payload.guid().to_string(),
            type_name: payload.type_name().to_string(),
            display_name: payload.display_name().map(str::to_string),
        }
    }

    pub fn from_proxy(proxy: &EntityProxy) -> Self {
        Self {
            guid: proxy.guid.clone(),
            type_name: proxy.type_name.clone(),
            display_name: proxy.display_name().map(str::to_string),
        }
    }
}

/// A fully assembled domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainOutboundEvent {
    pub kind: OutboundEventKind,
    /// Summary of the affected instance
    pub instance: InstanceSummary,
    /// Classification that changed, for classify/declassify/reclassify kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_name: Option<String>,
    /// End summaries, present for relationship events only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_one: Option<InstanceSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_two: Option<InstanceSummary>,
    /// Context projection attached by enrichment, opaque to the event flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Side event emitted when a contributor crosses a karma plateau.
///
/// Published independently of the main domain event flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauEvent {
    pub actor_guid: String,
    pub user_id: String,
    pub qualified_name: String,
    /// Whether the contributor opted into public recognition
    pub is_public: bool,
    /// Plateau number just reached
    pub plateau: i64,
    /// Cumulative point total after the award
    pub points: i64,
    pub timestamp: DateTime<Utc>,
}
