//! Shared types for Junction
//!
//! Instance records, change notifications, outbound events, and the
//! gateway-level error type.

pub mod error;
pub mod event;
pub mod instance;
pub mod notification;

pub use error::{JunctionError, Result};
pub use event::{DomainOutboundEvent, InstanceSummary, OutboundEventKind, PlateauEvent};
pub use instance::{
    Classification, EntityPayload, EntityProxy, EntityRecord, InstanceProperties, Relationship,
};
pub use notification::{ChangeKind, ChangeOrigin, ChangePayload, InstanceChangeNotification};
