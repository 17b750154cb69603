//! Contribution ledger
//!
//! Tracks karma points per contributing actor. The read-increment-write
//! cycle must be atomic at the ledger boundary; callers never coordinate
//! concurrent awards themselves.

mod memory;

pub use memory::MemoryLedger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Failures surfaced by a ledger implementation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Profile of a contributing actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub guid: String,
    pub user_id: String,
    pub qualified_name: String,
    /// Cumulative karma points, non-decreasing under awards
    pub karma_points: i64,
    /// Whether the actor consented to public recognition of plateaus
    pub is_public: bool,
}

/// Contribution accounting for the cohort's actors.
#[async_trait]
pub trait ContributionLedger: Send + Sync {
    /// Profile for a contributing user, None when no profile exists.
    async fn profile_for_user(&self, user_id: &str) -> Result<Option<ActorProfile>, LedgerError>;

    /// Persist a new cumulative point total for an actor.
    async fn award(
        &self,
        actor_guid: &str,
        qualified_name: &str,
        new_points: i64,
    ) -> Result<(), LedgerError>;
}
