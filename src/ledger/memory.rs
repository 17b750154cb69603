//! In-process ledger for dev mode and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{ActorProfile, ContributionLedger, LedgerError};

/// Ledger keyed by actor guid. Awards go through the map's entry lock, which
/// makes each read-modify-write atomic per actor.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    profiles: DashMap<String, ActorProfile>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a profile.
    pub fn insert_profile(&self, profile: ActorProfile) {
        self.profiles.insert(profile.guid.clone(), profile);
    }

    /// Current point total for an actor, if known.
    pub fn points(&self, actor_guid: &str) -> Option<i64> {
        self.profiles.get(actor_guid).map(|p| p.karma_points)
    }
}

#[async_trait]
impl ContributionLedger for MemoryLedger {
    async fn profile_for_user(&self, user_id: &str) -> Result<Option<ActorProfile>, LedgerError> {
        Ok(self
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| p.clone()))
    }

    async fn award(
        &self,
        actor_guid: &str,
        qualified_name: &str,
        new_points: i64,
    ) -> Result<(), LedgerError> {
        match self.profiles.get_mut(actor_guid) {
            Some(mut profile) => {
                profile.karma_points = new_points;
                debug!(actor = actor_guid, points = new_points, "Karma persisted");
                Ok(())
            }
            None => Err(LedgerError::Persistence(format!(
                "No profile for actor {actor_guid} ({qualified_name})"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(guid: &str, user_id: &str, points: i64) -> ActorProfile {
        ActorProfile {
            guid: guid.to_string(),
            user_id: user_id.to_string(),
            qualified_name: format!("actor/{user_id}"),
            karma_points: points,
            is_public: true,
        }
    }

    #[tokio::test]
    async fn test_profile_lookup_and_award() {
        let ledger = MemoryLedger::new();
        ledger.insert_profile(profile("a-1", "alice", 95));

        let found = ledger.profile_for_user("alice").await.unwrap().unwrap();
        assert_eq!(found.karma_points, 95);

        ledger.award("a-1", "actor/alice", 105).await.unwrap();
        assert_eq!(ledger.points("a-1"), Some(105));

        assert!(ledger.profile_for_user("bob").await.unwrap().is_none());
        assert!(ledger.award("a-2", "actor/bob", 10).await.is_err());
    }
}
