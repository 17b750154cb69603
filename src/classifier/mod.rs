//! Event classification engine
//!
//! State-free per-notification router: decides whether contribution
//! accounting applies, whether the affected instance's type qualifies for
//! domain event emission, and which outbound kind to emit. The karma path
//! and the translation path are isolated from each other; failures in
//! either are logged and never escape [`EventClassifier::process`].

use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::context::ContextBuilder;
use crate::ledger::{ContributionLedger, LedgerError};
use crate::oracle::TypeOracle;
use crate::publisher::{OutboundPublisher, PublishError};
use crate::types::{
    ChangePayload, DomainOutboundEvent, EntityPayload, InstanceChangeNotification,
    InstanceSummary, OutboundEventKind, PlateauEvent,
};

/// Configuration for the classification engine.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Identity used when consulting the type oracle
    pub source_name: String,
    /// Points per contribution; zero or negative disables awarding
    pub karma_increment: i64,
    /// Points per plateau; zero disables plateau events
    pub plateau_threshold: i64,
    /// Domain types whose instances are republished; instances of any
    /// subtype qualify
    pub watched_types: Vec<String>,
    /// Domain types whose events are enriched with a table context
    /// projection before publication
    pub context_types: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            source_name: "junction".to_string(),
            karma_increment: 1,
            plateau_threshold: 500,
            watched_types: Vec::new(),
            context_types: Vec::new(),
        }
    }
}

/// Processing counters for observability.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ClassifierStats {
    pub processed: u64,
    pub published: u64,
    pub discarded: u64,
    pub karma_awards: u64,
    pub plateau_events: u64,
    pub karma_failures: u64,
    pub translate_failures: u64,
}

/// Failures inside the karma path, caught at the isolation boundary.
#[derive(Debug, thiserror::Error)]
enum KarmaError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Failures inside the translation path, caught at the isolation boundary.
#[derive(Debug, thiserror::Error)]
enum TranslateError {
    #[error("Relationship {guid} is missing end {end}")]
    MissingEnd { guid: String, end: &'static str },

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Routes raw repository change notifications onto domain outbound events.
pub struct EventClassifier {
    oracle: Arc<dyn TypeOracle>,
    ledger: Arc<dyn ContributionLedger>,
    publisher: Arc<dyn OutboundPublisher>,
    /// Context builder for payload enrichment, when configured
    enricher: Option<Arc<ContextBuilder>>,
    config: ClassifierConfig,
    stats: RwLock<ClassifierStats>,
}

impl EventClassifier {
    pub fn new(
        oracle: Arc<dyn TypeOracle>,
        ledger: Arc<dyn ContributionLedger>,
        publisher: Arc<dyn OutboundPublisher>,
        config: ClassifierConfig,
    ) -> Self {
        info!(
            source = %config.source_name,
            karma_increment = config.karma_increment,
            plateau_threshold = config.plateau_threshold,
            watched_types = ?config.watched_types,
            "Event classifier created"
        );
        Self {
            oracle,
            ledger,
            publisher,
            enricher: None,
            config,
            stats: RwLock::new(ClassifierStats::default()),
        }
    }

    /// Attach a context builder so accepted events for configured types are
    /// enriched with a table context projection.
    pub fn with_enricher(mut self, enricher: Arc<ContextBuilder>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Process one notification. Never fails: the karma and translation
    /// paths are each caught here, logged with context, and isolated from
    /// one another.
    pub async fn process(&self, notification: InstanceChangeNotification) {
        self.bump(|s| s.processed += 1);

        if let ChangePayload::Entity(ref payload) = notification.payload {
            if let Err(e) = self.award_karma(payload).await {
                self.bump(|s| s.karma_failures += 1);
                warn!(
                    guid = payload.guid(),
                    user = payload.contributor().unwrap_or("<none>"),
                    error = %e,
                    "Karma award failed, continuing with event translation"
                );
            }
        }

        if let Err(e) = self.translate(&notification).await {
            self.bump(|s| s.translate_failures += 1);
            warn!(
                guid = notification.payload.guid(),
                type_name = notification.payload.type_name(),
                error = %e,
                "Event translation failed, notification dropped"
            );
        }
    }

    /// Karma path: entity notifications award points to the contributing
    /// user and may emit a plateau side event.
    async fn award_karma(&self, payload: &EntityPayload) -> Result<(), KarmaError> {
        if self.config.karma_increment <= 0 {
            return Ok(());
        }

        let Some(user_id) = payload.contributor() else {
            debug!(guid = payload.guid(), "No contributing user, skipping karma");
            return Ok(());
        };

        let Some(profile) = self.ledger.profile_for_user(user_id).await? else {
            debug!(user = user_id, "No actor profile, skipping karma");
            return Ok(());
        };

        let current_points = profile.karma_points;
        let new_points = current_points + self.config.karma_increment;
        self.ledger
            .award(&profile.guid, &profile.qualified_name, new_points)
            .await?;
        self.bump(|s| s.karma_awards += 1);
        debug!(user = user_id, points = new_points, "Karma awarded");

        let threshold = self.config.plateau_threshold;
        if threshold > 0 {
            let current_plateau = current_points / threshold;
            let new_plateau = new_points / threshold;
            if new_plateau > current_plateau {
                let event = PlateauEvent {
                    actor_guid: profile.guid.clone(),
                    user_id: profile.user_id.clone(),
                    qualified_name: profile.qualified_name.clone(),
                    is_public: profile.is_public,
                    plateau: new_plateau,
                    points: new_points,
                    timestamp: Utc::now(),
                };
                self.publisher.publish_plateau(&event).await?;
                self.bump(|s| s.plateau_events += 1);
                info!(
                    user = user_id,
                    plateau = new_plateau,
                    points = new_points,
                    "Karma plateau crossed"
                );
            }
        }

        Ok(())
    }

    /// Translation path: type-gate, map the kind, build, publish.
    async fn translate(
        &self,
        notification: &InstanceChangeNotification,
    ) -> Result<(), TranslateError> {
        let type_name = notification.payload.type_name();
        if !self.is_watched(type_name) {
            self.bump(|s| s.discarded += 1);
            debug!(
                type_name = type_name,
                "Instance type not watched, discarding notification"
            );
            return Ok(());
        }

        let mut event = Self::build_event(notification)?;
        event.context = self.enrich(notification).await;
        self.publisher.publish_instance(&event).await?;
        self.bump(|s| s.published += 1);
        debug!(
            guid = %event.instance.guid,
            kind = ?event.kind,
            "Domain event published"
        );
        Ok(())
    }

    fn is_watched(&self, type_name: &str) -> bool {
        self.config.watched_types.iter().any(|reference| {
            self.oracle
                .is_subtype_of(&self.config.source_name, type_name, reference)
        })
    }

    /// Best-effort payload enrichment: attach a table context projection for
    /// entity notifications of configured types. A degraded enrichment never
    /// blocks event delivery.
    async fn enrich(&self, notification: &InstanceChangeNotification) -> Option<serde_json::Value> {
        let enricher = self.enricher.as_ref()?;

        let ChangePayload::Entity(ref payload) = notification.payload else {
            return None;
        };

        let type_name = payload.type_name();
        let wants_context = self.config.context_types.iter().any(|reference| {
            self.oracle
                .is_subtype_of(&self.config.source_name, type_name, reference)
        });
        if !wants_context {
            return None;
        }

        match enricher.table_context(payload.guid()).await {
            Ok(context) => serde_json::to_value(context).ok(),
            Err(e) => {
                warn!(
                    guid = payload.guid(),
                    error = %e,
                    "Context enrichment failed, publishing without context"
                );
                None
            }
        }
    }

    /// Build the outbound event for an accepted notification. Relationship
    /// events require summaries of both end entities.
    fn build_event(
        notification: &InstanceChangeNotification,
    ) -> Result<DomainOutboundEvent, TranslateError> {
        let kind = OutboundEventKind::from_change(notification.kind);

        match &notification.payload {
            ChangePayload::Entity(payload) => Ok(DomainOutboundEvent {
                kind,
                instance: InstanceSummary::from_payload(payload),
                classification_name: notification.classification_name.clone(),
                end_one: None,
                end_two: None,
                context: None,
                timestamp: Utc::now(),
            }),
            ChangePayload::Relationship(relationship) => {
                let end_one =
                    relationship
                        .end_one
                        .as_ref()
                        .ok_or_else(|| TranslateError::MissingEnd {
                            guid: relationship.guid.clone(),
                            end: "one",
                        })?;
                let end_two =
                    relationship
                        .end_two
                        .as_ref()
                        .ok_or_else(|| TranslateError::MissingEnd {
                            guid: relationship.guid.clone(),
                            end: "two",
                        })?;

                Ok(DomainOutboundEvent {
                    kind,
                    instance: InstanceSummary {
                        guid: relationship.guid.clone(),
                        type_name: relationship.type_name.clone(),
                        display_name: None,
                    },
                    classification_name: None,
                    end_one: Some(InstanceSummary::from_proxy(end_one)),
                    end_two: Some(InstanceSummary::from_proxy(end_two)),
                    context: None,
                    timestamp: Utc::now(),
                })
            }
        }
    }

    fn bump(&self, update: impl FnOnce(&mut ClassifierStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }

    /// Snapshot of the processing counters.
    pub fn stats(&self) -> ClassifierStats {
        self.stats.read().map(|s| s.clone()).unwrap_or_default()
    }
}
