//! Configuration for Junction
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use uuid::Uuid;

/// Junction - metadata exchange gateway for repository cohorts
#[derive(Parser, Debug, Clone)]
#[command(name = "junction")]
#[command(about = "Metadata exchange gateway for open-metadata repository cohorts")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Source name used when consulting the cohort type registry
    #[arg(long, env = "SOURCE_NAME", default_value = "junction")]
    pub source_name: String,

    /// NATS configuration
    #[command(flatten)]
    pub nats: NatsArgs,

    /// Subject carrying inbound cohort instance notifications
    #[arg(long, env = "NOTIFICATION_SUBJECT", default_value = "cohort.notifications")]
    pub notification_subject: String,

    /// Subject the cohort query service answers on
    #[arg(long, env = "QUERY_SUBJECT", default_value = "cohort.query")]
    pub query_subject: String,

    /// Subject this instance serves context queries on
    #[arg(long, env = "CONTEXT_SUBJECT", default_value = "junction.context")]
    pub context_subject: String,

    /// Prefix for outbound event subjects
    #[arg(long, env = "EVENT_SUBJECT_PREFIX", default_value = "junction.event")]
    pub event_subject_prefix: String,

    /// Karma points granted per contribution (0 disables awarding)
    #[arg(long, env = "KARMA_INCREMENT", default_value = "1", allow_hyphen_values = true)]
    pub karma_increment: i64,

    /// Points per karma plateau (0 disables plateau events)
    #[arg(long, env = "KARMA_PLATEAU", default_value = "500", allow_hyphen_values = true)]
    pub karma_plateau: i64,

    /// Comma-separated domain types whose instances are republished
    /// (subtypes included)
    #[arg(long, env = "WATCHED_TYPES", default_value = "")]
    pub watched_types: String,

    /// Comma-separated domain types whose events are enriched with a table
    /// context projection
    #[arg(long, env = "CONTEXT_TYPES", default_value = "")]
    pub context_types: String,

    /// Path to a JSON type-definition document seeding the type registry
    #[arg(long, env = "TYPE_DEFS")]
    pub type_defs: Option<String>,

    /// Enable development mode (in-process repository, empty allow-list
    /// tolerated)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in milliseconds for cohort queries
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

/// NATS connection configuration
#[derive(Parser, Debug, Clone)]
pub struct NatsArgs {
    /// NATS server URL
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// NATS username (optional)
    #[arg(long, env = "NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password (optional)
    #[arg(long, env = "NATS_PASSWORD")]
    pub nats_password: Option<String>,
}

impl Args {
    /// Parse the watched-types allow-list.
    pub fn watched_type_list(&self) -> Vec<String> {
        split_type_list(&self.watched_types)
    }

    /// Parse the context-enrichment type list.
    pub fn context_type_list(&self) -> Vec<String> {
        split_type_list(&self.context_types)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.karma_increment < 0 {
            return Err("KARMA_INCREMENT must be zero or positive".to_string());
        }

        if self.karma_plateau < 0 {
            return Err("KARMA_PLATEAU must be zero or positive".to_string());
        }

        if !self.dev_mode && self.watched_type_list().is_empty() {
            return Err(
                "WATCHED_TYPES must name at least one domain type in production mode".to_string(),
            );
        }

        Ok(())
    }
}

fn split_type_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["junction"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_watched_type_list_parsing() {
        let parsed = args(&["--watched-types", "Community, GlossaryTerm,,RelationalTable "]);
        assert_eq!(
            parsed.watched_type_list(),
            vec!["Community", "GlossaryTerm", "RelationalTable"]
        );

        let empty = args(&[]);
        assert!(empty.watched_type_list().is_empty());
    }

    #[test]
    fn test_validate_requires_watched_types_in_production() {
        let parsed = args(&[]);
        assert!(parsed.validate().is_err());

        let dev = args(&["--dev-mode"]);
        assert!(dev.validate().is_ok());

        let production = args(&["--watched-types", "Community"]);
        assert!(production.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_karma() {
        let parsed = args(&["--watched-types", "Community", "--karma-increment", "-5"]);
        assert!(parsed.validate().is_err());
    }
}
