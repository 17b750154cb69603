//! Junction - metadata exchange gateway for repository cohorts

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use junction::{
    classifier::{ClassifierConfig, EventClassifier},
    config::Args,
    context::{ContextBuilder, ContextQueryService, ContextServiceConfig},
    ledger::{ContributionLedger, MemoryLedger},
    listener::{ListenerConfig, NotificationListener},
    nats::NatsClient,
    oracle::{TypeOracle, TypeRegistry},
    publisher::{NatsPublisher, PublisherConfig},
    repository::{MemoryRepository, NatsRepositoryClient, RepositoryClientConfig, RepositoryFacade},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("junction={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Junction - Metadata Exchange Gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Source name: {}", args.source_name);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("NATS: {}", args.nats.nats_url);
    info!("Notifications: {}", args.notification_subject);
    info!("Cohort queries: {}", args.query_subject);
    info!("Context queries: {}", args.context_subject);
    info!("Outbound events: {}.*", args.event_subject_prefix);
    info!("Karma: +{} / plateau {}", args.karma_increment, args.karma_plateau);
    info!("Watched types: {:?}", args.watched_type_list());
    info!("======================================");

    // Connect to NATS - the only transport, so a failed connection is fatal
    let nats = match NatsClient::new(&args.nats, &format!("junction-{}", args.node_id)).await {
        Ok(client) => client.with_timeout(Duration::from_millis(args.request_timeout_ms)),
        Err(e) => {
            error!("NATS connection failed: {}", e);
            std::process::exit(1);
        }
    };

    // Seed the type registry
    let registry = match &args.type_defs {
        Some(path) => {
            let document = std::fs::read_to_string(path)?;
            let registry = TypeRegistry::from_json(&document)?;
            info!("Type registry seeded with {} definitions from {}", registry.len(), path);
            registry
        }
        None => {
            warn!("No TYPE_DEFS document configured, registry starts empty");
            TypeRegistry::new()
        }
    };
    let oracle: Arc<dyn TypeOracle> = Arc::new(registry);

    // Repository facade: cohort query service, or in-process graph in dev mode
    let repository: Arc<dyn RepositoryFacade> = if args.dev_mode {
        warn!("Dev mode: using in-process repository");
        Arc::new(MemoryRepository::new())
    } else {
        Arc::new(NatsRepositoryClient::new(
            nats.clone(),
            RepositoryClientConfig {
                query_subject: args.query_subject.clone(),
            },
        ))
    };

    // Contribution ledger lives in-process; a cohort-backed ledger plugs in
    // through the same trait
    let ledger: Arc<dyn ContributionLedger> = Arc::new(MemoryLedger::new());

    // Outbound publisher
    let publisher = Arc::new(NatsPublisher::new(
        nats.clone(),
        PublisherConfig {
            subject_prefix: args.event_subject_prefix.clone(),
        },
    ));

    // Context builder backs both event enrichment and the query service
    let builder = Arc::new(ContextBuilder::new(repository));

    // Event classification engine
    let classifier = Arc::new(
        EventClassifier::new(
            oracle,
            ledger,
            publisher,
            ClassifierConfig {
                source_name: args.source_name.clone(),
                karma_increment: args.karma_increment,
                plateau_threshold: args.karma_plateau,
                watched_types: args.watched_type_list(),
                context_types: args.context_type_list(),
            },
        )
        .with_enricher(Arc::clone(&builder)),
    );

    // Context query service
    let context_service = Arc::new(ContextQueryService::new(
        nats.clone(),
        builder,
        ContextServiceConfig {
            subject: args.context_subject.clone(),
        },
    ));
    let context_handle = {
        let service = Arc::clone(&context_service);
        tokio::spawn(async move {
            if let Err(e) = service.run().await {
                error!("Context query service error: {}", e);
            }
        })
    };

    // Notification listener runs on the main task
    let listener = NotificationListener::new(
        nats,
        classifier,
        ListenerConfig {
            subject: args.notification_subject.clone(),
        },
    );

    if let Err(e) = listener.run().await {
        error!("Notification listener error: {}", e);
        context_service.shutdown();
        let _ = context_handle.await;
        std::process::exit(1);
    }

    context_service.shutdown();
    let _ = context_handle.await;

    Ok(())
}
