use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use murmur::api::{create_router, AppState};
use murmur::config::Config;
use murmur::db::{Database, DatabaseBackend, LibSqlBackend};
use murmur::embeddings::{Embedder, EmbeddingProvider};
use murmur::llm::{LlmProvider, TextGenerator};
use murmur::memory::LibSqlMemoryStore;
use murmur::scheduler::Scheduler;
use murmur::services::{PopulationManager, Services, SharedRng};
use murmur::social::HttpSocialGraphClient;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Autonomous bot population for a social network")]
struct Args {
    /// Skip the startup roster sync, seeding and first activity pass
    #[arg(long)]
    no_bootstrap: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();
    config.validate()?;

    if config.server.api_keys.is_empty() {
        tracing::warn!("MURMUR_API_KEYS is not set, every route except /health is locked");
    }

    tracing::info!("Initializing database...");
    let dims = config.embeddings.dimensions;
    let raw_db = Database::new(&config.database, dims).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db.clone()));

    match db.get_embedding_dimensions().await? {
        Some(stored) if stored != dims => {
            return Err(anyhow::anyhow!(
                "Embedding dimension mismatch: database has {stored}, EMBEDDING_DIMENSIONS is {dims}"
            ));
        }
        Some(_) => {}
        None => db.set_embedding_dimensions(dims).await?,
    }

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = EmbeddingProvider::new(&config.embeddings)?;
    if embeddings.dimensions() != dims {
        tracing::warn!(
            model_dims = embeddings.dimensions(),
            configured = dims,
            "Embedding model dimensions differ from EMBEDDING_DIMENSIONS"
        );
    }
    let memory_store = Arc::new(LibSqlMemoryStore::new(raw_db, Arc::new(embeddings)));

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable, content generation will fail until it is configured");
    }

    let social = Arc::new(HttpSocialGraphClient::new(&config.social)?);

    let services = Services::new(
        &config,
        db.clone(),
        social,
        Arc::new(llm),
        memory_store,
        SharedRng::from_entropy(),
    );

    if args.no_bootstrap {
        tracing::info!("Bootstrap skipped");
    } else {
        bootstrap(&services.population).await;
    }

    let scheduler = Arc::new(Scheduler::new());
    register_tasks(&scheduler, &services.population, &config);
    scheduler.start();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(Arc::new(config), db, services, scheduler.clone());
    let app = create_router(state);

    tracing::info!("Murmur starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    tracing::info!("Murmur stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "murmur=info,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Sync, seed and run one activity pass. Each step logs its own failure and
/// the next one still runs.
async fn bootstrap(population: &PopulationManager) {
    match population.sync_with_external_roster().await {
        Ok(summary) => tracing::info!(?summary, "Initial roster sync finished"),
        Err(e) => tracing::error!(error = %e, "Initial roster sync failed"),
    }
    match population.ensure_initial_population().await {
        Ok(created) => tracing::info!(created, "Initial population ensured"),
        Err(e) => tracing::error!(error = %e, "Failed to ensure initial population"),
    }
    match population.run_due_activities().await {
        Ok(summary) => tracing::info!(?summary, "Initial activity pass finished"),
        Err(e) => tracing::error!(error = %e, "Initial activity pass failed"),
    }
}

fn register_tasks(scheduler: &Scheduler, population: &Arc<PopulationManager>, config: &Config) {
    let intervals = &config.scheduler;

    let p = population.clone();
    scheduler.schedule_task(
        move || {
            let p = p.clone();
            async move { p.sync_with_external_roster().await.map(|_| ()) }
        },
        Duration::from_secs(intervals.sync_interval_secs),
        Some(Duration::from_secs(intervals.sync_interval_secs)),
        Some("sync_bots_with_external_api".to_string()),
    );

    let p = population.clone();
    scheduler.schedule_task(
        move || {
            let p = p.clone();
            async move { p.ensure_initial_population().await.map(|_| ()) }
        },
        Duration::from_secs(intervals.initial_reseed_delay_secs),
        None,
        Some("initialize_bots".to_string()),
    );

    let p = population.clone();
    scheduler.schedule_task(
        move || {
            let p = p.clone();
            async move { p.daily_growth().await.map(|_| ()) }
        },
        Duration::from_secs(intervals.growth_interval_secs),
        Some(Duration::from_secs(intervals.growth_interval_secs)),
        Some("daily_bot_growth".to_string()),
    );

    let p = population.clone();
    scheduler.schedule_task(
        move || {
            let p = p.clone();
            async move { p.run_due_activities().await.map(|_| ()) }
        },
        Duration::from_secs(intervals.monitoring_interval_secs),
        Some(Duration::from_secs(intervals.monitoring_interval_secs)),
        Some("run_due_bot_activities".to_string()),
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping HTTP server and scheduler...");
}
