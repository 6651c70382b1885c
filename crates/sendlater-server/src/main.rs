//! Sendlater - worker entry point

use anyhow::Result;
use sendlater_api::{create_router, AppState};
use sendlater_common::config::Config;
use sendlater_core::{
    worker, AuthSignal, BearerTokenProvider, BulkSender, DeliveryExecutor, FollowUpEngine,
    HttpMailClient, HttpSheetClient, MailApiConfig, RateLimiter, Scheduler, TriggerSource,
};
use sendlater_storage::repository::{AuthStateRepository, BudgetRepository, SentMessageRepository};
use sendlater_storage::DatabasePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Tag of the periodic follow-up sweep tick
const SWEEP_TAG: &str = "followup-sweep";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting sendlater worker...");

    // Load configuration
    let config = Config::load()?;

    // Initialize database
    let db = DatabasePool::new(&config.database).await?;
    db.migrate().await?;
    info!("Database ready");

    // Mail capabilities
    let auth_provider = Arc::new(BearerTokenProvider::from_config(&config.mail));
    let mail_client = Arc::new(HttpMailClient::new(
        MailApiConfig::from(&config.mail),
        auth_provider.clone(),
    ));
    let sheet_client = Arc::new(HttpSheetClient::new(
        MailApiConfig::from(&config.mail),
        auth_provider,
    ));

    // Core components
    let rate_limiter = Arc::new(RateLimiter::new(BudgetRepository::new(db.pool().clone())));
    rate_limiter
        .configure_limit(config.sending.daily_limit)
        .await?;

    let auth_signal = Arc::new(AuthSignal::new(AuthStateRepository::new(db.pool().clone())));
    let executor = Arc::new(DeliveryExecutor::new(mail_client.clone()));

    let (triggers, events) = TriggerSource::new();
    let triggers = Arc::new(triggers);

    let scheduler = Arc::new(Scheduler::new(
        &db,
        rate_limiter.clone(),
        executor.clone(),
        triggers.clone(),
        auth_signal.clone(),
    ));

    let engine = Arc::new(FollowUpEngine::new(
        &db,
        mail_client,
        scheduler.clone(),
        config.followup.candidate_limit,
    ));

    let bulk_sender = Arc::new(BulkSender::new(
        executor.clone(),
        rate_limiter.clone(),
        SentMessageRepository::new(db.pool().clone()),
        sheet_client,
        auth_signal.clone(),
        Duration::from_millis(config.sending.bulk_delay_ms),
    ));

    // Rebuild alarms from the durable store
    let restored = scheduler.restore().await?;
    info!(restored, "Scheduler state restored");

    // Periodic follow-up sweep
    let sweep_handle = triggers.periodic(SWEEP_TAG, config.followup.sweep_interval_minutes);

    // The single event-processing loop
    let worker_handle = {
        let scheduler = scheduler.clone();
        let engine = engine.clone();
        tokio::spawn(async move {
            worker::run(events, scheduler, engine).await;
        })
    };

    // Control API for the UI layer
    let api_handle = {
        let state = Arc::new(AppState {
            scheduler,
            engine,
            bulk_sender,
            rate_limiter,
            auth_signal,
        });
        let bind = format!("{}:{}", config.api.bind, config.api.port);

        tokio::spawn(async move {
            let app = create_router(state);
            let listener = match tokio::net::TcpListener::bind(&bind).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!("Failed to bind control API on {}: {}", bind, e);
                    return;
                }
            };
            info!("Control API listening on {}", bind);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Control API error: {}", e);
            }
        })
    };

    info!("Sendlater worker started");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    sweep_handle.abort();
    worker_handle.abort();
    api_handle.abort();

    info!("Sendlater worker shutdown complete");

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sendlater=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}
