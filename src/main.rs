//! TCM Store Loyalty - tiered cashback service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tcm_store_loyalty::{
    api::{router, AppState},
    notify::{LogNotifier, NatsNotifier, Notifier},
    repository::{LoyaltyStore, MemoryStore, OrderStore, PgStore},
    service::{NotificationDispatcher, OrderService},
    Config,
};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let tiers = config.tier_table()?;

    let (orders, accounts): (Arc<dyn OrderStore>, Arc<dyn LoyaltyStore>) = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.database_max_connections).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            let store = Arc::new(PgStore::new(db));
            (store.clone() as Arc<dyn OrderStore>, store as Arc<dyn LoyaltyStore>)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn OrderStore>, store as Arc<dyn LoyaltyStore>)
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsNotifier::new(client)),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, notifications will only be logged"); Arc::new(LogNotifier) }
        },
        None => Arc::new(LogNotifier),
    };
    let (notifications, worker) = NotificationDispatcher::spawn(notifier, config.notify_max_attempts, config.notify_retry_delay);

    let service = OrderService::new(orders, accounts, tiers, Some(notifications));
    let app = router(AppState { service: Arc::new(service) });

    tracing::info!("🚀 TCM Store Loyalty listening on 0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    // serve consumes the router; once it returns the last queue handle is gone and the worker drains
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    match worker.await {
        Ok(report) => tracing::info!(delivered = report.delivered, dead_lettered = report.dead_lettered, "Notification queue drained"),
        Err(e) => tracing::warn!(error = %e, "Notification worker did not finish cleanly"),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => { stream.recv().await; }
            Err(e) => { tracing::error!(error = %e, "Failed to listen for SIGTERM"); std::future::pending::<()>().await }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining notification queue");
}
