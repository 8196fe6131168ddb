//! Intent Settlement - barter-style intent matching service
//!
//! Serves the intent/settlement HTTP API and, when enabled, a Prometheus
//! metrics endpoint.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use intent_settlement::api;
use intent_settlement::config::{Settings, StoreBackend};
use intent_settlement::coordination::SettlementCoordinator;
use intent_settlement::metrics::{self, MetricsServer};
use intent_settlement::state::{IntentStore, MemoryStore, StateManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Intent Settlement v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration: {:?} store, max chain depth {}",
        settings.database.backend, settings.engine.max_depth
    );

    // Initialize the intent store
    let store: Arc<dyn IntentStore> = match settings.database.backend {
        StoreBackend::Sqlite => {
            let manager = StateManager::new(&settings.database)
                .await
                .context("Failed to open database")?;
            info!("Database connection established");

            // Run migrations
            manager.run_migrations().await?;
            Arc::new(manager)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, intents are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Initialize settlement coordinator
    let coordinator = Arc::new(SettlementCoordinator::new(store, &settings.engine)?);
    info!("Settlement coordinator initialized");

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let coordinator = coordinator.clone();
        async move {
            if let Err(e) = api::run_server(config, coordinator).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Health check loop
    let health_handle = tokio::spawn({
        let coordinator = coordinator.clone();
        let interval = settings.service.health_check_interval_secs;
        async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;

                match coordinator.health_check().await {
                    Ok(()) => metrics::record_health_check(),
                    Err(e) => {
                        warn!("Store health check failed: {}", e);
                        metrics::record_health_check_failure();
                    }
                }
            }
        }
    });

    info!("Intent Settlement is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Abort background tasks
    api_handle.abort();
    health_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Intent Settlement stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,intent_settlement=debug,sqlx=warn,hyper=warn")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
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
}
