use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fleetpulse_core::rules::RuleEngine;
use fleetpulse_db::{AlertStore, MemoryAlertStore, PgAlertStore};
use fleetpulse_events::SubscriptionRegistry;
use fleetpulse_pipeline::IngestionPipeline;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetpulse_api::config::ServerConfig;
use fleetpulse_api::router::build_app_router;
use fleetpulse_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    init_tracing(config.log_json);
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Alert store ---
    let store: Arc<dyn AlertStore> = match &config.database_url {
        Some(database_url) => {
            let pool = fleetpulse_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            fleetpulse_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            fleetpulse_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgAlertStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, alerts are kept in memory only");
            Arc::new(MemoryAlertStore::new())
        }
    };

    // --- Rules, registry, pipeline ---
    let engine = Arc::new(RuleEngine::standard(&config.rules));
    tracing::info!(rules = ?engine.rule_names(), "Rule engine ready");

    let registry = SubscriptionRegistry::new(config.subscriber_buffer);
    let pipeline = IngestionPipeline::new(engine, store, registry.clone());

    // --- App state & router ---
    let state = AppState::new(config.clone(), pipeline);
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Closing the registry ends every subscriber stream, so sessions send a
    // Close frame and the server can drain.
    let (stopping_tx, stopping_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown_registry = registry.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let subscribers = shutdown_registry.total_subscribers();
                tracing::info!(subscribers, "Closing subscriber sessions");
                shutdown_registry.close();
                let _ = stopping_tx.send(());
            })
            .await
    });

    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let result = tokio::select! {
        result = &mut server => result,
        _ = stopping_rx => match tokio::time::timeout(drain, &mut server).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_secs = config.shutdown_timeout_secs, "Shutdown timeout elapsed, dropping remaining connections");
                server.abort();
                Ok(Ok(()))
            }
        },
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Server error: {e}"),
        Err(e) => panic!("Server task failed: {e}"),
    }

    // Covers the server exiting without a signal.
    registry.close();
    tracing::info!("Graceful shutdown complete");
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter; `json` switches to one JSON
/// object per line.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "fleetpulse_api=debug,fleetpulse_pipeline=debug,fleetpulse_events=info,tower_http=debug"
            .into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
