//! Order Book Imbalance Monitor
//!
//! Watches Binance depth streams for a fixed set of symbols and notifies when
//! the top-of-book volume imbalance crosses the configured threshold.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use imbalance_monitor::{
    metrics, AlertDispatcher, Config, LogNotifier, NotificationThrottle, Notifier, SymbolWorker,
    TelegramNotifier,
};

/// Delivery confirmations buffered per symbol
const DELIVERY_BUFFER: usize = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting Imbalance Monitor");

    // Load configuration
    let config = Arc::new(Config::load()?);
    config.validate()?;
    info!(
        symbols = ?config.symbols,
        threshold = config.threshold,
        top_n = config.top_n,
        "Configuration loaded"
    );

    let notifier: Arc<dyn Notifier> = if config.has_telegram_credentials() {
        Arc::new(TelegramNotifier::new(
            &config.telegram_api_url,
            &config.telegram_bot_token,
            &config.telegram_chat_id,
        )?)
    } else {
        Arc::new(LogNotifier)
    };

    // Start health check server
    let health_port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_port).await {
            warn!(error = %e, "Health server error");
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    for symbol in &config.symbols {
        let (candidate_tx, candidate_rx) = watch::channel(None);
        let (delivery_tx, delivery_rx) = mpsc::channel(DELIVERY_BUFFER);

        let dispatcher = AlertDispatcher::new(
            symbol,
            NotificationThrottle::new(config.notification_cooldown, config.notification_min_delta),
            notifier.clone(),
        );
        tasks.spawn(dispatcher.run(candidate_rx, delivery_tx, shutdown_rx.clone()));

        let worker = SymbolWorker::new(symbol, &config, candidate_tx, delivery_rx);
        tasks.spawn(worker.run(shutdown_rx.clone()));
    }

    info!(workers = config.symbols.len(), "Monitor started, waiting for updates");

    wait_for_shutdown().await?;
    info!("Stopping monitor");
    let _ = shutdown_tx.send(true);

    let drain = async { while tasks.join_next().await.is_some() {} };
    if tokio::time::timeout(config.shutdown_grace, drain).await.is_err() {
        warn!(
            grace_secs = config.shutdown_grace.as_secs_f64(),
            "Tasks still running after grace period, aborting"
        );
        tasks.abort_all();
    }

    info!("Monitor stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

/// Start HTTP server for health checks and metrics
async fn start_health_server(port: u16) -> anyhow::Result<()> {
    use std::net::SocketAddr;

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Starting health check server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "component": "imbalance-monitor",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics_handler() -> String {
    metrics::render()
}
