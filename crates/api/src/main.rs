use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taleify_api::config::ServerConfig;
use taleify_api::router::build_app_router;
use taleify_api::state::{build_capabilities, build_keyword_generator, AppState};
use taleify_imaging::storage::LocalDiskStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    if config.api_key.is_none() {
        tracing::warn!("No API_KEY set, skipping API key check on /api/v1 routes");
    }

    // --- Storage ---
    let store = Arc::new(LocalDiskStore::new(&config.upload_dir, &config.app_url));
    store
        .ensure_dir()
        .await
        .expect("Failed to create upload directory");
    tracing::info!(dir = %config.upload_dir.display(), "Upload directory ready");

    // --- Capabilities and job state ---
    let capabilities =
        build_capabilities(&config, Arc::clone(&store)).expect("Failed to build image capabilities");
    let keywords = build_keyword_generator(&config).expect("Failed to build keyword generator");
    let state = AppState::new(config.clone(), store, capabilities, keywords);
    let jobs = state.jobs.clone();
    tracing::info!(
        ttl_secs = config.jobs.process_ttl_secs,
        max_entries = config.jobs.cache_max_entries,
        "Job registry created",
    );

    // --- Cache sweeper ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(taleify_jobs::sweeper::run(
        Arc::clone(jobs.registry()),
        config.jobs.sweep_interval(),
        sweep_cancel.clone(),
    ));

    // --- Router ---
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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    match tokio::time::timeout(Duration::from_secs(5), sweep_handle).await {
        Ok(Ok(())) => tracing::info!("Cache sweeper stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Cache sweeper task failed"),
        Err(_) => tracing::warn!("Cache sweeper did not stop within 5s"),
    }

    let drain_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if jobs.runner().drain(drain_timeout).await {
        tracing::info!("All page pipelines finished");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taleify_api=debug,taleify_jobs=debug,taleify_imaging=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
