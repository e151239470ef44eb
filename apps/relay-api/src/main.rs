//! signrelay HTTP service.
//!
//! Accepts PDFs for e-signature, submits them to the signing provider,
//! tracks envelope lifecycle through provider webhooks, and relays
//! terminal-state notifications to the original requester.

mod config;
mod health;
mod logging;
mod openapi;

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use config::Config;
use signrelay_api::{
    api_router, notifier_channel, ApiState, NotifierService, NotifierWorker, ProviderConfig,
    SubmissionService,
};
use signrelay_api::services::notifier::NOTIFIER_QUEUE_CAPACITY;
use signrelay_db::{run_migrations, DbPool};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        provider_env = %config.docusign_env,
        "Starting signrelay API"
    );

    // Database pool and migrations
    let pool = match DbPool::connect(&config.database_url).await {
        Ok(pool) => {
            info!("Database connection established");
            pool
        }
        Err(e) => {
            eprintln!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&pool).await {
        eprintln!("FATAL: Database migration failed: {e}");
        std::process::exit(1);
    }
    let pool = pool.into_inner();

    // Notification queue and delivery worker
    let (notifier_handle, notifier_rx) = notifier_channel(NOTIFIER_QUEUE_CAPACITY);
    let notifier_service = match NotifierService::new(pool.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create notifier service: {e}");
            std::process::exit(1);
        }
    };

    let worker_token = CancellationToken::new();
    {
        let worker = NotifierWorker::new(notifier_service, notifier_rx, worker_token.clone());
        tokio::spawn(async move {
            worker.run().await;
        });
        info!("Notification worker started");
    }

    // Submission service against the configured provider environment
    let provider = ProviderConfig {
        environment: config.docusign_env,
        base_path: config.base_path.clone(),
        account_id: config.account_id.clone(),
        credentials: config.credentials.clone(),
    };

    let submission = match SubmissionService::new(pool.clone(), provider, config.webhook_url()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create submission service: {e}");
            std::process::exit(1);
        }
    };

    let state = ApiState::new(pool, submission, notifier_handle);

    let app = Router::new()
        .route("/health", get(health::health_handler))
        .merge(openapi::openapi_routes())
        .merge(api_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Bind and serve
    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    info!(%addr, "Server listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    // Stop the notification worker after the listener drains.
    worker_token.cancel();
    info!("Server shutdown complete");
}

/// Graceful shutdown on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
