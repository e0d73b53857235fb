//! Drop Claimer binary.

use drop_claimer::{create_router, AppState, Config};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Drop Claimer");

    let config: Config = config::Config::builder()
        .add_source(config::File::with_name("claimer").required(false))
        .add_source(config::Environment::with_prefix("CLAIMER"))
        .build()
        .and_then(|c| c.try_deserialize())
        .unwrap_or_else(|e| {
            // Fall back only when no config exists; parsing errors fail hard.
            let err_str = format!("{e}");
            if err_str.contains("not found") {
                warn!(error = %e, "No config file found, using defaults");
                Config::default()
            } else {
                error!(error = %e, "FATAL: Config error, fix env vars or claimer.toml");
                std::process::exit(1);
            }
        });

    if config.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
        info!("API key auth enabled");
    } else {
        warn!("CLAIMER_API_KEY not set, /claim and /session are unprotected (dev mode)");
    }

    info!(
        trail = %config.trail_id,
        version = %config.version_id,
        token = %config.token_id,
        chain_id = config.chain_id,
        signer = %config.signer_url,
        "Configuration loaded"
    );

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState::new(config)?);

    if state.session.is_signed_in() {
        info!(wallet = ?state.session.address(), "Wallet session restored from config");
    } else {
        warn!("No wallet configured; claims will fail until PUT /session");
    }

    let cancel = CancellationToken::new();

    tokio::spawn(Arc::clone(&state.conditions).run_session_watch(cancel.clone()));
    tokio::spawn(Arc::clone(&state.activity).run(cancel.clone()));

    let app = create_router(state.clone());

    info!(address = %bind_address, "Listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, stopping background tasks...");
    cancel.cancel();

    if state.claims.state().is_in_flight() {
        warn!("Shutting down with a claim attempt in flight");
    }

    info!("Drop Claimer shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
