//! Monolith Binary - Single-process deployment
//!
//! Wires up:
//! - Local adapters (filesystem storage, ffprobe/ffmpeg, analyzer command)
//! - Background analysis workers and the janitor
//! - HTTP inbound adapter

use clipguard::{App, AppConfig, Collaborators};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "clipguard=info,tower_http=info";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();

    init_tracing();

    // 1. Collaborators
    let collaborators = match Collaborators::from_config(&config) {
        Ok(collaborators) => collaborators,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(&config.storage_root).await {
        error!("Cannot create storage root: {}", e);
        std::process::exit(1);
    }

    // 2. Application services and background work
    let app = App::new(config, collaborators);
    app.start_background();

    // 3. Start Server
    let bind = format!("{}:{}", app.config().addr, app.config().port);
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind, e);
            std::process::exit(1);
        }
    };
    info!("Listening at {}", bind);

    if let Err(e) = axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    app.shutdown().await;
}
