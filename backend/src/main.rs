//! esso demo server.
//!
//! Serves a public route, a login route issuing tokens and a guarded route.
//!
//! # Security Properties
//!
//! - Secrets come from the environment only and are never logged
//! - Key derivation happens once at startup, off the async runtime
//! - Without `ESSO_SECRET` every guarded request fails closed

use esso_backend::{build_router, AppState, AuthPlugin, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Initialize structured logging
    init_tracing();

    // Load and validate configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };
    log_startup_info(&config);

    let settings = match config.settings() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "Invalid token settings");
            std::process::exit(1);
        }
    };

    let plugin = match AuthPlugin::new(settings).await {
        Ok(plugin) => plugin,
        Err(err) => {
            error!(error = %err, "Failed to initialise authentication");
            std::process::exit(1);
        }
    };

    let mut state = AppState::new(plugin, config.demo_user.as_str());
    if let Some(password) = config.demo_password {
        state = state.with_password(password);
    }

    // Build and serve the application
    let app = build_router(state);
    serve(app, &config.bind_addr, config.port).await;
}

/// Initialize tracing with environment-based log levels.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("esso_backend=debug,esso_core=info,tower_http=info")
        }))
        .init();
}

/// Log startup configuration (no secrets).
fn log_startup_info(config: &Config) {
    info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        secret_configured = config.secret.is_some(),
        previous_secret_configured = config.previous_secret.is_some(),
        header_name = config.header_name.as_deref().unwrap_or(esso_core::DEFAULT_HEADER_NAME),
        headers = !config.disable_headers,
        query = !config.disable_query,
        cookies = !config.disable_cookies,
        prefix_enabled = config.token_prefix.is_some(),
        login_enabled = config.demo_password.is_some(),
        "Starting esso backend"
    );
}

/// Bind to address and serve the application.
async fn serve(app: axum::Router, bind_addr: &str, port: u16) {
    let bind_addr = format!("{bind_addr}:{port}");

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %bind_addr, error = %err, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    info!(addr = %bind_addr, "Server listening");

    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }
}
