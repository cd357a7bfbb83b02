//! # esso backend
//!
//! axum integration for stateless encrypted auth tokens.
//!
//! ## Design Principles
//!
//! - **Stateless**: the token carries the session; nothing is stored server-side
//! - **Fail closed**: no key configured means every guarded request is a 500
//! - **Generic failures**: every invalid token is the same 403
//! - **Minimal logging**: never secrets, keys or token bodies
//!
//! ## Usage
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use esso_backend::{Auth, AuthPlugin};
//! use esso_core::Settings;
//!
//! # async fn run() -> Result<(), esso_backend::auth::PluginError> {
//! let settings = Settings::builder().secret("11111111111111111111").build()?;
//! let plugin = AuthPlugin::new(settings).await?;
//!
//! let private = plugin.require_authentication(
//!     Router::new().route("/me", get(|Auth(auth): Auth| async move { format!("{:?}", auth) })),
//! );
//! let app: Router = Router::new().merge(private);
//! # Ok(())
//! # }
//! ```
//!
//! ## Demo API
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/health` | GET | Health check |
//! | `/` | GET | Public route |
//! | `/auth` | POST | Trade demo credentials for a token |
//! | `/test` | GET | Guarded route |

pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod registry;

pub use auth::{Auth, AuthContexts, AuthPlugin, AuthRejection, PluginError};
pub use config::Config;
pub use handlers::AppState;
pub use registry::Registry;

use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Maximum request body size (16 KiB).
pub const MAX_BODY_SIZE: usize = 16 * 1024;

/// Build the demo router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    let guarded = state
        .plugin
        .require_authentication(Router::new().route("/test", get(handlers::private_test)));

    let token_header = HeaderName::from_bytes(state.plugin.esso().settings().header_name().as_bytes())
        .unwrap_or(header::AUTHORIZATION);

    Router::new()
        // Health check (unauthenticated)
        .route("/health", get(handlers::health))
        .route("/", get(handlers::public_root))
        .route("/auth", post(handlers::login))
        .merge(guarded)
        // Middleware stack (innermost first; the last layer added is outermost)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, token_header]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
