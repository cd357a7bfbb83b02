//! HTTP request handlers for the demo API.
//!
//! - `GET /` is public
//! - `POST /auth` trades the demo credentials for a token
//! - `GET /test` requires a token and greets the user inside it

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use esso_core::IssueError;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info};

use crate::auth::{Auth, AuthPlugin};
use crate::models::*;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub plugin: AuthPlugin,
    /// Username accepted by the login route
    pub demo_user: Arc<str>,
    /// Password accepted by the login route; `None` disables login
    pub demo_password: Option<Arc<SecretString>>,
}

impl AppState {
    pub fn new(plugin: AuthPlugin, demo_user: impl Into<Arc<str>>) -> Self {
        Self {
            plugin,
            demo_user: demo_user.into(),
            demo_password: None,
        }
    }

    pub fn with_password(mut self, password: SecretString) -> Self {
        self.demo_password = Some(Arc::new(password));
        self
    }

    /// Constant-time check of the demo credentials.
    fn credentials_match(&self, user: &str, password: &str) -> bool {
        let Some(expected) = &self.demo_password else {
            return false;
        };
        let user_ok = user.as_bytes().ct_eq(self.demo_user.as_bytes());
        let password_ok = password
            .as_bytes()
            .ct_eq(expected.expose_secret().as_bytes());
        (user_ok & password_ok).into()
    }
}

// === Health Check ===

/// GET /health - Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.plugin.esso().keys().is_configured() {
        "ok"
    } else {
        "no_key"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// === Public ===

/// GET / - Reachable without a token
pub async fn public_root() -> Json<PublicResponse> {
    Json(PublicResponse { public: true })
}

// === Login ===

/// POST /auth - Issue a token for the demo user
///
/// Always 403 when no demo password is configured.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if !state.credentials_match(&req.user, &req.password) {
        debug!("Login rejected");
        return Err(ApiError::BadCredentials);
    }

    let token = state
        .plugin
        .generate_auth_token_from(&json!({ "user": req.user }))?;

    info!("Token issued");
    Ok(Json(TokenResponse { token }))
}

// === Private ===

/// GET /test - Requires authentication
pub async fn private_test(Auth(auth): Auth) -> Json<PrivateResponse> {
    let user = auth
        .get("user")
        .and_then(|value| value.as_str())
        .unwrap_or("anonymous");

    Json(PrivateResponse {
        private: true,
        message: format!("Hello, {user}!"),
    })
}

// === Error Handling ===

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid credentials")]
    BadCredentials,

    #[error(transparent)]
    Issue(#[from] IssueError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadCredentials => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::Issue(err) => {
                error!(error = %err, "Token issuance failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        (status, Json(ErrorResponse::new(status, message))).into_response()
    }
}
