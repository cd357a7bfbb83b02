//! Request and response bodies for the demo API.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

// ============================================================================
// Login
// ============================================================================

/// Request body for POST /auth
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user: String,
    pub password: String,
}

/// Response for POST /auth
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// ============================================================================
// Routes
// ============================================================================

/// Response for GET /
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicResponse {
    pub public: bool,
}

/// Response for GET /test
#[derive(Debug, Serialize, Deserialize)]
pub struct PrivateResponse {
    pub private: bool,
    pub message: String,
}

/// Response for GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body, shaped like fastify's default error response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.into(),
        }
    }
}
