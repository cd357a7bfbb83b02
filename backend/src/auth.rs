//! axum integration of the esso token mechanism.
//!
//! [`AuthPlugin`] wraps [`esso_core::Esso`] and exposes the three host-facing
//! capabilities:
//!
//! - **requireAuthentication**: [`AuthPlugin::require_authentication`] installs
//!   the validation middleware on every route of a router (its scope)
//! - **generateAuthToken**: [`AuthPlugin::generate_auth_token`]
//! - **auth**: the decoded payload, stored per request in [`AuthContexts`]
//!   under the configured field name and read with the [`Auth`] or
//!   [`AuthContexts`] extractors
//!
//! # Security Model
//!
//! - No credential: 401. Any invalid credential: 403 with a generic body.
//!   Causes are only logged.
//! - Extra-validation rejections keep their status and message.
//! - Before any secret is configured every guarded request fails with 500.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts, HeaderName, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use esso_core::{
    AuthContext, AuthError, Bindings, ConfigError, CredentialSource, Esso, IssueError, Payload,
    Settings,
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::models::ErrorResponse;

/// Setup and rotation failures.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("key derivation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The token mechanism bound to axum.
///
/// Cheap to clone; clones share keys.
#[derive(Clone, Debug)]
pub struct AuthPlugin {
    esso: Esso,
    auth_field: Arc<str>,
}

impl AuthPlugin {
    /// Validate `settings` and derive keys for any configured secrets.
    ///
    /// Derivation runs on the blocking pool.
    pub async fn new(settings: Settings) -> Result<Self, PluginError> {
        HeaderName::from_bytes(settings.header_name().as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(settings.header_name().to_string()))?;

        let esso = tokio::task::spawn_blocking(move || Esso::new(settings)).await??;
        let auth_field: Arc<str> = esso.bindings().auth_field().into();

        info!(
            header_name = esso.settings().header_name(),
            auth_field = %auth_field,
            key_configured = esso.keys().is_configured(),
            "Auth plugin ready"
        );

        Ok(Self { esso, auth_field })
    }

    /// Issue a token carrying `payload`.
    pub fn generate_auth_token(&self, payload: Option<&Payload>) -> Result<String, IssueError> {
        self.esso.issue(payload)
    }

    /// Issue a token for a typed payload.
    pub fn generate_auth_token_from<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<String, IssueError> {
        self.esso.issue_from(value)
    }

    /// Rotate to `new_secret`; tokens from the current secret stay valid until
    /// the next rotation.
    pub async fn set_secret(&self, new_secret: impl Into<String>) -> Result<(), PluginError> {
        let new_secret = new_secret.into();
        let esso = self.esso.clone();
        tokio::task::spawn_blocking(move || esso.rotate(&new_secret)).await??;
        Ok(())
    }

    /// Require a valid token on every route of `router`.
    ///
    /// Installed as a route layer, so unmatched paths still 404.
    pub fn require_authentication<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self.clone(), require_auth))
    }

    /// Resolved capability names.
    pub fn bindings(&self) -> &Bindings {
        self.esso.bindings()
    }

    /// Field the authenticated context is stored under.
    pub fn auth_field(&self) -> &str {
        &self.auth_field
    }

    /// The underlying mechanism.
    pub fn esso(&self) -> &Esso {
        &self.esso
    }

    /// Validate a request's credentials.
    pub fn authenticate(&self, parts: &Parts) -> Result<AuthContext, AuthError> {
        self.esso.validate(&RequestCredentials::new(parts))
    }
}

/// Validation middleware; attaches the context on success.
async fn require_auth(State(plugin): State<AuthPlugin>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    match plugin.authenticate(&parts) {
        Ok(context) => {
            let mut contexts = parts
                .extensions
                .remove::<AuthContexts>()
                .unwrap_or_default();
            contexts.insert(plugin.auth_field.to_string(), context);
            parts.extensions.insert(contexts);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => AuthRejection(err).into_response(),
    }
}

// === Credential Lookup ===

/// [`CredentialSource`] over an HTTP request head, route included.
pub struct RequestCredentials<'a> {
    parts: &'a Parts,
    query: Vec<(String, String)>,
}

impl<'a> RequestCredentials<'a> {
    /// Parse the query string of `parts`; a malformed query counts as empty.
    pub fn new(parts: &'a Parts) -> Self {
        let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();
        Self { parts, query }
    }
}

impl CredentialSource for RequestCredentials<'_> {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.parts
            .headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
    }

    fn query(&self, name: &str) -> Option<Cow<'_, str>> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| Cow::Borrowed(value.as_str()))
    }

    fn cookie(&self, name: &str) -> Option<Cow<'_, str>> {
        self.parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookies| find_cookie(cookies, name))
    }

    fn method(&self) -> Option<&str> {
        Some(self.parts.method.as_str())
    }

    fn path(&self) -> Option<&str> {
        Some(self.parts.uri.path())
    }
}

/// Find cookie `name` in a `Cookie` header value, percent-decoding it.
fn find_cookie<'a>(cookies: &'a str, name: &str) -> Option<Cow<'a, str>> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key.trim() != name {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some(urlencoding::decode(value).unwrap_or(Cow::Borrowed(value)))
    })
}

// === Request Extensions ===

/// Authenticated contexts attached to one request, keyed by auth field name.
#[derive(Debug, Clone, Default)]
pub struct AuthContexts(HashMap<String, AuthContext>);

impl AuthContexts {
    /// Context stored under `field`.
    pub fn get(&self, field: &str) -> Option<&AuthContext> {
        self.0.get(field)
    }

    /// Attach a context under `field`.
    pub fn insert(&mut self, field: String, context: AuthContext) {
        self.0.insert(field, context);
    }

    /// Number of attached contexts.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing authenticated this request.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthContexts {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContexts>()
            .cloned()
            .ok_or_else(missing_context)
    }
}

/// Context stored under the canonical `auth` field.
///
/// Use [`AuthContexts`] for renamed fields.
#[derive(Debug, Clone)]
pub struct Auth(pub AuthContext);

/// Canonical auth field name.
const DEFAULT_AUTH_FIELD: &str = "auth";

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContexts>()
            .and_then(|contexts| contexts.get(DEFAULT_AUTH_FIELD))
            .cloned()
            .map(Auth)
            .ok_or_else(missing_context)
    }
}

/// A handler asked for a context on a route without the middleware.
fn missing_context() -> AuthRejection {
    AuthRejection(AuthError::Misconfigured(ConfigError::ContextMissing))
}

// === Error Responses ===

/// Rejected request.
#[derive(Debug)]
pub struct AuthRejection(pub AuthError);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &self.0 {
            AuthError::Misconfigured(err) => error!(error = %err, "Authentication unavailable"),
            other => debug!(status = status.as_u16(), outcome = %other, "Request rejected"),
        }

        let body = Json(ErrorResponse::new(status, self.0.public_message()));
        (status, body).into_response()
    }
}
