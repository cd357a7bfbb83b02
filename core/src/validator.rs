//! Token validation pipeline.
//!
//! ```text
//! Extracting ─▶ PrefixCheck ─▶ Decrypting ─▶ Decoding ─▶ ExtraValidation ─▶ Authenticated
//!     │              │              │            │               │
//!     ▼              ▼              ▼            ▼               ▼
//! Unauthorized   Forbidden      Forbidden    Forbidden     Rejection (verbatim)
//! ```
//!
//! With no key configured every attempt fails before extraction with
//! [`AuthError::Misconfigured`], whatever the request carries.
//!
//! There is no retry: a rejected request must be resubmitted with a
//! different credential. Rejection causes are logged, never returned to
//! the client.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::Settings;
use crate::error::{AuthError, ConfigError, ForbiddenReason, Rejection};
use crate::extract::{self, CredentialSource};
use crate::keyring::{KeyRing, OpenError};
use crate::payload::{self, AuthContext};

/// Authorization check run after a token decoded successfully.
///
/// Returning `Err` rejects the request with the rejection's status and
/// message, unchanged.
pub trait ExtraValidation: Send + Sync {
    /// Inspect the request (credentials, method, path) and its decoded payload.
    fn validate(
        &self,
        request: &dyn CredentialSource,
        auth: &AuthContext,
    ) -> Result<(), Rejection>;
}

/// Default hook: accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ExtraValidation for AllowAll {
    fn validate(&self, _: &dyn CredentialSource, _: &AuthContext) -> Result<(), Rejection> {
        Ok(())
    }
}

impl<F> ExtraValidation for F
where
    F: Fn(&dyn CredentialSource, &AuthContext) -> Result<(), Rejection> + Send + Sync,
{
    fn validate(
        &self,
        request: &dyn CredentialSource,
        auth: &AuthContext,
    ) -> Result<(), Rejection> {
        self(request, auth)
    }
}

/// Runs the validation state machine against one request.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    keys: KeyRing,
    settings: Arc<Settings>,
}

impl TokenValidator {
    /// Create a validator reading keys from `keys`.
    pub fn new(keys: KeyRing, settings: Arc<Settings>) -> Self {
        Self { keys, settings }
    }

    /// Validate the credential carried by `request`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthorized`] if no enabled source carries a credential
    /// - [`AuthError::Forbidden`] if the credential is invalid at any stage
    /// - [`AuthError::Rejected`] if the extra-validation hook refused it
    /// - [`AuthError::Misconfigured`] if no key has been configured yet
    pub fn validate(&self, request: &dyn CredentialSource) -> Result<AuthContext, AuthError> {
        if !self.keys.is_configured() {
            error!("Token validation attempted before any secret was configured");
            return Err(AuthError::Misconfigured(ConfigError::KeyMissing));
        }

        // Extracting
        let candidate = extract::extract(request, &self.settings).ok_or_else(|| {
            debug!("No credential presented");
            AuthError::Unauthorized
        })?;
        let origin = candidate.origin;

        // PrefixCheck
        let body = match self.settings.token_prefix() {
            Some(prefix) => candidate.value.strip_prefix(prefix).ok_or_else(|| {
                debug!(%origin, "Credential prefix mismatch");
                AuthError::Forbidden(ForbiddenReason::PrefixMismatch)
            })?,
            None => candidate.value.as_ref(),
        };

        // Decrypting + Decoding, per key
        let payload = self
            .keys
            .open(body, payload::decode)
            .map_err(|err| match err {
                OpenError::KeyMissing => {
                    error!("Token validation attempted before any secret was configured");
                    AuthError::Misconfigured(ConfigError::KeyMissing)
                }
                OpenError::Malformed(cipher_err) => {
                    debug!(%origin, error = %cipher_err, "Malformed token");
                    AuthError::Forbidden(ForbiddenReason::Malformed(cipher_err))
                }
                OpenError::NoKeyAccepted => {
                    warn!(%origin, body_len = body.len(), "Token rejected by every known key");
                    AuthError::Forbidden(ForbiddenReason::KeyMismatch)
                }
            })?;

        let context = AuthContext::new(payload);

        // ExtraValidation
        self.settings
            .extra_validation()
            .validate(request, &context)
            .map_err(|rejection| {
                debug!(
                    status = rejection.status,
                    "Extra validation rejected request"
                );
                AuthError::Rejected(rejection)
            })?;

        Ok(context)
    }
}
