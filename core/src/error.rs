//! Error types for esso-core.
//!
//! # Error Categories
//!
//! - **Configuration errors** ([`ConfigError`]): fatal, raised at construction or
//!   rotation time. Never recoverable, never silently defaulted.
//! - **Cipher errors** ([`CipherError`]): a token body could not be opened.
//!   Always converted to a Forbidden outcome by the validator.
//! - **Authentication outcomes** ([`AuthError`]): the classified result of a failed
//!   validation, mapped to an HTTP status by the host integration.
//! - **Rejections** ([`Rejection`]): raised by an extra-validation hook and passed
//!   through verbatim.

use std::fmt;

use crate::naming::Capability;

/// Result type alias for esso-core operations that can only fail on configuration.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fatal configuration problems, detected at construction or rotation time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Secret missing or shorter than the required minimum.
    #[error(
        "the secret cannot be empty and should have at least {min} characters to be considered secure (got {len})"
    )]
    SecretTooShort {
        /// Length of the rejected secret, in characters.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// The header/query/cookie name is empty.
    #[error("header_name cannot be empty")]
    EmptyHeaderName,

    /// The header name is not usable as an HTTP header name.
    #[error("header_name {0:?} is not a valid header name")]
    InvalidHeaderName(String),

    /// Headers, query parameters and cookies are all disabled.
    #[error(
        "at least one of the following flags should be false: disable_headers, disable_query, disable_cookies"
    )]
    AllSourcesDisabled,

    /// A rename target is the empty string.
    #[error("rename target for {0} should be a non empty string")]
    EmptyRenameTarget(Capability),

    /// Installer and issuer were given the same external name.
    #[error(
        "generateAuthToken and requireAuthentication renames should have distinct values (both are {0:?})"
    )]
    CollidingRenameTargets(String),

    /// Another instance already exposes a capability under this name.
    #[error("a capability named {0:?} is already registered")]
    DuplicateCapability(String),

    /// A previous secret was configured without a current one.
    #[error("previous_secret requires secret to be set")]
    PreviousSecretWithoutSecret,

    /// No key has been derived yet; every validation fails closed.
    #[error("key is missing: no secret has been configured")]
    KeyMissing,

    /// scrypt refused the derivation parameters.
    #[error("key derivation failed: {0}")]
    KeyDerivation(&'static str),

    /// A handler asked for an auth context on a route without the
    /// authentication hook.
    #[error("no auth context on this request: the route is not behind requireAuthentication")]
    ContextMissing,

    /// An environment variable could not be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Failures while opening a token body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    /// Body is too short to contain the hex-encoded IV.
    #[error("token body too short: {len} characters, minimum is {min}", min = crate::cipher::IV_HEX_LEN)]
    TooShort {
        /// Actual length in characters.
        len: usize,
    },

    /// IV or ciphertext is not valid hex.
    #[error("token body is not valid hex")]
    InvalidHex,

    /// Block decryption or padding check failed.
    #[error("decryption failed")]
    Decrypt,

    /// Plaintext is not valid UTF-8.
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,

    /// The system random number generator failed to produce an IV.
    #[error("system randomness unavailable")]
    Entropy,
}

/// Failures while issuing a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssueError {
    /// The issuer cannot run (no key configured).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Encryption failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// A typed payload did not serialize to a JSON object.
    #[error("payload must serialize to a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A typed payload could not be serialized.
    #[error("payload serialization failed: {0}")]
    Serialize(String),
}

impl CipherError {
    /// Structural errors can never succeed under any key.
    pub fn is_structural(&self) -> bool {
        matches!(self, CipherError::TooShort { .. } | CipherError::InvalidHex)
    }
}

/// Why a presented credential was refused. Server-side diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// The credential does not start with the configured prefix.
    PrefixMismatch,
    /// The token body cannot be a valid token under any key.
    Malformed(CipherError),
    /// No known key opens the token into a valid payload.
    KeyMismatch,
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForbiddenReason::PrefixMismatch => write!(f, "prefix mismatch"),
            ForbiddenReason::Malformed(err) => write!(f, "malformed token: {}", err),
            ForbiddenReason::KeyMismatch => write!(f, "no key accepted the token"),
        }
    }
}

/// A refusal raised by an extra-validation hook.
///
/// Status and message reach the client unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status} {message}")]
pub struct Rejection {
    /// HTTP status code.
    pub status: u16,
    /// Client-visible message.
    pub message: String,
}

impl Rejection {
    /// Create a rejection with an arbitrary status and message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 401 with the generic message.
    pub fn unauthorized() -> Self {
        Self::new(401, "Unauthorized")
    }

    /// 403 with the generic message.
    pub fn forbidden() -> Self {
        Self::new(403, "Forbidden")
    }

    /// 403 with a custom message.
    pub fn forbidden_with(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }
}

/// Outcome of a failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential was presented at all.
    #[error("unauthorized")]
    Unauthorized,

    /// A credential was presented but is invalid.
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),

    /// The extra-validation hook refused the request.
    #[error("rejected by extra validation: {0}")]
    Rejected(Rejection),

    /// Validation cannot run; fails closed.
    #[error(transparent)]
    Misconfigured(#[from] ConfigError),
}

impl AuthError {
    /// HTTP status code for this outcome.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::Unauthorized => 401,
            AuthError::Forbidden(_) => 403,
            AuthError::Rejected(rejection) => rejection.status,
            AuthError::Misconfigured(_) => 500,
        }
    }

    /// Client-visible message. Forbidden causes are deliberately indistinguishable.
    pub fn public_message(&self) -> &str {
        match self {
            AuthError::Unauthorized => "Unauthorized",
            AuthError::Forbidden(_) => "Forbidden",
            AuthError::Rejected(rejection) => &rejection.message,
            AuthError::Misconfigured(_) => "Internal Server Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ConfigError::SecretTooShort { len: 3, min: 20 };
        assert!(err.to_string().contains("at least 20 characters"));

        let err = CipherError::TooShort { len: 31 };
        assert_eq!(
            err.to_string(),
            "token body too short: 31 characters, minimum is 32"
        );

        let err = ConfigError::ContextMissing;
        assert!(err.to_string().contains("requireAuthentication"));

        let err = ConfigError::EmptyRenameTarget(Capability::Auth);
        assert_eq!(err.to_string(), "rename target for auth should be a non empty string");
    }

    #[test]
    fn statuses() {
        assert_eq!(AuthError::Unauthorized.status(), 401);
        assert_eq!(AuthError::Forbidden(ForbiddenReason::KeyMismatch).status(), 403);
        assert_eq!(AuthError::Rejected(Rejection::new(418, "teapot")).status(), 418);
        assert_eq!(AuthError::from(ConfigError::KeyMissing).status(), 500);
    }

    #[test]
    fn forbidden_reasons_share_public_message() {
        let reasons = [
            ForbiddenReason::PrefixMismatch,
            ForbiddenReason::Malformed(CipherError::InvalidHex),
            ForbiddenReason::KeyMismatch,
        ];
        for reason in reasons {
            assert_eq!(AuthError::Forbidden(reason).public_message(), "Forbidden");
        }
    }

    #[test]
    fn rejection_message_passes_through() {
        let err = AuthError::Rejected(Rejection::forbidden_with("extra validation failed"));
        assert_eq!(err.public_message(), "extra validation failed");
        assert_eq!(err.status(), 403);
    }

    #[test]
    fn structural_cipher_errors() {
        assert!(CipherError::TooShort { len: 0 }.is_structural());
        assert!(CipherError::InvalidHex.is_structural());
        assert!(!CipherError::Decrypt.is_structural());
        assert!(!CipherError::InvalidUtf8.is_structural());
    }
}
