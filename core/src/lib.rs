//! esso core - stateless encrypted authentication tokens.
//!
//! This library provides the token codec and validation pipeline:
//! - Secret-to-key derivation (scrypt, salted with the header name)
//! - AES-256-CBC token bodies with a fresh random IV per token
//! - Dual-key rotation (current + previous)
//! - Header / query / cookie extraction with fixed precedence
//! - Prefix handling and a pluggable extra-validation hook
//! - Configurable capability names
//!
//! # Token Format
//!
//! ```text
//! [prefix]<32 hex chars IV><hex ciphertext>
//! Bearer 9f86d081884c7d659a2feaa0c55ad015...
//! ```
//!
//! # Constraints
//!
//! This library intentionally does NOT:
//! - Keep server-side sessions or a revocation list
//! - Enforce expiry (embed it in the payload, check it in [`ExtraValidation`])
//! - Depend on any HTTP framework (see [`CredentialSource`])
//! - Log secrets, keys or token bodies
//!
//! # Example
//!
//! ```
//! use esso_core::{Esso, MapSource, Settings};
//! use serde_json::json;
//!
//! let settings = Settings::builder()
//!     .secret("11111111111111111111")
//!     .build()
//!     .unwrap();
//! let esso = Esso::new(settings).unwrap();
//!
//! let token = esso.issue_from(&json!({ "user": "John" })).unwrap();
//! assert!(token.starts_with("Bearer "));
//!
//! let request = MapSource::new().with_header("authorization", token);
//! let auth = esso.validate(&request).unwrap();
//! assert_eq!(auth.get("user"), Some(&json!("John")));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cipher;
pub mod config;
pub mod error;
pub mod esso;
pub mod extract;
pub mod issuer;
pub mod kdf;
pub mod keyring;
pub mod naming;
pub mod payload;
pub mod validator;

// Re-export main types at crate root
pub use config::{Settings, SettingsBuilder, Sources, DEFAULT_HEADER_NAME, DEFAULT_TOKEN_PREFIX};
pub use error::{AuthError, CipherError, ConfigError, ForbiddenReason, IssueError, Rejection};
pub use esso::Esso;
pub use extract::{Candidate, CredentialSource, MapSource, Origin};
pub use issuer::TokenIssuer;
pub use kdf::{DerivedKey, KEY_SIZE, MIN_SECRET_LENGTH};
pub use keyring::{KeyPair, KeyRing};
pub use naming::{Bindings, Capability, Rename};
pub use payload::{AuthContext, Payload, EMPTY_SENTINEL};
pub use validator::{AllowAll, ExtraValidation, TokenValidator};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "11111111111111111111";

    #[test]
    fn full_issue_rotate_validate_flow() {
        let hook = |_: &dyn CredentialSource, auth: &AuthContext| -> Result<(), Rejection> {
            if auth.get("banned") == Some(&json!(true)) {
                return Err(Rejection::forbidden_with("banned"));
            }
            Ok(())
        };
        let esso = Esso::new(
            Settings::builder()
                .secret(SECRET)
                .header_name("x-session")
                .token_prefix(Some("Token "))
                .extra_validation(hook)
                .build()
                .unwrap(),
        )
        .unwrap();

        // Issue and present via cookie
        let token = esso.issue_from(&json!({"user": "John"})).unwrap();
        let request = MapSource::new().with_cookie("x-session", token.clone());
        assert_eq!(
            esso.validate(&request).unwrap().get("user"),
            Some(&json!("John"))
        );

        // One rotation keeps it alive
        esso.rotate("22222222222222222222").unwrap();
        assert!(esso.validate(&request).is_ok());

        // Hook rejection passes through
        let banned = esso.issue_from(&json!({"banned": true})).unwrap();
        let request = MapSource::new().with_header("x-session", banned);
        assert_eq!(
            esso.validate(&request).unwrap_err().public_message(),
            "banned"
        );

        // Second rotation retires the original token
        esso.rotate("33333333333333333333").unwrap();
        let request = MapSource::new().with_cookie("x-session", token);
        assert_eq!(esso.validate(&request).unwrap_err().status(), 403);
    }

    #[test]
    fn tokens_from_other_instances_rejected() {
        let a = Esso::new(Settings::builder().secret(SECRET).build().unwrap()).unwrap();
        let b = Esso::new(
            Settings::builder()
                .secret("99999999999999999999")
                .build()
                .unwrap(),
        )
        .unwrap();

        let token = a.issue(None).unwrap();
        let request = MapSource::new().with_header("authorization", token);
        assert!(matches!(
            b.validate(&request),
            Err(AuthError::Forbidden(_))
        ));
    }
}
