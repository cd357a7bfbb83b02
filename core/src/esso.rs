//! The assembled token mechanism: one key ring shared by an issuer and a
//! validator, configured by one [`Settings`].

use std::sync::Arc;

use serde::Serialize;

use crate::config::Settings;
use crate::error::{AuthError, IssueError, Result};
use crate::extract::CredentialSource;
use crate::issuer::TokenIssuer;
use crate::kdf;
use crate::keyring::KeyRing;
use crate::naming::Bindings;
use crate::payload::{AuthContext, Payload};
use crate::validator::TokenValidator;

/// Issuer, validator and rotation store bound together.
///
/// Cheap to clone; clones share keys and settings.
#[derive(Debug, Clone)]
pub struct Esso {
    settings: Arc<Settings>,
    keys: KeyRing,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl Esso {
    /// Build the mechanism, deriving keys for any configured secrets.
    ///
    /// Key derivation is deliberately slow; async hosts should call this from
    /// a blocking-capable thread.
    ///
    /// # Errors
    ///
    /// [`crate::ConfigError::SecretTooShort`] if a configured secret is rejected.
    pub fn new(mut settings: Settings) -> Result<Self> {
        let secrets = std::mem::take(&mut settings.secrets);
        let settings = Arc::new(settings);
        let keys = KeyRing::new(settings.header_name());

        // Oldest first, so the configured secret ends up current
        if let Some(previous) = &secrets.previous {
            keys.install(kdf::derive_key(previous, settings.header_name())?);
        }
        if let Some(current) = &secrets.current {
            keys.install(kdf::derive_key(current, settings.header_name())?);
        }
        drop(secrets);

        Ok(Self {
            issuer: TokenIssuer::new(keys.clone(), settings.clone()),
            validator: TokenValidator::new(keys.clone(), settings.clone()),
            settings,
            keys,
        })
    }

    /// Issue a token for `payload`.
    pub fn issue(&self, payload: Option<&Payload>) -> std::result::Result<String, IssueError> {
        self.issuer.issue(payload)
    }

    /// Issue a token for a typed payload.
    pub fn issue_from<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> std::result::Result<String, IssueError> {
        self.issuer.issue_from(value)
    }

    /// Validate the credential carried by `request`.
    pub fn validate(
        &self,
        request: &dyn CredentialSource,
    ) -> std::result::Result<AuthContext, AuthError> {
        self.validator.validate(request)
    }

    /// Replace the secret; tokens issued under the old one stay valid for one
    /// more rotation.
    pub fn rotate(&self, new_secret: &str) -> Result<()> {
        self.keys.rotate(new_secret)
    }

    /// Validated settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolved capability names.
    pub fn bindings(&self) -> &Bindings {
        self.settings.bindings()
    }

    /// Shared rotation store.
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// The issuer half.
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// The validator half.
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ForbiddenReason};
    use crate::extract::MapSource;
    use serde_json::json;

    const SECRET_1: &str = "11111111111111111111";
    const SECRET_2: &str = "22222222222222222222";
    const SECRET_3: &str = "33333333333333333333";

    fn header(token: &str) -> MapSource {
        MapSource::new().with_header("authorization", token)
    }

    #[test]
    fn issue_then_validate() {
        let esso = Esso::new(Settings::builder().secret(SECRET_1).build().unwrap()).unwrap();
        let token = esso.issue_from(&json!({"a": 1})).unwrap();
        let ctx = esso.validate(&header(&token)).unwrap();
        assert_eq!(ctx.get("a"), Some(&json!(1)));
    }

    #[test]
    fn without_secret_everything_fails_closed() {
        let esso = Esso::new(Settings::builder().build().unwrap()).unwrap();
        assert!(!esso.keys().is_configured());
        assert_eq!(
            esso.issue(None),
            Err(IssueError::Config(ConfigError::KeyMissing))
        );

        esso.rotate(SECRET_1).unwrap();
        let token = esso.issue(None).unwrap();
        assert!(esso.validate(&header(&token)).unwrap().is_empty());
    }

    #[test]
    fn previous_secret_tokens_accepted_until_next_rotation() {
        let old = Esso::new(Settings::builder().secret(SECRET_1).build().unwrap()).unwrap();
        let token = old.issue(None).unwrap();

        let restarted = Esso::new(
            Settings::builder()
                .secret(SECRET_2)
                .previous_secret(SECRET_1)
                .build()
                .unwrap(),
        )
        .unwrap();
        assert!(restarted.validate(&header(&token)).is_ok());

        restarted.rotate(SECRET_3).unwrap();
        assert_eq!(
            restarted.validate(&header(&token)),
            Err(AuthError::Forbidden(ForbiddenReason::KeyMismatch))
        );
    }

    #[test]
    fn clones_share_keys() {
        let esso = Esso::new(Settings::builder().secret(SECRET_1).build().unwrap()).unwrap();
        let clone = esso.clone();
        let token = esso.issue(None).unwrap();

        clone.rotate(SECRET_2).unwrap();
        clone.rotate(SECRET_3).unwrap();
        assert!(esso.validate(&header(&token)).is_err());
    }

    #[test]
    fn instances_with_different_header_names_do_not_share_keys() {
        let a = Esso::new(Settings::builder().secret(SECRET_1).build().unwrap()).unwrap();
        let b = Esso::new(
            Settings::builder()
                .secret(SECRET_1)
                .header_name("x-admin")
                .build()
                .unwrap(),
        )
        .unwrap();

        let token = a.issue(None).unwrap();
        let source = MapSource::new().with_header("x-admin", token);
        assert!(b.validate(&source).is_err());
    }
}
