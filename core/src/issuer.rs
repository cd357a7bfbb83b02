//! Token issuance.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::Settings;
use crate::error::IssueError;
use crate::keyring::KeyRing;
use crate::payload::{self, Payload};

/// Issues tokens under the ring's current key.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    keys: KeyRing,
    settings: Arc<Settings>,
}

impl TokenIssuer {
    /// Create an issuer sealing with `keys`.
    pub fn new(keys: KeyRing, settings: Arc<Settings>) -> Self {
        Self { keys, settings }
    }

    /// Key ring this issuer seals with.
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Issue a token for `payload`.
    ///
    /// `None` and the empty map both encode as the empty-payload sentinel.
    /// Identical payloads yield distinct tokens (fresh IV per call).
    ///
    /// # Errors
    ///
    /// [`IssueError::Config`] with `KeyMissing` if no secret has been configured.
    pub fn issue(&self, payload: Option<&Payload>) -> Result<String, IssueError> {
        let plaintext = payload::encode(payload);
        let body = self.keys.seal(&plaintext)?;
        let prefix = self.settings.token_prefix().unwrap_or("");

        debug!(
            payload_len = plaintext.len(),
            token_len = prefix.len() + body.len(),
            "Issued token"
        );

        let mut token = String::with_capacity(prefix.len() + body.len());
        token.push_str(prefix);
        token.push_str(&body);
        Ok(token)
    }

    /// Issue a token for any value serializing to a JSON object (or `null`).
    ///
    /// # Errors
    ///
    /// [`IssueError::NotAnObject`] for scalars and arrays, otherwise as [`Self::issue`].
    pub fn issue_from<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, IssueError> {
        let payload = payload::to_payload(value)?;
        self.issue(Some(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::IV_HEX_LEN;
    use crate::error::ConfigError;
    use crate::payload::EMPTY_SENTINEL;
    use serde_json::json;

    const SECRET: &str = "11111111111111111111";

    fn issuer(settings: Settings) -> TokenIssuer {
        let keys = KeyRing::new(settings.header_name());
        keys.rotate(SECRET).unwrap();
        TokenIssuer::new(keys, Arc::new(settings))
    }

    #[test]
    fn tokens_carry_prefix() {
        let issuer = issuer(Settings::builder().build().unwrap());
        for token in [
            issuer.issue(None).unwrap(),
            issuer.issue(Some(&Payload::new())).unwrap(),
            issuer.issue_from(&json!({"a": 1})).unwrap(),
        ] {
            assert!(token.starts_with("Bearer "));
            assert!(token.len() > "Bearer ".len() + IV_HEX_LEN);
        }
    }

    #[test]
    fn tokens_are_never_repeated() {
        let issuer = issuer(Settings::builder().build().unwrap());
        assert_ne!(issuer.issue(None).unwrap(), issuer.issue(None).unwrap());

        let payload = json!({"a": 1}).as_object().cloned().unwrap();
        assert_ne!(
            issuer.issue(Some(&payload)).unwrap(),
            issuer.issue(Some(&payload)).unwrap()
        );
    }

    #[test]
    fn empty_payload_encrypts_sentinel() {
        let issuer = issuer(Settings::builder().token_prefix(None::<String>).build().unwrap());
        let token = issuer.issue(None).unwrap();
        assert_eq!(
            issuer.keys().decrypt_with_fallback(&token).unwrap(),
            EMPTY_SENTINEL
        );

        let token = issuer.issue(Some(&Payload::new())).unwrap();
        assert_eq!(
            issuer.keys().decrypt_with_fallback(&token).unwrap(),
            EMPTY_SENTINEL
        );
    }

    #[test]
    fn custom_prefix() {
        let issuer = issuer(
            Settings::builder()
                .token_prefix(Some("rickroll "))
                .build()
                .unwrap(),
        );
        assert!(issuer.issue(None).unwrap().starts_with("rickroll "));
    }

    #[test]
    fn typed_payload_must_be_object() {
        let issuer = issuer(Settings::builder().build().unwrap());
        assert_eq!(
            issuer.issue_from(&"text"),
            Err(IssueError::NotAnObject("string"))
        );
        assert!(issuer.issue_from(&()).is_ok());
    }

    #[test]
    fn issuing_without_key_fails() {
        let settings = Arc::new(Settings::builder().build().unwrap());
        let issuer = TokenIssuer::new(KeyRing::new("authorization"), settings);
        assert_eq!(
            issuer.issue(None),
            Err(IssueError::Config(ConfigError::KeyMissing))
        );
    }
}
