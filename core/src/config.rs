//! Immutable settings, resolved once at construction.
//!
//! All construction-time checks live in [`SettingsBuilder::build`]: a bad
//! secret, an empty header name, all three sources disabled, or bad renames
//! are fatal here and never surface at request time.

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::{ConfigError, Result};
use crate::kdf;
use crate::naming::{Bindings, Rename};
use crate::validator::{AllowAll, ExtraValidation};

/// Default header / query parameter / cookie name.
pub const DEFAULT_HEADER_NAME: &str = "authorization";

/// Default token prefix.
pub const DEFAULT_TOKEN_PREFIX: &str = "Bearer ";

/// Which credential sources the extractor consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sources {
    /// Request header.
    pub headers: bool,
    /// Query string parameter.
    pub query: bool,
    /// Cookie.
    pub cookies: bool,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            headers: true,
            query: true,
            cookies: true,
        }
    }
}

/// Secrets handed from the builder to the key ring, then dropped.
#[derive(Default)]
pub(crate) struct InitialSecrets {
    pub(crate) current: Option<Zeroizing<String>>,
    pub(crate) previous: Option<Zeroizing<String>>,
}

/// Validated configuration.
pub struct Settings {
    header_name: Arc<str>,
    sources: Sources,
    token_prefix: Option<Arc<str>>,
    extra_validation: Arc<dyn ExtraValidation>,
    bindings: Bindings,
    pub(crate) secrets: InitialSecrets,
}

impl Settings {
    /// Start building settings with the defaults.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Name shared by the header, query parameter and cookie lookups.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Enabled credential sources.
    pub fn sources(&self) -> Sources {
        self.sources
    }

    /// Required prefix, or `None` when disabled.
    pub fn token_prefix(&self) -> Option<&str> {
        self.token_prefix.as_deref()
    }

    /// Post-decoding validation hook.
    pub fn extra_validation(&self) -> &dyn ExtraValidation {
        self.extra_validation.as_ref()
    }

    /// Resolved capability names.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("header_name", &self.header_name)
            .field("sources", &self.sources)
            .field("token_prefix", &self.token_prefix)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Settings`].
pub struct SettingsBuilder {
    header_name: String,
    sources: Sources,
    token_prefix: Option<String>,
    extra_validation: Arc<dyn ExtraValidation>,
    rename: Rename,
    secret: Option<Zeroizing<String>>,
    previous_secret: Option<Zeroizing<String>>,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_owned(),
            sources: Sources::default(),
            token_prefix: Some(DEFAULT_TOKEN_PREFIX.to_owned()),
            extra_validation: Arc::new(AllowAll),
            rename: Rename::default(),
            secret: None,
            previous_secret: None,
        }
    }
}

impl SettingsBuilder {
    /// Secret the initial key is derived from (at least 20 characters).
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(Zeroizing::new(secret.into()));
        self
    }

    /// Secret that was active before `secret`; its tokens stay valid until the
    /// next rotation.
    pub fn previous_secret(mut self, secret: impl Into<String>) -> Self {
        self.previous_secret = Some(Zeroizing::new(secret.into()));
        self
    }

    /// Header / query parameter / cookie name.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Stop accepting the token as a request header.
    pub fn disable_headers(mut self, disable: bool) -> Self {
        self.sources.headers = !disable;
        self
    }

    /// Stop accepting the token as a query parameter.
    pub fn disable_query(mut self, disable: bool) -> Self {
        self.sources.query = !disable;
        self
    }

    /// Stop accepting the token as a cookie.
    pub fn disable_cookies(mut self, disable: bool) -> Self {
        self.sources.cookies = !disable;
        self
    }

    /// Token prefix; `None` disables prefix handling.
    pub fn token_prefix(mut self, prefix: Option<impl Into<String>>) -> Self {
        self.token_prefix = prefix.map(Into::into);
        self
    }

    /// Hook run after a token decoded successfully.
    pub fn extra_validation(mut self, hook: impl ExtraValidation + 'static) -> Self {
        self.extra_validation = Arc::new(hook);
        self
    }

    /// Shared hook run after a token decoded successfully.
    pub fn extra_validation_arc(mut self, hook: Arc<dyn ExtraValidation>) -> Self {
        self.extra_validation = hook;
        self
    }

    /// Rename the exposed capabilities.
    pub fn rename(mut self, rename: Rename) -> Self {
        self.rename = rename;
        self
    }

    /// Validate and freeze the settings.
    ///
    /// Secrets are only length-checked here; derivation happens when the
    /// settings are handed to [`crate::Esso::new`].
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] describing the first invalid option.
    pub fn build(self) -> Result<Settings> {
        if self.header_name.is_empty() {
            return Err(ConfigError::EmptyHeaderName);
        }

        let Sources {
            headers,
            query,
            cookies,
        } = self.sources;
        if !headers && !query && !cookies {
            return Err(ConfigError::AllSourcesDisabled);
        }

        let bindings = Bindings::resolve(&self.rename)?;

        match (&self.secret, &self.previous_secret) {
            (None, Some(_)) => return Err(ConfigError::PreviousSecretWithoutSecret),
            (Some(current), previous) => {
                kdf::validate_secret(current)?;
                if let Some(previous) = previous {
                    kdf::validate_secret(previous)?;
                }
            }
            (None, None) => {}
        }

        Ok(Settings {
            header_name: self.header_name.into(),
            sources: self.sources,
            token_prefix: self.token_prefix.map(Into::into),
            extra_validation: self.extra_validation,
            bindings,
            secrets: InitialSecrets {
                current: self.secret,
                previous: self.previous_secret,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::Capability;

    const SECRET: &str = "11111111111111111111";

    #[test]
    fn defaults() {
        let settings = Settings::builder().secret(SECRET).build().unwrap();
        assert_eq!(settings.header_name(), "authorization");
        assert_eq!(settings.token_prefix(), Some("Bearer "));
        assert_eq!(settings.sources(), Sources::default());
        assert_eq!(settings.bindings(), &Bindings::default());
    }

    #[test]
    fn secret_length_checked() {
        assert!(matches!(
            Settings::builder().secret("1").build(),
            Err(ConfigError::SecretTooShort { len: 1, min: 20 })
        ));
        assert!(matches!(
            Settings::builder().secret("").build(),
            Err(ConfigError::SecretTooShort { len: 0, .. })
        ));
        assert!(matches!(
            Settings::builder().secret(SECRET).previous_secret("short").build(),
            Err(ConfigError::SecretTooShort { len: 5, .. })
        ));
    }

    #[test]
    fn previous_secret_needs_secret() {
        assert!(matches!(
            Settings::builder().previous_secret(SECRET).build(),
            Err(ConfigError::PreviousSecretWithoutSecret)
        ));
    }

    #[test]
    fn secret_is_optional() {
        let settings = Settings::builder().build().unwrap();
        assert!(settings.secrets.current.is_none());
    }

    #[test]
    fn empty_header_name_rejected() {
        assert!(matches!(
            Settings::builder().secret(SECRET).header_name("").build(),
            Err(ConfigError::EmptyHeaderName)
        ));
        assert!(Settings::builder()
            .secret(SECRET)
            .header_name("x-auth")
            .build()
            .is_ok());
    }

    #[test]
    fn disabling_every_source_rejected() {
        let result = Settings::builder()
            .secret(SECRET)
            .disable_headers(true)
            .disable_query(true)
            .disable_cookies(true)
            .build();
        assert!(matches!(result, Err(ConfigError::AllSourcesDisabled)));

        let settings = Settings::builder()
            .secret(SECRET)
            .disable_headers(true)
            .disable_query(true)
            .build()
            .unwrap();
        assert_eq!(
            settings.sources(),
            Sources {
                headers: false,
                query: false,
                cookies: true
            }
        );
    }

    #[test]
    fn prefix_can_be_changed_or_disabled() {
        let settings = Settings::builder()
            .secret(SECRET)
            .token_prefix(Some("rickroll "))
            .build()
            .unwrap();
        assert_eq!(settings.token_prefix(), Some("rickroll "));

        let settings = Settings::builder()
            .secret(SECRET)
            .token_prefix(None::<String>)
            .build()
            .unwrap();
        assert_eq!(settings.token_prefix(), None);
    }

    #[test]
    fn rename_errors_surface() {
        let result = Settings::builder()
            .secret(SECRET)
            .rename(Rename {
                auth: Some(String::new()),
                ..Rename::default()
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::EmptyRenameTarget(Capability::Auth))
        ));

        let result = Settings::builder()
            .secret(SECRET)
            .rename(Rename {
                require_authentication: Some("a".into()),
                generate_auth_token: Some("a".into()),
                ..Rename::default()
            })
            .build();
        assert!(matches!(result, Err(ConfigError::CollidingRenameTargets(_))));
    }

    #[test]
    fn debug_never_prints_secrets() {
        let settings = Settings::builder().secret(SECRET).build().unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains(SECRET));
    }

    #[test]
    fn shared_hook_serves_several_settings() {
        use crate::error::Rejection;
        use crate::extract::MapSource;
        use crate::payload::AuthContext;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let hook: Arc<dyn ExtraValidation> = Arc::new(
            move |_: &dyn crate::extract::CredentialSource,
                  _: &AuthContext|
                  -> std::result::Result<(), Rejection> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Rejection::forbidden_with("shared"))
            },
        );

        let a = Settings::builder()
            .extra_validation_arc(hook.clone())
            .build()
            .unwrap();
        let b = Settings::builder()
            .header_name("x-admin")
            .extra_validation_arc(hook)
            .build()
            .unwrap();

        let source = MapSource::new();
        let ctx = AuthContext::default();
        for settings in [&a, &b] {
            assert_eq!(
                settings.extra_validation().validate(&source, &ctx),
                Err(Rejection::forbidden_with("shared"))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
