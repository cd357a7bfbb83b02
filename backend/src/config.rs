//! Configuration for the esso backend.
//!
//! All configuration is loaded from environment variables (a `.env` file is
//! honoured by the binary). Secrets are held as [`SecretString`] and never
//! logged.

use esso_core::{ConfigError, Rename, Settings};
use secrecy::{ExposeSecret, SecretString};

/// Value of `ESSO_TOKEN_PREFIX` that disables prefix handling.
pub const PREFIX_DISABLED: &str = "none";

/// Server configuration
#[derive(Debug)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,

    /// Server port
    pub port: u16,

    // === Token settings ===
    /// Secret the current key is derived from
    pub secret: Option<SecretString>,

    /// Secret that was current before `secret` (one rotation of grace)
    pub previous_secret: Option<SecretString>,

    /// Header / query parameter / cookie name
    pub header_name: Option<String>,

    /// Reject tokens sent as a header
    pub disable_headers: bool,

    /// Reject tokens sent as a query parameter
    pub disable_query: bool,

    /// Reject tokens sent as a cookie
    pub disable_cookies: bool,

    /// Token prefix; `None` disables it
    pub token_prefix: Option<String>,

    /// Capability renames
    pub rename: Rename,

    // === Demo login ===
    /// Username accepted by `POST /auth`
    pub demo_user: String,

    /// Password accepted by `POST /auth`; login is disabled when unset
    pub demo_password: Option<SecretString>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PORT",
                reason: format!("{raw:?} is not a port number"),
            })?,
            None => 8080,
        };

        let token_prefix = match get("ESSO_TOKEN_PREFIX") {
            Some(raw) if raw == PREFIX_DISABLED => None,
            Some(raw) => Some(raw),
            None => Some(esso_core::DEFAULT_TOKEN_PREFIX.to_string()),
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,

            secret: get("ESSO_SECRET").map(SecretString::new),
            previous_secret: get("ESSO_PREVIOUS_SECRET").map(SecretString::new),
            header_name: get("ESSO_HEADER_NAME"),
            disable_headers: parse_flag(&get, "ESSO_DISABLE_HEADERS")?,
            disable_query: parse_flag(&get, "ESSO_DISABLE_QUERY")?,
            disable_cookies: parse_flag(&get, "ESSO_DISABLE_COOKIES")?,
            token_prefix,
            rename: Rename {
                auth: get("ESSO_RENAME_AUTH"),
                require_authentication: get("ESSO_RENAME_REQUIRE"),
                generate_auth_token: get("ESSO_RENAME_GENERATE"),
            },

            demo_user: get("DEMO_USER").unwrap_or_else(|| "John".to_string()),
            demo_password: get("DEMO_PASSWORD").map(SecretString::new),
        })
    }

    /// Validated token settings.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut builder = Settings::builder()
            .disable_headers(self.disable_headers)
            .disable_query(self.disable_query)
            .disable_cookies(self.disable_cookies)
            .token_prefix(self.token_prefix.clone())
            .rename(self.rename.clone());

        if let Some(name) = &self.header_name {
            builder = builder.header_name(name.clone());
        }
        if let Some(secret) = &self.secret {
            builder = builder.secret(secret.expose_secret().clone());
        }
        if let Some(previous) = &self.previous_secret {
            builder = builder.previous_secret(previous.expose_secret().clone());
        }

        builder.build()
    }
}

/// Parse a boolean flag; unset means `false`.
fn parse_flag<F>(get: &F, var: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(var).as_deref() {
        None | Some("" | "false" | "0") => Ok(false),
        Some("true" | "1") => Ok(true),
        Some(other) => Err(ConfigError::InvalidEnv {
            var,
            reason: format!("{other:?} is not a boolean"),
        }),
    }
}
