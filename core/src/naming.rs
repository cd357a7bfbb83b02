//! Capability naming.
//!
//! The three host-facing capabilities (the auth context field, the
//! authentication hook installer, and the token issuer) are exposed under
//! configurable names, so several independent instances can coexist in one
//! process. Names are resolved once into [`Bindings`] and never re-resolved
//! per request.

use std::fmt;

use crate::error::{ConfigError, Result};

/// Canonical identifiers of the exposed capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Request field holding the authenticated context.
    Auth,
    /// Installs the validation hook on a request-processing scope.
    RequireAuthentication,
    /// Issues tokens.
    GenerateAuthToken,
}

impl Capability {
    /// All capabilities, in declaration order.
    pub const ALL: [Capability; 3] = [
        Capability::Auth,
        Capability::RequireAuthentication,
        Capability::GenerateAuthToken,
    ];

    /// Default external name.
    pub const fn canonical_name(self) -> &'static str {
        match self {
            Capability::Auth => "auth",
            Capability::RequireAuthentication => "requireAuthentication",
            Capability::GenerateAuthToken => "generateAuthToken",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Requested renames. Unset entries keep their canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rename {
    /// External name of the auth context field.
    pub auth: Option<String>,
    /// External name of the hook installer.
    pub require_authentication: Option<String>,
    /// External name of the issuer.
    pub generate_auth_token: Option<String>,
}

impl Rename {
    fn get(&self, capability: Capability) -> Option<&str> {
        match capability {
            Capability::Auth => self.auth.as_deref(),
            Capability::RequireAuthentication => self.require_authentication.as_deref(),
            Capability::GenerateAuthToken => self.generate_auth_token.as_deref(),
        }
    }
}

/// Resolved, validated capability names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    auth: String,
    require_authentication: String,
    generate_auth_token: String,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            auth: Capability::Auth.canonical_name().to_owned(),
            require_authentication: Capability::RequireAuthentication
                .canonical_name()
                .to_owned(),
            generate_auth_token: Capability::GenerateAuthToken.canonical_name().to_owned(),
        }
    }
}

impl Bindings {
    /// Merge `rename` over the canonical names and validate the result.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyRenameTarget`] if any name is empty
    /// - [`ConfigError::CollidingRenameTargets`] if installer and issuer share a name
    pub fn resolve(rename: &Rename) -> Result<Self> {
        let pick = |capability: Capability| -> Result<String> {
            let name = rename
                .get(capability)
                .unwrap_or(capability.canonical_name());
            if name.is_empty() {
                return Err(ConfigError::EmptyRenameTarget(capability));
            }
            Ok(name.to_owned())
        };

        let bindings = Self {
            auth: pick(Capability::Auth)?,
            require_authentication: pick(Capability::RequireAuthentication)?,
            generate_auth_token: pick(Capability::GenerateAuthToken)?,
        };

        if bindings.require_authentication == bindings.generate_auth_token {
            return Err(ConfigError::CollidingRenameTargets(
                bindings.generate_auth_token,
            ));
        }

        Ok(bindings)
    }

    /// External name bound to `capability`.
    pub fn name(&self, capability: Capability) -> &str {
        match capability {
            Capability::Auth => &self.auth,
            Capability::RequireAuthentication => &self.require_authentication,
            Capability::GenerateAuthToken => &self.generate_auth_token,
        }
    }

    /// Auth context field name.
    pub fn auth_field(&self) -> &str {
        &self.auth
    }

    /// Reverse lookup of a function name.
    ///
    /// Only the two functions are looked up; the auth field lives in a separate
    /// namespace (request fields) and may share a name with them.
    pub fn lookup(&self, name: &str) -> Option<Capability> {
        [
            Capability::RequireAuthentication,
            Capability::GenerateAuthToken,
        ]
        .into_iter()
        .find(|capability| self.name(*capability) == name)
    }

    /// The two function names this instance exposes.
    pub fn function_names(&self) -> [&str; 2] {
        [&self.require_authentication, &self.generate_auth_token]
    }
}
