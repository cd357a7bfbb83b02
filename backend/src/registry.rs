//! Name registry for multiple auth plugins on one server.
//!
//! Each plugin exposes its capabilities under the names its [`Bindings`]
//! resolved. Two plugins may not claim the same function name or auth field.

use std::collections::HashMap;

use esso_core::{Capability, ConfigError};
use tracing::debug;

use crate::auth::AuthPlugin;

/// Registered plugins, addressable by capability name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: HashMap<String, (Capability, AuthPlugin)>,
    fields: HashMap<String, AuthPlugin>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` under its resolved names.
    ///
    /// Nothing is registered if any name is taken.
    pub fn register(&mut self, plugin: AuthPlugin) -> Result<(), ConfigError> {
        let bindings = plugin.bindings();
        let field = bindings.auth_field();
        let functions = [
            Capability::RequireAuthentication,
            Capability::GenerateAuthToken,
        ]
        .map(|capability| (capability, bindings.name(capability).to_string()));

        if self.fields.contains_key(field) || self.functions.contains_key(field) {
            return Err(ConfigError::DuplicateCapability(field.to_string()));
        }
        for (_, name) in &functions {
            if self.functions.contains_key(name) || self.fields.contains_key(name) {
                return Err(ConfigError::DuplicateCapability(name.clone()));
            }
        }

        debug!(
            auth_field = field,
            require = %functions[0].1,
            generate = %functions[1].1,
            "Registered auth plugin"
        );

        self.fields.insert(field.to_string(), plugin.clone());
        for (capability, name) in functions {
            self.functions.insert(name, (capability, plugin.clone()));
        }
        Ok(())
    }

    /// Plugin whose token generator is registered as `name`.
    pub fn issuer(&self, name: &str) -> Option<&AuthPlugin> {
        self.function(name, Capability::GenerateAuthToken)
    }

    /// Plugin whose authentication hook is registered as `name`.
    pub fn installer(&self, name: &str) -> Option<&AuthPlugin> {
        self.function(name, Capability::RequireAuthentication)
    }

    /// Plugin storing its context under `field`.
    pub fn by_auth_field(&self, field: &str) -> Option<&AuthPlugin> {
        self.fields.get(field)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn function(&self, name: &str, capability: Capability) -> Option<&AuthPlugin> {
        self.functions
            .get(name)
            .filter(|(registered, _)| *registered == capability)
            .map(|(_, plugin)| plugin)
    }
}
