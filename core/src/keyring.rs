//! Token rotation store.
//!
//! Holds the `current` and `previous` derived keys as one immutable
//! [`KeyPair`] behind a single swappable reference. Readers take a snapshot
//! (an `Arc` clone) and work on it without holding the lock, so a validation
//! never sees a new `current` next to a stale `previous`.
//!
//! # Rotation
//!
//! ```text
//! rotate(s1):  current = k1, previous = -
//! rotate(s2):  current = k2, previous = k1   (tokens from s1 still valid)
//! rotate(s3):  current = k3, previous = k2   (tokens from s1 rejected)
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::cipher;
use crate::error::{CipherError, ConfigError, Result};
use crate::kdf::{self, DerivedKey};

/// Immutable `(current, previous)` key pair.
#[derive(Debug, Clone, Default)]
pub struct KeyPair {
    current: Option<DerivedKey>,
    previous: Option<DerivedKey>,
}

impl KeyPair {
    /// Most recently derived key.
    pub fn current(&self) -> Option<&DerivedKey> {
        self.current.as_ref()
    }

    /// Key that was current before the last rotation.
    pub fn previous(&self) -> Option<&DerivedKey> {
        self.previous.as_ref()
    }

    /// Pair obtained by rotating `key` in.
    fn rotated(&self, key: DerivedKey) -> Self {
        Self {
            current: Some(key),
            previous: self.current.clone(),
        }
    }

    /// Keys in the order validation should try them.
    fn candidates(&self) -> impl Iterator<Item = &DerivedKey> {
        self.current.iter().chain(self.previous.iter())
    }
}

/// Why [`KeyRing::open`] failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// No key has ever been derived.
    KeyMissing,
    /// The body is structurally invalid; no key was tried.
    Malformed(CipherError),
    /// Every known key failed to decrypt or decode the body.
    NoKeyAccepted,
}

/// Shared rotation store. Cloning yields another handle to the same keys.
#[derive(Debug, Clone)]
pub struct KeyRing {
    context_label: Arc<str>,
    keys: Arc<RwLock<Arc<KeyPair>>>,
}

impl KeyRing {
    /// Create an empty ring. Keys derived later are salted with `context_label`.
    pub fn new(context_label: impl Into<Arc<str>>) -> Self {
        Self {
            context_label: context_label.into(),
            keys: Arc::new(RwLock::new(Arc::new(KeyPair::default()))),
        }
    }

    /// Context label used as the derivation salt.
    pub fn context_label(&self) -> &str {
        &self.context_label
    }

    /// Consistent view of the current pair.
    pub fn snapshot(&self) -> Arc<KeyPair> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether at least one key has been derived.
    pub fn is_configured(&self) -> bool {
        self.snapshot().current.is_some()
    }

    /// Derive a key from `new_secret` and make it current, demoting the old
    /// current key to previous.
    ///
    /// Derivation runs before the lock is taken; the swap itself is a single
    /// pointer replacement.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SecretTooShort`] if the secret is too short. The
    /// ring is left untouched in that case.
    pub fn rotate(&self, new_secret: &str) -> Result<()> {
        let key = kdf::derive_key(new_secret, &self.context_label)?;
        self.install(key);
        Ok(())
    }

    /// Make an already derived key current.
    pub fn install(&self, key: DerivedKey) {
        let mut guard = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let had_previous = guard.current.is_some();
        let next = Arc::new(guard.rotated(key));
        *guard = next;
        drop(guard);

        if had_previous {
            info!("Rotated token key; previous key kept for fallback");
        } else {
            info!("Installed initial token key");
        }
    }

    /// Encrypt `plaintext` under the current key.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::KeyMissing`] (wrapped) before the first rotation.
    pub fn seal(&self, plaintext: &str) -> std::result::Result<String, crate::error::IssueError> {
        let pair = self.snapshot();
        let key = pair.current().ok_or(ConfigError::KeyMissing)?;
        Ok(cipher::encrypt(key, plaintext)?)
    }

    /// Open a token body, trying `current` then `previous`.
    ///
    /// A key is accepted only if the body decrypts under it **and** `decode`
    /// accepts the plaintext, so a wrong-key decryption that slips past the
    /// padding check still falls through to the next key.
    pub fn open<T, F>(&self, body: &str, mut decode: F) -> std::result::Result<T, OpenError>
    where
        F: FnMut(&str) -> Option<T>,
    {
        let pair = self.snapshot();
        if pair.current.is_none() {
            return Err(OpenError::KeyMissing);
        }

        for (slot, key) in pair.candidates().enumerate() {
            match cipher::decrypt(key, body) {
                Ok(plaintext) => {
                    if let Some(value) = decode(&plaintext) {
                        if slot > 0 {
                            debug!("Token accepted under previous key");
                        }
                        return Ok(value);
                    }
                    debug!(slot, "Token decrypted but payload rejected");
                }
                Err(err) if err.is_structural() => return Err(OpenError::Malformed(err)),
                Err(err) => debug!(slot, error = %err, "Token rejected by key"),
            }
        }

        Err(OpenError::NoKeyAccepted)
    }

    /// Decrypt a token body under `current`, falling back to `previous`.
    pub fn decrypt_with_fallback(&self, body: &str) -> std::result::Result<String, OpenError> {
        self.open(body, |plaintext| Some(plaintext.to_owned()))
    }
}
