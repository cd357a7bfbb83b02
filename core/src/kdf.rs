//! Secret-to-key derivation.
//!
//! Keys are derived with scrypt, bound to a context label (the configured
//! header name). The cost parameters match `N = 2^14, r = 8, p = 1`, so a
//! single derivation takes tens of milliseconds and 16 MiB of memory. Run it
//! off the async executor.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ConfigError, Result};

/// Size of a derived key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Minimum secret length, in characters.
pub const MIN_SECRET_LENGTH: usize = 20;

/// scrypt cost: log2(N).
const SCRYPT_LOG_N: u8 = 14;
/// scrypt block size.
const SCRYPT_R: u32 = 8;
/// scrypt parallelism.
const SCRYPT_P: u32 = 1;

/// A 256-bit symmetric key. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Check that a secret is long enough to be used.
pub fn validate_secret(secret: &str) -> Result<()> {
    let len = secret.chars().count();
    if len < MIN_SECRET_LENGTH {
        return Err(ConfigError::SecretTooShort {
            len,
            min: MIN_SECRET_LENGTH,
        });
    }
    Ok(())
}

/// Derive a key from `secret`, salted with `context_label`.
///
/// Deterministic: the same inputs always produce the same key.
///
/// # Errors
///
/// Returns [`ConfigError::SecretTooShort`] if the secret has fewer than
/// [`MIN_SECRET_LENGTH`] characters, [`ConfigError::KeyDerivation`] if scrypt
/// rejects its parameters.
pub fn derive_key(secret: &str, context_label: &str) -> Result<DerivedKey> {
    validate_secret(secret)?;

    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_SIZE)
        .map_err(|_| ConfigError::KeyDerivation("invalid scrypt parameters"))?;

    let mut key = [0u8; KEY_SIZE];
    scrypt::scrypt(
        secret.as_bytes(),
        context_label.as_bytes(),
        &params,
        &mut key,
    )
    .map_err(|_| ConfigError::KeyDerivation("invalid scrypt output length"))?;

    let derived = DerivedKey(key);
    key.zeroize();
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "11111111111111111111";

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_key(SECRET, "authorization").unwrap();
        let b = derive_key(SECRET, "authorization").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn matches_reference_scrypt_output() {
        // Reference scrypt(N = 2^14, r = 8, p = 1, dkLen = 32) output
        let key = derive_key(SECRET, "authorization").unwrap();
        assert_eq!(
            hex::encode(key.as_bytes()),
            "c1206785f5bcb655b610872eb06343756ac841aa4a31238a4a6ec1d4b94ae62e"
        );
    }

    #[test]
    fn context_label_separates_keys() {
        let a = derive_key(SECRET, "authorization").unwrap();
        let b = derive_key(SECRET, "x-auth").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_secrets_different_keys() {
        let a = derive_key(SECRET, "authorization").unwrap();
        let b = derive_key("22222222222222222222", "authorization").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn short_secrets_rejected() {
        assert_eq!(
            derive_key("", "authorization"),
            Err(ConfigError::SecretTooShort { len: 0, min: 20 })
        );
        assert_eq!(
            derive_key("1", "authorization"),
            Err(ConfigError::SecretTooShort { len: 1, min: 20 })
        );
        assert!(derive_key(&"1".repeat(19), "authorization").is_err());
        assert!(derive_key(&"1".repeat(20), "authorization").is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 10 two-byte characters: 20 bytes but only 10 characters
        assert!(validate_secret(&"é".repeat(10)).is_err());
        assert!(validate_secret(&"é".repeat(20)).is_ok());
    }

    #[test]
    fn debug_is_redacted() {
        let key = DerivedKey::from_bytes([7u8; KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
