//! Token body codec: AES-256-CBC with PKCS#7 padding, hex framing.
//!
//! # Format
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────┐
//! │ IV (16 bytes, 32 hex)    │ Ciphertext (hex, 16n bytes)  │
//! └──────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Every call to [`encrypt`] draws a fresh IV from the system CSPRNG. IV reuse
//! under CBC leaks plaintext equality across tokens, so IVs are never cached.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::CipherError;
use crate::kdf::DerivedKey;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// IV size in bytes.
pub const IV_SIZE: usize = 16;

/// Length of the hex-encoded IV at the start of every token body.
pub const IV_HEX_LEN: usize = IV_SIZE * 2;

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

/// Encrypt `plaintext` under `key`, returning `hex(iv) || hex(ciphertext)`.
///
/// # Errors
///
/// Returns [`CipherError::Entropy`] if the system RNG is unavailable.
pub fn encrypt(key: &DerivedKey, plaintext: &str) -> Result<String, CipherError> {
    let mut iv = [0u8; IV_SIZE];
    SystemRandom::new()
        .fill(&mut iv)
        .map_err(|_| CipherError::Entropy)?;

    let ciphertext = Aes256CbcEnc::new(
        GenericArray::from_slice(key.as_bytes()),
        GenericArray::from_slice(&iv),
    )
    .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut body = String::with_capacity(IV_HEX_LEN + ciphertext.len() * 2);
    body.push_str(&hex::encode(iv));
    body.push_str(&hex::encode(ciphertext));
    Ok(body)
}

/// Decrypt a token body produced by [`encrypt`].
///
/// # Errors
///
/// - [`CipherError::TooShort`] if the body cannot contain an IV
/// - [`CipherError::InvalidHex`] if IV or ciphertext is not valid hex
/// - [`CipherError::Decrypt`] if the ciphertext is not block-aligned or the
///   padding check fails (wrong key, tampering)
/// - [`CipherError::InvalidUtf8`] if the plaintext is not UTF-8
pub fn decrypt(key: &DerivedKey, body: &str) -> Result<String, CipherError> {
    if body.len() < IV_HEX_LEN {
        return Err(CipherError::TooShort { len: body.len() });
    }
    // Non-ASCII input could split a character at the IV boundary
    if !body.is_ascii() {
        return Err(CipherError::InvalidHex);
    }

    let (iv_hex, ciphertext_hex) = body.split_at(IV_HEX_LEN);

    let mut iv = [0u8; IV_SIZE];
    hex::decode_to_slice(iv_hex, &mut iv).map_err(|_| CipherError::InvalidHex)?;
    let ciphertext = hex::decode(ciphertext_hex).map_err(|_| CipherError::InvalidHex)?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::Decrypt);
    }

    let plaintext = Aes256CbcDec::new(
        GenericArray::from_slice(key.as_bytes()),
        GenericArray::from_slice(&iv),
    )
    .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
    .map_err(|_| CipherError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
}
