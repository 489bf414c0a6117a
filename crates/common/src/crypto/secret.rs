//! Value encryption using AES-256-CTR
//!
//! Self keys are encrypted under the owner's self-encryption key; shared
//! keys under the pairwise key negotiated for the (writer, reader) pair.
//! Both use the same scheme:
//! - plaintext is PKCS#7 padded to the AES block size
//! - the padded bytes are XORed with the AES-256-CTR keystream
//! - the result is base64 encoded
//!
//! The IV comes from the key's metadata; when none is configured the
//! all-zero IV is used, which is also what the keystore file format uses.

use std::ops::Deref;

use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;

use super::CryptoError;

/// Size of an AES-256 key in bytes
pub const AES_KEY_SIZE: usize = 32;
/// Size of the CTR initial counter block (one AES block)
pub const IV_SIZE: usize = 16;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// A 256-bit symmetric key
///
/// Serialized as base64 of the raw key bytes wherever it is stored or sent.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AesKey([u8; AES_KEY_SIZE]);

impl Deref for AesKey {
    type Target = [u8; AES_KEY_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; AES_KEY_SIZE]> for AesKey {
    fn from(bytes: [u8; AES_KEY_SIZE]) -> Self {
        AesKey(bytes)
    }
}

impl AesKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut buff = [0u8; AES_KEY_SIZE];
        OsRng.fill_bytes(&mut buff);
        Self(buff)
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly `AES_KEY_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() != AES_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "invalid AES key size, expected {}, got {}",
                AES_KEY_SIZE,
                data.len()
            )));
        }
        let mut buff = [0u8; AES_KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Parse a base64 encoded key
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("AES key base64 decode error: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Encode the raw key bytes as base64
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Pad, encrypt and base64 encode `plaintext`
    ///
    /// `iv` of `None` selects the all-zero IV.
    pub fn encrypt_to_base64(
        &self,
        plaintext: &[u8],
        iv: Option<&[u8; IV_SIZE]>,
    ) -> Result<String, CryptoError> {
        let mut buffer = pkcs7_pad(plaintext);
        let mut cipher = self.cipher(iv).map_err(CryptoError::Encryption)?;
        cipher.apply_keystream(&mut buffer);
        Ok(BASE64.encode(buffer))
    }

    /// Inverse of [`AesKey::encrypt_to_base64`]
    pub fn decrypt_from_base64(
        &self,
        ciphertext: &str,
        iv: Option<&[u8; IV_SIZE]>,
    ) -> Result<Vec<u8>, CryptoError> {
        let mut buffer = BASE64
            .decode(ciphertext.trim())
            .map_err(|e| CryptoError::Decryption(format!("ciphertext base64 decode error: {}", e)))?;
        let mut cipher = self.cipher(iv).map_err(CryptoError::Decryption)?;
        cipher.apply_keystream(&mut buffer);
        pkcs7_unpad(buffer)
    }

    fn cipher(&self, iv: Option<&[u8; IV_SIZE]>) -> Result<Aes256Ctr, String> {
        let zero = [0u8; IV_SIZE];
        let iv = iv.unwrap_or(&zero);
        Aes256Ctr::new_from_slices(&self.0, iv).map_err(|e| e.to_string())
    }
}

fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad_len = IV_SIZE - data.len() % IV_SIZE;
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

fn pkcs7_unpad(mut data: Vec<u8>) -> Result<Vec<u8>, CryptoError> {
    if data.is_empty() || data.len() % IV_SIZE != 0 {
        return Err(CryptoError::Decryption(
            "pkcs7: data is empty or not block-aligned".to_string(),
        ));
    }
    let pad_len = data[data.len() - 1] as usize;
    if pad_len == 0
        || pad_len > IV_SIZE
        || !data[data.len() - pad_len..]
            .iter()
            .all(|b| *b as usize == pad_len)
    {
        return Err(CryptoError::Decryption("pkcs7: invalid padding".to_string()));
    }
    data.truncate(data.len() - pad_len);
    Ok(data)
}
