//! Cryptographic primitives for the atProtocol client
//!
//! This module provides everything the protocol core needs to authenticate
//! and to keep values end-to-end encrypted:
//!
//! - **Asymmetric keys**: RSA-2048 keypairs. The PKAM pair proves identity to
//!   a secondary server; the encryption pair wraps shared symmetric keys and
//!   signs values.
//! - **Symmetric keys**: AES-256 in CTR mode over PKCS#7-padded plaintext,
//!   used for self keys and for pairwise shared keys.
//! - **CRAM digest**: hex-encoded SHA-512 over `secret || challenge`.
//!
//! # Transport Encodings
//!
//! Every key, ciphertext and signature crosses the wire (and the keystore)
//! as standard-alphabet base64:
//! - private keys are PKCS#8 DER
//! - public keys are X.509 SubjectPublicKeyInfo DER (PKCS#1 is accepted on
//!   decode for older servers)
//! - AES keys are the raw 32 bytes

mod digest;
mod keys;
mod secret;

pub use digest::cram_digest;
pub use keys::{PrivateKey, PublicKey, RSA_KEY_BITS};
pub use secret::{AesKey, AES_KEY_SIZE, IV_SIZE};

/// Errors that can occur during cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Key material could not be decoded or has the wrong shape
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// Encrypting a value or key failed
    #[error("encryption failed: {0}")]
    Encryption(String),
    /// Decrypting a value or key failed (bad base64, wrong key, bad padding)
    #[error("decryption failed: {0}")]
    Decryption(String),
    /// Producing or checking a signature failed
    #[error("signature error: {0}")]
    Signing(String),
}
