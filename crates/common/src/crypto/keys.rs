use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use super::CryptoError;

/// Modulus size used when generating new keypairs
pub const RSA_KEY_BITS: usize = 2048;

/// Public half of an RSA keypair
///
/// Wraps `rsa::RsaPublicKey`. Used to wrap shared symmetric keys for a
/// counterpart (PKCS#1 v1.5 encryption) and to check value signatures.
///
/// # Examples
///
/// ```ignore
/// let private_key = PrivateKey::generate()?;
/// let public_key = private_key.public();
///
/// let wrapped = public_key.encrypt_to_base64(b"aes key bytes")?;
/// let unwrapped = private_key.decrypt_from_base64(&wrapped)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl From<RsaPublicKey> for PublicKey {
    fn from(key: RsaPublicKey) -> Self {
        PublicKey(key)
    }
}

impl PublicKey {
    /// Parse a public key from base64 DER
    ///
    /// Accepts SubjectPublicKeyInfo first and falls back to a bare PKCS#1
    /// `RSAPublicKey` structure.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let der = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("public key base64 decode error: {}", e)))?;
        RsaPublicKey::from_public_key_der(&der)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
            .map(PublicKey)
            .map_err(|e| CryptoError::InvalidKey(format!("public key DER decode error: {}", e)))
    }

    /// Encode as base64 SubjectPublicKeyInfo DER
    pub fn to_base64(&self) -> Result<String, CryptoError> {
        let der = self
            .0
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey(format!("public key DER encode error: {}", e)))?;
        Ok(BASE64.encode(der.as_bytes()))
    }

    /// RSA-encrypt (PKCS#1 v1.5) and base64 the ciphertext
    pub fn encrypt_to_base64(&self, data: &[u8]) -> Result<String, CryptoError> {
        let ciphertext = self
            .0
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, data)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        Ok(BASE64.encode(ciphertext))
    }

    /// Verify a base64 RSA-SHA256 (PKCS#1 v1.5) signature over `msg`
    pub fn verify(&self, msg: &[u8], signature: &str) -> Result<(), CryptoError> {
        let bytes = BASE64
            .decode(signature.trim())
            .map_err(|e| CryptoError::Signing(format!("signature base64 decode error: {}", e)))?;
        let signature = Signature::try_from(bytes.as_slice())
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        VerifyingKey::<Sha256>::new(self.0.clone())
            .verify(msg, &signature)
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }
}

/// Private half of an RSA keypair
///
/// Never leaves the local keystore. Used to sign the PKAM challenge, to
/// sign values on `put`, and to unwrap shared symmetric keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey(RsaPrivateKey);

impl From<RsaPrivateKey> for PrivateKey {
    fn from(key: RsaPrivateKey) -> Self {
        PrivateKey(key)
    }
}

impl PrivateKey {
    /// Generate a new `RSA_KEY_BITS` keypair using the OS RNG
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with_bits(RSA_KEY_BITS)
    }

    /// Generate a keypair with an explicit modulus size
    pub fn generate_with_bits(bits: usize) -> Result<Self, CryptoError> {
        RsaPrivateKey::new(&mut OsRng, bits)
            .map(PrivateKey)
            .map_err(|e| CryptoError::InvalidKey(format!("key generation failed: {}", e)))
    }

    /// Parse a private key from base64 PKCS#8 DER
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let der = BASE64.decode(encoded.trim()).map_err(|e| {
            CryptoError::InvalidKey(format!("private key base64 decode error: {}", e))
        })?;
        RsaPrivateKey::from_pkcs8_der(&der)
            .map(PrivateKey)
            .map_err(|e| CryptoError::InvalidKey(format!("private key DER decode error: {}", e)))
    }

    /// Encode as base64 PKCS#8 DER
    pub fn to_base64(&self) -> Result<String, CryptoError> {
        let der = self
            .0
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidKey(format!("private key DER encode error: {}", e)))?;
        Ok(BASE64.encode(der.as_bytes()))
    }

    /// Derive the public key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }

    /// Decrypt a base64 PKCS#1 v1.5 ciphertext
    pub fn decrypt_from_base64(&self, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        let bytes = BASE64
            .decode(ciphertext.trim())
            .map_err(|e| CryptoError::Decryption(format!("ciphertext base64 decode error: {}", e)))?;
        self.0
            .decrypt(Pkcs1v15Encrypt, &bytes)
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }

    /// Sign `msg` with RSA-SHA256 (PKCS#1 v1.5), returning base64
    pub fn sign(&self, msg: &[u8]) -> Result<String, CryptoError> {
        let signature = SigningKey::<Sha256>::new(self.0.clone())
            .try_sign(msg)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(BASE64.encode(signature.to_bytes()))
    }
}
