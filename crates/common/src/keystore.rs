//! Local key material
//!
//! A session needs five keys: the PKAM keypair (authentication), the
//! encryption keypair (wrapping shared keys, signing values) and the
//! self-encryption AES key. [`FileKeyStore`] reads and writes them in the
//! `<@atsign>_key.atKeys` JSON format, where each RSA key is stored
//! AES-encrypted under the plaintext self-encryption key.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::atsign::AtSign;
use crate::crypto::{AesKey, CryptoError, PrivateKey, PublicKey};

pub const KEYS_FILE_SUFFIX: &str = "_key.atKeys";

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("no keys file for {atsign} at {path}")]
    NotFound { atsign: AtSign, path: PathBuf },
    #[error("could not determine home directory")]
    NoHomeDirectory,
    #[error("keys file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed keys file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("bad {name} in keys file: {source}")]
    Key {
        name: &'static str,
        #[source]
        source: CryptoError,
    },
}

/// Everything an authenticated session needs
#[derive(Clone)]
pub struct KeyMaterial {
    pub pkam_public_key: PublicKey,
    pub pkam_private_key: PrivateKey,
    pub encryption_public_key: PublicKey,
    pub encryption_private_key: PrivateKey,
    pub self_encryption_key: AesKey,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Fresh keys for a new atSign
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with_bits(crate::crypto::RSA_KEY_BITS)
    }

    pub fn generate_with_bits(bits: usize) -> Result<Self, CryptoError> {
        let pkam_private_key = PrivateKey::generate_with_bits(bits)?;
        let encryption_private_key = PrivateKey::generate_with_bits(bits)?;
        Ok(Self {
            pkam_public_key: pkam_private_key.public(),
            pkam_private_key,
            encryption_public_key: encryption_private_key.public(),
            encryption_private_key,
            self_encryption_key: AesKey::generate(),
        })
    }
}

/// Source of an atSign's key material
pub trait KeyStore {
    fn load(&self, atsign: &AtSign) -> Result<KeyMaterial, KeyStoreError>;
}

// On-disk shape; the four RSA keys are AES-encrypted base64
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeysFile {
    aes_pkam_public_key: String,
    aes_pkam_private_key: String,
    aes_encrypt_public_key: String,
    aes_encrypt_private_key: String,
    self_encryption_key: String,
}

/// Keys files in a directory, `~/.atsign/keys` by default
///
/// Loading also searches any fallback directories, in order; saving
/// always writes to the primary one.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
    fallback_dirs: Vec<PathBuf>,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallback_dirs: Vec::new(),
        }
    }

    /// `~/.atsign/keys`, falling back to the legacy `./keys`
    pub fn default_location() -> Result<Self, KeyStoreError> {
        let home = dirs::home_dir().ok_or(KeyStoreError::NoHomeDirectory)?;
        let store = Self::new(home.join(".atsign").join("keys"));
        Ok(match std::env::current_dir() {
            Ok(cwd) => store.with_fallback(cwd.join("keys")),
            Err(_) => store,
        })
    }

    pub fn with_fallback(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dirs.push(dir.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, atsign: &AtSign) -> PathBuf {
        keys_file(&self.dir, atsign)
    }

    /// The first existing keys file for `atsign`, primary directory first
    pub fn locate(&self, atsign: &AtSign) -> Option<PathBuf> {
        std::iter::once(&self.dir)
            .chain(self.fallback_dirs.iter())
            .map(|dir| keys_file(dir, atsign))
            .find(|path| path.exists())
    }

    /// Write `keys` for `atsign`, creating the directory if needed
    pub fn save(&self, atsign: &AtSign, keys: &KeyMaterial) -> Result<PathBuf, KeyStoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let self_key = &keys.self_encryption_key;
        let seal = |name: &'static str, plain: Result<String, CryptoError>| {
            plain
                .and_then(|plain| self_key.encrypt_to_base64(plain.as_bytes(), None))
                .map_err(|source| KeyStoreError::Key { name, source })
        };
        let file = KeysFile {
            aes_pkam_public_key: seal("aesPkamPublicKey", keys.pkam_public_key.to_base64())?,
            aes_pkam_private_key: seal("aesPkamPrivateKey", keys.pkam_private_key.to_base64())?,
            aes_encrypt_public_key: seal(
                "aesEncryptPublicKey",
                keys.encryption_public_key.to_base64(),
            )?,
            aes_encrypt_private_key: seal(
                "aesEncryptPrivateKey",
                keys.encryption_private_key.to_base64(),
            )?,
            self_encryption_key: self_key.to_base64(),
        };

        let path = self.path_for(atsign);
        std::fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        tracing::info!(%atsign, path = %path.display(), "saved keys");
        Ok(path)
    }
}

fn keys_file(dir: &Path, atsign: &AtSign) -> PathBuf {
    dir.join(format!("{}{}", atsign, KEYS_FILE_SUFFIX))
}

fn unseal(self_key: &AesKey, name: &'static str, sealed: &str) -> Result<String, KeyStoreError> {
    let plain = self_key
        .decrypt_from_base64(sealed, None)
        .map_err(|source| KeyStoreError::Key { name, source })?;
    String::from_utf8(plain).map_err(|e| KeyStoreError::Key {
        name,
        source: CryptoError::Decryption(format!("key is not valid UTF-8: {}", e)),
    })
}

impl KeyStore for FileKeyStore {
    fn load(&self, atsign: &AtSign) -> Result<KeyMaterial, KeyStoreError> {
        let path = self.locate(atsign).ok_or_else(|| KeyStoreError::NotFound {
            atsign: atsign.clone(),
            path: self.path_for(atsign),
        })?;
        let file: KeysFile = serde_json::from_str(&std::fs::read_to_string(&path)?)?;

        let self_encryption_key = AesKey::from_base64(&file.self_encryption_key).map_err(|source| {
            KeyStoreError::Key {
                name: "selfEncryptionKey",
                source,
            }
        })?;

        let public = |name: &'static str, sealed: &str| {
            let plain = unseal(&self_encryption_key, name, sealed)?;
            PublicKey::from_base64(&plain).map_err(|source| KeyStoreError::Key { name, source })
        };
        let private = |name: &'static str, sealed: &str| {
            let plain = unseal(&self_encryption_key, name, sealed)?;
            PrivateKey::from_base64(&plain).map_err(|source| KeyStoreError::Key { name, source })
        };

        let keys = KeyMaterial {
            pkam_public_key: public("aesPkamPublicKey", &file.aes_pkam_public_key)?,
            pkam_private_key: private("aesPkamPrivateKey", &file.aes_pkam_private_key)?,
            encryption_public_key: public("aesEncryptPublicKey", &file.aes_encrypt_public_key)?,
            encryption_private_key: private("aesEncryptPrivateKey", &file.aes_encrypt_private_key)?,
            self_encryption_key: self_encryption_key.clone(),
        };
        tracing::debug!(%atsign, path = %path.display(), "loaded keys");
        Ok(keys)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keys_file_field_names() {
        let json = serde_json::to_value(KeysFile {
            aes_pkam_public_key: "a".into(),
            aes_pkam_private_key: "b".into(),
            aes_encrypt_public_key: "c".into(),
            aes_encrypt_private_key: "d".into(),
            self_encryption_key: "e".into(),
        })
        .unwrap();
        for field in [
            "aesPkamPublicKey",
            "aesPkamPrivateKey",
            "aesEncryptPublicKey",
            "aesEncryptPrivateKey",
            "selfEncryptionKey",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_path_for() {
        let store = FileKeyStore::new("/keys");
        assert_eq!(
            store.path_for(&AtSign::new("alice")),
            PathBuf::from("/keys/@alice_key.atKeys")
        );
    }
}
