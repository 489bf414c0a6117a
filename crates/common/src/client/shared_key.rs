//! Pairwise symmetric keys
//!
//! For every (owner, reader) pair the owner creates one AES key, stores it
//! RSA-wrapped under its own public key as `shared_key.<reader>@<owner>`
//! and wrapped under the reader's public key as
//! `@<reader>:shared_key@<owner>`. The reader fetches its copy with
//! `lookup:shared_key@<owner>`.

use crate::atsign::AtSign;
use crate::config::LookupErrorPolicy;
use crate::connection::{loggable, verbs, CommandChannel};
use crate::crypto::{AesKey, CryptoError, PrivateKey, PublicKey};
use crate::error::{AtError, Result};
use crate::keys::{Metadata, SharedKey};

use super::AtClient;

/// Time-to-refresh for the reader's copy of a new pairwise key (24h)
pub const SHARED_KEY_TTR_MS: i64 = 24 * 60 * 60 * 1000;

/// Name of the owner's own copy of the key shared with `reader`
pub fn own_copy_name(reader: &AtSign, owner: &AtSign) -> String {
    format!("shared_key.{}{}", reader.without_prefix(), owner)
}

/// Name of the reader's copy, as written by the owner
pub fn reader_copy_name(reader: &AtSign, owner: &AtSign) -> String {
    format!("{}:shared_key{}", reader, owner)
}

fn wrap(aes_key: &AesKey, public_key: &PublicKey) -> Result<String> {
    Ok(public_key.encrypt_to_base64(aes_key.to_base64().as_bytes())?)
}

fn unwrap_key(wrapped: &str, private_key: &PrivateKey) -> Result<AesKey> {
    let plain = private_key.decrypt_from_base64(wrapped)?;
    let encoded = String::from_utf8(plain)
        .map_err(|e| CryptoError::Decryption(format!("shared key is not valid UTF-8: {}", e)))?;
    Ok(AesKey::from_base64(&encoded)?)
}

impl<C: CommandChannel> AtClient<C> {
    /// The key this atSign uses to encrypt values it shares with `key.shared_with`
    ///
    /// Looks up the owner's copy and creates the pair key on first use.
    /// Once created, repeated calls return the same key.
    pub async fn get_encryption_key_shared_by_me(&mut self, key: &SharedKey) -> Result<AesKey> {
        let command = verbs::llookup(&own_copy_name(&key.shared_with, &self.atsign));
        match self.execute_data(&command).await {
            Ok(wrapped) => unwrap_key(&wrapped, &self.keys.encryption_private_key),
            Err(e) if e.is_key_not_found() => self.create_shared_encryption_key(key).await,
            Err(e) => self.unexpected_lookup_error(&command, e).await,
        }
    }

    /// Generate a fresh pair key and store both wrapped copies
    ///
    /// Concurrent creation by the same owner is last-writer-wins.
    pub async fn create_shared_encryption_key(&mut self, key: &SharedKey) -> Result<AesKey> {
        let reader = key.shared_with.clone();
        tracing::warn!(owner = %self.atsign, %reader, "no shared key found, creating one");

        let their_public_key = self.get_public_encryption_key(&reader).await?;
        let aes_key = AesKey::generate();
        let for_them = wrap(&aes_key, &their_public_key)?;
        let for_us = wrap(&aes_key, &self.keys.encryption_public_key)?;

        // reader's copy first: the owner's copy marks the pair as complete
        let reader_metadata = Metadata {
            ttr: SHARED_KEY_TTR_MS,
            ..Default::default()
        };
        let reader_copy = reader_copy_name(&reader, &self.atsign);
        self.execute_data(&verbs::UpdateVerb::new(&reader_copy, &reader_metadata, &for_them).to_string())
            .await?;

        let own_copy = own_copy_name(&reader, &self.atsign);
        self.execute_data(&verbs::UpdateVerb::new(&own_copy, &Metadata::default(), &for_us).to_string())
            .await?;

        Ok(aes_key)
    }

    /// The key `key.shared_by` uses for values shared with this atSign
    ///
    /// Served from the session cache when possible; a fetched key is cached
    /// only after it decrypts.
    pub async fn get_encryption_key_shared_by_other(&mut self, key: &SharedKey) -> Result<AesKey> {
        let cache_name = key.shared_key_cache_name();
        if let Some(cached) = self.shared_keys.get(&cache_name) {
            return Ok(cached.clone());
        }

        let command = verbs::lookup(&format!("shared_key{}", key.shared_by()));
        let wrapped = match self.execute_data(&command).await {
            Ok(wrapped) => wrapped,
            Err(e) if e.is_key_not_found() => return Err(e),
            Err(e) => return self.unexpected_lookup_error(&command, e).await,
        };

        let aes_key = unwrap_key(&wrapped, &self.keys.encryption_private_key)?;
        self.shared_keys.insert(cache_name, aes_key.clone());
        Ok(aes_key)
    }

    async fn unexpected_lookup_error<T>(&mut self, command: &str, error: AtError) -> Result<T> {
        match self.lookup_error_policy {
            LookupErrorPolicy::Propagate => Err(match error {
                wrapped @ AtError::SecondaryConnect { .. } => wrapped,
                other => AtError::secondary_connect(&loggable(command), other),
            }),
            LookupErrorPolicy::Abort => {
                tracing::error!(command = %loggable(command), "unexpected lookup failure, aborting session: {}", error);
                self.channel.close().await;
                Err(AtError::SessionAborted(format!("{} failed: {}", loggable(command), error)))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_copy_names() {
        let alice = AtSign::new("alice");
        let bob = AtSign::new("bob");
        assert_eq!(own_copy_name(&bob, &alice), "shared_key.bob@alice");
        assert_eq!(reader_copy_name(&bob, &alice), "@bob:shared_key@alice");
    }

    #[test]
    fn test_wrap_round_trip() {
        let private_key = PrivateKey::generate_with_bits(1024).unwrap();
        let aes_key = AesKey::generate();
        let wrapped = wrap(&aes_key, &private_key.public()).unwrap();
        assert_eq!(unwrap_key(&wrapped, &private_key).unwrap(), aes_key);
    }
}
