//! The authenticated client session
//!
//! An [`AtClient`] owns one authenticated connection to its secondary, the
//! atSign's key material and the cache of decrypted pairwise keys. It
//! serves one caller at a time; every operation is a sequence of blocking
//! command/reply round trips on that connection.

mod cache;
mod get;
mod put;
mod shared_key;

pub use cache::SharedKeyCache;

use crate::atsign::AtSign;
use crate::auth::{Authenticator, PkamAuthenticator};
use crate::config::{ClientConfig, LookupErrorPolicy};
use crate::connection::{loggable, verbs, CommandChannel, Response, SecureChannel};
use crate::crypto::PublicKey;
use crate::directory::DirectoryResolver;
use crate::error::{AtError, Result};
use crate::keys::{AtKey, Metadata};
use crate::keystore::KeyMaterial;

pub struct AtClient<C = SecureChannel> {
    atsign: AtSign,
    keys: KeyMaterial,
    channel: C,
    shared_keys: SharedKeyCache,
    lookup_error_policy: LookupErrorPolicy,
}

impl AtClient<SecureChannel> {
    /// Resolve the atSign's secondary, connect to it and authenticate with PKAM
    pub async fn connect(
        config: &ClientConfig,
        atsign: AtSign,
        keys: KeyMaterial,
        resolver: &mut dyn DirectoryResolver,
    ) -> Result<Self> {
        let address = resolver.resolve(&atsign).await?;
        let mut channel = SecureChannel::new(address, config.read_timeout());
        channel.connect().await?;
        let client = Self::authenticate(channel, atsign, keys)
            .await?
            .with_lookup_error_policy(config.on_unexpected_lookup_error);
        Ok(client)
    }
}

impl<C: CommandChannel> AtClient<C> {
    /// Run PKAM on an already connected channel
    pub async fn authenticate(mut channel: C, atsign: AtSign, keys: KeyMaterial) -> Result<Self> {
        PkamAuthenticator::new(keys.pkam_private_key.clone())
            .authenticate(&mut channel, &atsign)
            .await?;
        Ok(Self {
            atsign,
            keys,
            channel,
            shared_keys: SharedKeyCache::new(),
            lookup_error_policy: LookupErrorPolicy::default(),
        })
    }

    pub fn with_lookup_error_policy(mut self, policy: LookupErrorPolicy) -> Self {
        self.lookup_error_policy = policy;
        self
    }

    pub fn atsign(&self) -> &AtSign {
        &self.atsign
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    pub fn is_authenticated(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn shared_keys(&self) -> &SharedKeyCache {
        &self.shared_keys
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub async fn disconnect(&mut self) {
        self.channel.close().await
    }

    /// Execute on the session channel; wire failures carry the command
    async fn execute(&mut self, command: &str) -> Result<Response> {
        self.channel
            .execute(command)
            .await
            .map_err(|e| AtError::secondary_connect(&loggable(command), e))
    }

    /// Execute and unwrap a `data:` payload; `error:` replies become `AtError::Server`
    async fn execute_data(&mut self, command: &str) -> Result<String> {
        self.execute(command).await?.into_data()
    }

    /// List the keys visible to this atSign, hidden keys excluded
    ///
    /// With `fetch_metadata`, each key's metadata is filled in with one
    /// `llookup:meta:` per key.
    pub async fn get_at_keys(&mut self, regex: Option<&str>, fetch_metadata: bool) -> Result<Vec<AtKey>> {
        let mut scan = verbs::ScanVerb::new().show_hidden(false);
        if let Some(regex) = regex {
            scan = scan.regex(regex);
        }
        let payload = self.execute_data(&scan.to_string()).await?;

        let names: Vec<String> = if payload.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(payload.trim()).map_err(|e| {
                AtError::MalformedResponse(format!("scan returned invalid JSON '{}': {}", payload, e))
            })?
        };

        let mut keys = Vec::with_capacity(names.len());
        for name in names {
            let mut key = AtKey::parse(&name)?;
            if fetch_metadata {
                let json = self.execute_data(&verbs::llookup_meta(&name)).await?;
                let metadata = Metadata::from_json(&json).map_err(|e| {
                    AtError::MalformedResponse(format!("metadata for {} is invalid: {}", name, e))
                })?;
                // keep the flags the key string implied
                let merged = key.metadata().squash(&metadata);
                *key.metadata_mut() = merged;
            }
            keys.push(key);
        }
        tracing::debug!(count = keys.len(), "scanned keys");
        Ok(keys)
    }

    /// Another atSign's public encryption key, via `plookup:publickey@<atsign>`
    pub async fn get_public_encryption_key(&mut self, atsign: &AtSign) -> Result<PublicKey> {
        let encoded = self
            .execute_data(&verbs::plookup_public_key(atsign))
            .await?;
        Ok(PublicKey::from_base64(&encoded)?)
    }

    pub async fn delete(&mut self, key: &AtKey) -> Result<String> {
        self.execute_data(&verbs::delete(&key.to_string())).await
    }
}
