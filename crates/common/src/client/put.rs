use crate::connection::{verbs, CommandChannel};
use crate::error::{AtError, Result};
use crate::keys::{AtKey, Metadata};

use super::AtClient;

impl<C: CommandChannel> AtClient<C> {
    /// Store `value` under `key`, encrypted as the key's variant requires
    ///
    /// - public: stored in plaintext with a signature
    /// - self: signed, then encrypted under the self-encryption key
    /// - shared: encrypted under the pair key, created on first use; only
    ///   keys owned by this atSign can be written
    /// - private-hidden: not supported
    ///
    /// Returns the server's `data:` payload.
    pub async fn put(&mut self, key: &AtKey, value: &str) -> Result<String> {
        match key {
            AtKey::Public(_) => self.put_public(key, value).await,
            AtKey::SelfKey(_) => self.put_self(key, value).await,
            AtKey::Shared(shared) => {
                if shared.shared_by() != &self.atsign {
                    return Err(AtError::IllegalArgument(format!(
                        "sharedBy is {} but should be this client's atSign {}",
                        shared.shared_by(),
                        self.atsign
                    )));
                }
                let shared_key = self.get_encryption_key_shared_by_me(shared).await?;
                let mut metadata = key.metadata().clone();
                let ciphertext = shared_key.encrypt_to_base64(value.as_bytes(), metadata.iv()?.as_ref())?;
                metadata.is_encrypted = true;
                self.update(key, &metadata, &ciphertext).await
            }
            AtKey::PrivateHidden(_) => Err(AtError::NotImplemented(format!(
                "put for {}",
                key.kind()
            ))),
        }
    }

    async fn put_public(&mut self, key: &AtKey, value: &str) -> Result<String> {
        if value.contains('\n') {
            return Err(AtError::IllegalArgument(
                "public values cannot contain newlines".to_string(),
            ));
        }
        let mut metadata = key.metadata().clone();
        metadata.data_signature = self.keys.encryption_private_key.sign(value.as_bytes())?;
        metadata.is_public = true;
        metadata.is_encrypted = false;
        self.update(key, &metadata, value).await
    }

    async fn put_self(&mut self, key: &AtKey, value: &str) -> Result<String> {
        let mut metadata = key.metadata().clone();
        metadata.data_signature = self.keys.encryption_private_key.sign(value.as_bytes())?;
        let ciphertext = self
            .keys
            .self_encryption_key
            .encrypt_to_base64(value.as_bytes(), metadata.iv()?.as_ref())?;
        metadata.is_encrypted = true;
        self.update(key, &metadata, &ciphertext).await
    }

    async fn update(&mut self, key: &AtKey, metadata: &Metadata, value: &str) -> Result<String> {
        let key_string = key.to_string();
        let command = verbs::UpdateVerb::new(&key_string, metadata, value).to_string();
        let reply = self.execute_data(&command).await?;
        tracing::debug!(key = %key_string, "stored");
        Ok(reply)
    }
}
