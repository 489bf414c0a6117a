use crate::connection::{verbs, CommandChannel};
use crate::crypto::{AesKey, CryptoError};
use crate::error::{AtError, Result};
use crate::keys::AtKey;

use super::AtClient;

fn decrypt_value(key: &AesKey, ciphertext: &str, at_key: &AtKey) -> Result<String> {
    let iv = at_key.metadata().iv()?;
    let plain = key.decrypt_from_base64(ciphertext, iv.as_ref())?;
    String::from_utf8(plain)
        .map_err(|e| CryptoError::Decryption(format!("value is not valid UTF-8: {}", e)).into())
}

impl<C: CommandChannel> AtClient<C> {
    /// Fetch and decrypt the value stored under `key`
    ///
    /// Encrypted values are decrypted with the IV from the key's metadata
    /// (zero when unset), so keys from [`AtClient::get_at_keys`] should be
    /// fetched with metadata.
    pub async fn get(&mut self, key: &AtKey) -> Result<String> {
        match key {
            AtKey::Public(_) if key.owner() == &self.atsign => {
                self.execute_data(&verbs::llookup(&key.to_string())).await
            }
            AtKey::Public(base) => {
                let name = format!("{}{}", base.fully_qualified_name(), base.owner());
                self.execute_data(&verbs::plookup(&name)).await
            }
            AtKey::SelfKey(_) => {
                let ciphertext = self.execute_data(&verbs::llookup(&key.to_string())).await?;
                decrypt_value(&self.keys.self_encryption_key, &ciphertext, key)
            }
            AtKey::Shared(shared) if shared.shared_by() == &self.atsign => {
                let ciphertext = self.execute_data(&verbs::llookup(&key.to_string())).await?;
                let shared_key = self.get_encryption_key_shared_by_me(shared).await?;
                decrypt_value(&shared_key, &ciphertext, key)
            }
            AtKey::Shared(shared) if shared.shared_with == self.atsign => {
                let name = format!("{}{}", shared.base.fully_qualified_name(), shared.shared_by());
                let ciphertext = self.execute_data(&verbs::lookup(&name)).await?;
                let shared_key = self.get_encryption_key_shared_by_other(shared).await?;
                decrypt_value(&shared_key, &ciphertext, key)
            }
            AtKey::Shared(shared) => Err(AtError::IllegalArgument(format!(
                "{} is shared between {} and {}, not this client's atSign {}",
                key,
                shared.shared_by(),
                shared.shared_with,
                self.atsign
            ))),
            AtKey::PrivateHidden(_) => Err(AtError::NotImplemented(format!(
                "get for {}",
                key.kind()
            ))),
        }
    }
}
