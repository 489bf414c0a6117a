use clap::Args;

use common::atsign::AtSign;
use common::crypto::CryptoError;
use common::error::AtError;

use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Pubkey {
    /// Whose public encryption key to fetch (defaults to --atsign)
    pub atsign: Option<AtSign>,
}

#[derive(Debug, thiserror::Error)]
pub enum PubkeyError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("public key lookup failed: {0}")]
    At(#[from] AtError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::op::Op for Pubkey {
    type Error = PubkeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.connect().await?;
        let target = match &self.atsign {
            Some(atsign) => atsign.clone(),
            None => client.atsign().clone(),
        };
        let key = client.get_public_encryption_key(&target).await;
        client.disconnect().await;
        Ok(key?.to_base64()?)
    }
}
