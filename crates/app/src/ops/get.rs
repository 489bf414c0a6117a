use clap::Args;

use common::error::AtError;
use common::keys::AtKey;

use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Get {
    /// Full key string, e.g. `public:location.wavi@alice` or `@bob:phone@alice`
    pub key: AtKey,
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("get {key} failed: {source}")]
    At {
        key: String,
        #[source]
        source: AtError,
    },
}

#[async_trait::async_trait]
impl crate::op::Op for Get {
    type Error = GetError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.connect().await?;
        let value = client.get(&self.key).await;
        client.disconnect().await;
        value.map_err(|source| GetError::At {
            key: self.key.to_string(),
            source,
        })
    }
}
