use clap::Args;

use common::error::AtError;
use common::keys::AtKey;

use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Full key string; the kind (public, self, shared) follows from its form
    pub key: AtKey,

    pub value: String,

    /// Time-to-live in milliseconds
    #[arg(long)]
    pub ttl: Option<i64>,

    /// Time-to-refresh in milliseconds, for cached copies of shared keys
    #[arg(long)]
    pub ttr: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("put {key} failed: {source}")]
    At {
        key: String,
        #[source]
        source: AtError,
    },
}

impl Put {
    fn key(&self) -> AtKey {
        let mut key = self.key.clone();
        let metadata = key.metadata_mut();
        if let Some(ttl) = self.ttl {
            metadata.ttl = ttl;
        }
        if let Some(ttr) = self.ttr {
            metadata.ttr = ttr;
        }
        key
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Put {
    type Error = PutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let key = self.key();
        let mut client = ctx.connect().await?;
        let result = client.put(&key, &self.value).await;
        client.disconnect().await;
        let commit = result.map_err(|source| PutError::At {
            key: key.to_string(),
            source,
        })?;
        Ok(format!("Stored {} (commit {})", key, commit))
    }
}
