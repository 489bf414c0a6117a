use clap::Args;

use common::error::AtError;
use common::keys::AtKey;

use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Scan {
    /// Only list keys matching this regex
    pub regex: Option<String>,

    /// Fetch and print each key's metadata as JSON
    #[arg(long)]
    pub metadata: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("scan failed: {0}")]
    At(#[from] AtError),
    #[error("failed to render metadata: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Scan {
    type Error = ScanError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.connect().await?;
        let keys = client
            .get_at_keys(self.regex.as_deref(), self.metadata)
            .await;
        client.disconnect().await;
        let keys = keys?;

        if keys.is_empty() {
            return Ok("No keys found".to_string());
        }
        let lines = keys
            .iter()
            .map(|key| render(key, self.metadata))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    }
}

fn render(key: &AtKey, with_metadata: bool) -> Result<String, serde_json::Error> {
    if !with_metadata {
        return Ok(key.to_string());
    }
    Ok(format!("{} {}", key, serde_json::to_string(key.metadata())?))
}
