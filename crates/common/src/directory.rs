use std::time::Duration;

use async_trait::async_trait;

use crate::address::Address;
use crate::atsign::AtSign;
use crate::connection::{CommandChannel, SecureChannel, TERMINATOR};
use crate::error::{AtError, Result};

/// Maps an atSign to the address of its secondary server
#[async_trait]
pub trait DirectoryResolver: Send {
    async fn resolve(&mut self, atsign: &AtSign) -> Result<Address>;
}

/// Resolver backed by a root directory server
///
/// Connects on first use and keeps the connection for later lookups. The
/// root answers the bare atSign with a raw `host:port` line, or `null`.
pub struct RootDirectory {
    channel: SecureChannel,
}

impl RootDirectory {
    pub fn new(root: Address, read_timeout: Duration) -> Self {
        Self {
            channel: SecureChannel::new(root, read_timeout),
        }
    }

    /// Use an existing channel; a connected one is used as is
    pub fn with_channel(channel: SecureChannel) -> Self {
        Self { channel }
    }
}

/// Parse the raw root reply into an address; `None` for an empty or `null` reply
fn parse_root_reply(raw: &str) -> Result<Option<Address>> {
    let reply = raw.trim().trim_matches(TERMINATOR).trim();
    if reply.is_empty() || reply == "null" {
        return Ok(None);
    }
    Ok(Some(reply.parse()?))
}

#[async_trait]
impl DirectoryResolver for RootDirectory {
    async fn resolve(&mut self, atsign: &AtSign) -> Result<Address> {
        if !self.channel.is_connected() {
            self.channel.connect().await?;
        }
        let raw = self.channel.execute_raw(atsign.without_prefix()).await?;
        let address = parse_root_reply(&raw)?
            .ok_or_else(|| AtError::DirectoryNotFound(atsign.to_string()))?;
        tracing::debug!(%atsign, %address, "resolved secondary");
        Ok(address)
    }
}

/// Always answers with the same address
#[derive(Debug, Clone)]
pub struct StaticResolver(pub Address);

#[async_trait]
impl DirectoryResolver for StaticResolver {
    async fn resolve(&mut self, _atsign: &AtSign) -> Result<Address> {
        Ok(self.0.clone())
    }
}
