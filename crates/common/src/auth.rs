//! Challenge/response authentication against a secondary server
//!
//! Both strategies start with `from:<atsign>`, which yields a challenge in
//! the `data:` payload. CRAM answers with `cram:<hex sha512(secret ++
//! challenge)>`, PKAM with `pkam:<base64 RSA-SHA256 signature>`. A reply
//! starting with `success` authenticates the connection; anything else is
//! `AuthenticationFailed`. Neither strategy retries.

use async_trait::async_trait;

use crate::atsign::AtSign;
use crate::connection::{verbs, CommandChannel, Response};
use crate::crypto::{cram_digest, PrivateKey};
use crate::error::{AtError, Result};

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run the full handshake on a connected channel
    async fn authenticate(&self, channel: &mut dyn CommandChannel, atsign: &AtSign) -> Result<()>;
}

/// Shared-secret authentication, used before an atSign has PKAM keys
pub struct CramAuthenticator {
    secret: String,
}

impl CramAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl Authenticator for CramAuthenticator {
    async fn authenticate(&self, channel: &mut dyn CommandChannel, atsign: &AtSign) -> Result<()> {
        let challenge = request_challenge(channel, atsign).await?;
        let digest = cram_digest(&self.secret, &challenge);
        let reply = channel.execute(&verbs::cram(&digest)).await?;
        expect_success(reply, "cram")?;
        tracing::info!(%atsign, "authenticated (cram)");
        Ok(())
    }
}

/// Public-key authentication with the PKAM private key
pub struct PkamAuthenticator {
    private_key: PrivateKey,
}

impl PkamAuthenticator {
    pub fn new(private_key: PrivateKey) -> Self {
        Self { private_key }
    }
}

#[async_trait]
impl Authenticator for PkamAuthenticator {
    async fn authenticate(&self, channel: &mut dyn CommandChannel, atsign: &AtSign) -> Result<()> {
        let challenge = request_challenge(channel, atsign).await?;
        let signature = self.private_key.sign(challenge.as_bytes())?;
        let reply = channel.execute(&verbs::pkam(&signature)).await?;
        expect_success(reply, "pkam")?;
        tracing::info!(%atsign, "authenticated (pkam)");
        Ok(())
    }
}

async fn request_challenge(channel: &mut dyn CommandChannel, atsign: &AtSign) -> Result<String> {
    if !channel.is_connected() {
        return Err(AtError::NotConnected);
    }
    match channel.execute(&verbs::from(atsign)).await? {
        Response::Data(challenge) => Ok(challenge.trim().to_string()),
        Response::Error(e) => Err(AtError::AuthenticationFailed(format!(
            "from:{} rejected: {}",
            atsign.without_prefix(),
            e
        ))),
        Response::Notification(_) => Err(AtError::AuthenticationFailed(
            "expected a challenge, got a notification".to_string(),
        )),
    }
}

fn expect_success(reply: Response, verb: &str) -> Result<()> {
    match reply {
        Response::Data(payload) if payload.starts_with("success") => Ok(()),
        Response::Data(payload) => Err(AtError::AuthenticationFailed(format!(
            "{} returned '{}'",
            verb, payload
        ))),
        Response::Error(e) => Err(AtError::AuthenticationFailed(format!("{} rejected: {}", verb, e))),
        Response::Notification(_) => Err(AtError::AuthenticationFailed(format!(
            "{} answered with a notification",
            verb
        ))),
    }
}
