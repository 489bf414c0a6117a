//! Crate-wide error type
//!
//! Lower layers declare their own error enums ([`CryptoError`],
//! [`KeyStoreError`], [`ServerError`]); `AtError` composes them so that
//! every public operation returns a single `Result<T, AtError>`.

use crate::connection::{ServerError, ServerErrorKind};
use crate::crypto::CryptoError;
use crate::keystore::KeyStoreError;

pub type Result<T> = std::result::Result<T, AtError>;

#[derive(Debug, thiserror::Error)]
pub enum AtError {
    /// Socket level failure (connect, read, write, unexpected EOF)
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// TLS configuration or handshake failure
    #[error("TLS error: {0}")]
    Tls(String),

    /// A read or connect deadline expired
    #[error("timed out during {operation}")]
    Timeout { operation: String },

    /// A command was issued on a channel that is not connected
    #[error("not connected")]
    NotConnected,

    /// The server reply did not contain `data:`, `error:` or `notification`
    #[error("malformed response from server: {0}")]
    MalformedResponse(String),

    /// The server answered with `error:<CODE>`
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The `from`/`cram`/`pkam` exchange did not end in `success`
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A key string could not be parsed, or a shared key lacks its counterpart
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// A command failed on the wire; carries the attempted command
    #[error("failed to execute {command}: {source}")]
    SecondaryConnect {
        command: String,
        #[source]
        source: Box<AtError>,
    },

    /// The session was torn down after an unexpected lookup failure
    #[error("session aborted: {0}")]
    SessionAborted(String),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    /// The directory server has no entry for this atSign
    #[error("no secondary server found for {0}")]
    DirectoryNotFound(String),

    #[error(transparent)]
    InvalidAddress(#[from] crate::address::AddressParseError),
}

impl AtError {
    /// Wrap a failure with the command that was being executed
    pub fn secondary_connect(command: &str, source: AtError) -> Self {
        AtError::SecondaryConnect {
            command: command.to_string(),
            source: Box::new(source),
        }
    }

    /// The server error kind, looking through `SecondaryConnect` wrappers
    pub fn server_kind(&self) -> Option<&ServerErrorKind> {
        match self {
            AtError::Server(e) => Some(&e.kind),
            AtError::SecondaryConnect { source, .. } => source.server_kind(),
            _ => None,
        }
    }

    pub fn is_key_not_found(&self) -> bool {
        matches!(self.server_kind(), Some(ServerErrorKind::KeyNotFound))
    }
}
