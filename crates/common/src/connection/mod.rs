//! Wire protocol: command framing, reply parsing and the server error taxonomy
//!
//! One command, one reply. A [`CommandChannel`] carries exactly one in-flight
//! command at a time; callers sharing a session must serialize access.

mod channel;
mod response;
pub mod verbs;

use async_trait::async_trait;

pub use channel::{AsyncStream, ChannelState, SecureChannel};
pub use response::{Response, ServerError, ServerErrorKind, TERMINATOR};

use crate::error::Result;

/// A connected command/reply pipe to a server
///
/// Implemented by [`SecureChannel`] over TLS; tests substitute scripted
/// in-memory servers.
#[async_trait]
pub trait CommandChannel: Send {
    /// Write a command without waiting for a reply
    async fn send(&mut self, command: &str) -> Result<()>;

    /// Write a command and return the raw reply text, unparsed
    ///
    /// The root server answers with bare `host:port` lines, so directory
    /// lookups go through here rather than [`CommandChannel::execute`].
    async fn execute_raw(&mut self, command: &str) -> Result<String>;

    /// Write a command and parse the reply
    async fn execute(&mut self, command: &str) -> Result<Response> {
        let raw = self.execute_raw(command).await?;
        Response::parse(&raw)
    }

    fn is_connected(&self) -> bool;

    /// Tear the connection down; further commands fail until reconnected
    async fn close(&mut self);
}

/// Render a command for logs with secrets and values elided
pub(crate) fn loggable(command: &str) -> String {
    let command = command.trim_end();
    for verb in ["cram:", "pkam:"] {
        if command.starts_with(verb) {
            return format!("{}<redacted>", verb);
        }
    }
    match command.split_once(' ') {
        Some((head, value)) => format!("{} <{} bytes>", head, value.len()),
        None => command.to_string(),
    }
}
