use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use super::{loggable, CommandChannel};
use crate::address::Address;
use crate::error::{AtError, Result};

/// Bytes requested from the socket per read
const READ_CHUNK_SIZE: usize = 1024;

/// Anything the channel can speak the protocol over
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send + Sync {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Sync> AsyncStream for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// A TLS connection to a root or secondary server
///
/// Knows nothing about protocol semantics beyond framing: commands are
/// newline terminated and a reply is complete once a read yields a lone
/// `@` or contains a newline. Every read is bounded by `read_timeout`.
pub struct SecureChannel {
    address: Address,
    read_timeout: Duration,
    state: ChannelState,
    stream: Option<Box<dyn AsyncStream>>,
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("address", &self.address)
            .field("state", &self.state)
            .finish()
    }
}

impl SecureChannel {
    pub fn new(address: Address, read_timeout: Duration) -> Self {
        Self {
            address,
            read_timeout,
            state: ChannelState::Disconnected,
            stream: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Open a TLS connection and consume the server's greeting
    ///
    /// No-op when already connected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ChannelState::Connected {
            return Ok(());
        }
        self.state = ChannelState::Connecting;

        let tls_stream = match self.open_tls().await {
            Ok(stream) => stream,
            Err(e) => {
                self.state = ChannelState::Disconnected;
                return Err(e);
            }
        };
        self.attach(tls_stream).await?;
        tracing::info!(address = %self.address, "connected");
        Ok(())
    }

    async fn open_tls(&self) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
        let operation = || AtError::Timeout {
            operation: format!("connect to {}", self.address),
        };

        let tcp_stream = timeout(
            self.read_timeout,
            TcpStream::connect((self.address.host(), self.address.port())),
        )
        .await
        .map_err(|_| operation())??;

        let server_name = rustls::pki_types::ServerName::try_from(self.address.host().to_owned())
            .map_err(|e| AtError::Tls(format!("invalid server name: {}", e)))?;

        timeout(self.read_timeout, tls_connector().connect(server_name, tcp_stream))
            .await
            .map_err(|_| operation())?
            .map_err(|e| AtError::Tls(format!("TLS handshake with {} failed: {}", self.address, e)))
    }

    /// Adopt an already established stream and read the greeting from it
    ///
    /// Used by `connect` once TLS is up, and directly by tests over an
    /// in-memory pipe.
    pub async fn attach<S: AsyncStream + 'static>(&mut self, stream: S) -> Result<()> {
        self.stream = Some(Box::new(stream));
        self.state = ChannelState::Connecting;
        match self.read_reply().await {
            Ok(greeting) => {
                tracing::trace!(greeting = greeting.trim(), "greeting");
                self.state = ChannelState::Connected;
                Ok(())
            }
            Err(e) => {
                self.disconnect().await;
                Err(e)
            }
        }
    }

    /// Close the socket; safe to call repeatedly
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(address = %self.address, "error during shutdown: {}", e);
            }
            tracing::info!(address = %self.address, "disconnected");
        }
        self.state = ChannelState::Disconnected;
    }

    async fn write_command(&mut self, command: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(AtError::NotConnected)?;
        let mut line = command.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        tracing::debug!(address = %self.address, command = %loggable(command), "sent");
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<String> {
        let stream = self.stream.as_mut().ok_or(AtError::NotConnected)?;
        let mut reply = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            let n = timeout(self.read_timeout, stream.read(&mut chunk))
                .await
                .map_err(|_| AtError::Timeout {
                    operation: format!("read from {}", self.address),
                })??;
            if n == 0 {
                if reply.is_empty() {
                    return Err(AtError::Transport(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("connection to {} closed by server", self.address),
                    )));
                }
                break;
            }
            let latest = &chunk[..n];
            reply.extend_from_slice(latest);
            if latest == b"@" || latest.contains(&b'\n') {
                break;
            }
        }

        let reply = String::from_utf8_lossy(&reply).into_owned();
        tracing::debug!(address = %self.address, bytes = reply.len(), "received");
        Ok(reply)
    }
}

#[async_trait]
impl CommandChannel for SecureChannel {
    async fn send(&mut self, command: &str) -> Result<()> {
        self.write_command(command).await
    }

    async fn execute_raw(&mut self, command: &str) -> Result<String> {
        self.write_command(command).await?;
        self.read_reply().await
    }

    fn is_connected(&self) -> bool {
        self.state == ChannelState::Connected
    }

    async fn close(&mut self) {
        self.disconnect().await
    }
}

fn tls_connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
mod test {
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    use super::*;
    use crate::connection::Response;

    fn channel() -> SecureChannel {
        SecureChannel::new(
            "secondary.example:6464".parse().unwrap(),
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn test_greeting_then_round_trip() {
        let (client, server) = duplex(4096);
        let server = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            write.write_all(b"@").await.unwrap();
            let mut lines = BufReader::new(read).lines();
            let command = lines.next_line().await.unwrap().unwrap();
            assert_eq!(command, "from:@alice");
            write.write_all(b"data:_challenge\n@").await.unwrap();
            // keep the pipe open until the client hangs up
            lines.next_line().await.unwrap();
        });

        let mut channel = channel();
        channel.attach(client).await.unwrap();
        assert!(channel.is_connected());

        let response = channel.execute("from:@alice").await.unwrap();
        assert_eq!(response, Response::Data("_challenge".to_string()));

        channel.disconnect().await;
        channel.disconnect().await;
        assert_eq!(channel.state(), ChannelState::Disconnected);
        server.await.unwrap();
    }

    /// Answer one `scan` with `pieces`, pausing between writes so each
    /// lands in its own read
    async fn reply_in_pieces(pieces: Vec<Vec<u8>>) -> SecureChannel {
        let (client, server) = duplex(8192);
        tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            write.write_all(b"@").await.unwrap();
            let mut lines = BufReader::new(read).lines();
            assert_eq!(lines.next_line().await.unwrap().unwrap(), "scan");
            for piece in pieces {
                write.write_all(&piece).await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            lines.next_line().await.ok();
        });

        let mut channel = channel();
        channel.attach(client).await.unwrap();
        channel
    }

    #[tokio::test]
    async fn test_reply_split_across_reads() {
        let mut channel = reply_in_pieces(vec![b"data:".to_vec(), b"hello\n@".to_vec()]).await;
        let response = channel.execute("scan").await.unwrap();
        assert_eq!(response, Response::Data("hello".to_string()));
    }

    #[tokio::test]
    async fn test_reply_longer_than_one_chunk() {
        let payload = "x".repeat(READ_CHUNK_SIZE * 3);
        let mut channel =
            reply_in_pieces(vec![format!("data:{}\n@", payload).into_bytes()]).await;
        let response = channel.execute("scan").await.unwrap();
        assert_eq!(response, Response::Data(payload));
    }

    #[tokio::test]
    async fn test_lone_prompt_ends_partial_reply() {
        let mut channel =
            reply_in_pieces(vec![b"data:".to_vec(), b"abc".to_vec(), b"@".to_vec()]).await;
        let raw = channel.execute_raw("scan").await.unwrap();
        assert_eq!(raw, "data:abc@");
        assert_eq!(
            Response::parse(&raw).unwrap(),
            Response::Data("abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_command_before_connect_fails() {
        let mut channel = channel();
        assert!(matches!(
            channel.execute_raw("scan").await,
            Err(AtError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_read_times_out() {
        let (client, _server) = duplex(64);
        let mut channel = channel();
        let err = channel.attach(client).await.unwrap_err();
        assert!(matches!(err, AtError::Timeout { .. }));
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn test_eof_is_transport_error() {
        let (client, server) = duplex(64);
        drop(server);
        let mut channel = channel();
        assert!(matches!(
            channel.attach(client).await,
            Err(AtError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_send_without_reply() {
        let (client, server) = duplex(4096);
        let mut channel = channel();
        let (read, mut write) = tokio::io::split(server);
        write.write_all(b"@").await.unwrap();
        channel.attach(client).await.unwrap();

        channel.send("noop:0").await.unwrap();
        let mut lines = BufReader::new(read).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "noop:0");
    }
}
