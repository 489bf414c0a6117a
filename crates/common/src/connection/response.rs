use std::fmt;

use crate::error::{AtError, Result};

/// Single byte the server uses as a reply terminator / prompt
pub const TERMINATOR: char = '@';

/// Error kinds a secondary (or root) server can report
///
/// Every known `ATxxxx` code maps to its own kind; anything else is kept
/// as `Unknown` with the original code for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorKind {
    ServerRuntime,
    DataStore,
    InvalidSyntax,
    Socket,
    BufferOverflow,
    OutboundConnectionLimit,
    SecondaryNotFound,
    Handshake,
    Unauthorized,
    InternalServerError,
    InternalServerException,
    InboundConnectionLimit,
    BlockedConnection,
    KeyNotFound,
    InvalidAtKey,
    SecondaryConnect,
    IllegalArgument,
    Timeout,
    ServerPaused,
    Unauthenticated,
    Unknown(String),
}

impl ServerErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "AT0001" => Self::ServerRuntime,
            "AT0002" => Self::DataStore,
            "AT0003" => Self::InvalidSyntax,
            "AT0004" => Self::Socket,
            "AT0005" => Self::BufferOverflow,
            "AT0006" => Self::OutboundConnectionLimit,
            "AT0007" => Self::SecondaryNotFound,
            "AT0008" => Self::Handshake,
            "AT0009" => Self::Unauthorized,
            "AT0010" => Self::InternalServerError,
            "AT0011" => Self::InternalServerException,
            "AT0012" => Self::InboundConnectionLimit,
            "AT0013" => Self::BlockedConnection,
            "AT0015" => Self::KeyNotFound,
            "AT0016" => Self::InvalidAtKey,
            "AT0021" => Self::SecondaryConnect,
            "AT0022" => Self::IllegalArgument,
            "AT0023" => Self::Timeout,
            "AT0024" => Self::ServerPaused,
            "AT0401" => Self::Unauthenticated,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ServerRuntime => "server runtime error",
            Self::DataStore => "data store error",
            Self::InvalidSyntax => "invalid syntax",
            Self::Socket => "socket error",
            Self::BufferOverflow => "buffer overflow",
            Self::OutboundConnectionLimit => "outbound connection limit exceeded",
            Self::SecondaryNotFound => "secondary not found",
            Self::Handshake => "handshake failure",
            Self::Unauthorized => "unauthorized",
            Self::InternalServerError => "internal server error",
            Self::InternalServerException => "internal server exception",
            Self::InboundConnectionLimit => "inbound connection limit exceeded",
            Self::BlockedConnection => "blocked connection",
            Self::KeyNotFound => "key not found",
            Self::InvalidAtKey => "invalid key",
            Self::SecondaryConnect => "secondary connect error",
            Self::IllegalArgument => "illegal argument",
            Self::Timeout => "timeout",
            Self::ServerPaused => "server is paused",
            Self::Unauthenticated => "unauthenticated",
            Self::Unknown(_) => "unrecognized error code",
        };
        f.write_str(name)
    }
}

/// An `error:` reply, decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("server error {code} ({kind}): {message}")]
pub struct ServerError {
    pub kind: ServerErrorKind,
    /// The raw code as sent, e.g. `AT0015`
    pub code: String,
    /// The server's free-text message
    pub message: String,
}

impl ServerError {
    /// Decode `CODE - message` or `CODE:message`
    pub fn decode(payload: &str) -> Self {
        let payload = payload.trim();
        let is_separator = |c: char| c == ':' || c == '-' || c.is_whitespace();
        let code_end = payload.find(is_separator).unwrap_or(payload.len());
        let code = &payload[..code_end];
        let message = payload[code_end..].trim_start_matches(is_separator).trim();
        Self {
            kind: ServerErrorKind::from_code(code),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// A parsed server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Data(String),
    Error(ServerError),
    Notification(String),
}

impl Response {
    /// Parse a complete raw reply
    ///
    /// Strips one trailing terminator byte and surrounding whitespace, then
    /// looks for `data:`, `error:` and `notification` in that priority. The
    /// payload runs to the first newline.
    ///
    /// # Errors
    ///
    /// `MalformedResponse` if none of the three markers is present.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.strip_suffix(TERMINATOR).unwrap_or(raw).trim();

        if let Some(index) = trimmed.find("data:") {
            return Ok(Response::Data(first_line(&trimmed[index + "data:".len()..])));
        }
        if let Some(index) = trimmed.find("error:") {
            let payload = first_line(&trimmed[index + "error:".len()..]);
            return Ok(Response::Error(ServerError::decode(&payload)));
        }
        if let Some(index) = trimmed.find("notification") {
            let rest = &trimmed[index + "notification".len()..];
            let rest = rest.strip_prefix(':').unwrap_or(rest);
            return Ok(Response::Notification(first_line(rest)));
        }
        Err(AtError::MalformedResponse(trimmed.to_string()))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// The data (or notification) payload; an error reply becomes `AtError::Server`
    pub fn into_data(self) -> Result<String> {
        match self {
            Response::Data(payload) | Response::Notification(payload) => Ok(payload),
            Response::Error(error) => Err(error.into()),
        }
    }
}

fn first_line(s: &str) -> String {
    s.split('\n').next().unwrap_or_default().trim_end_matches('\r').to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_data() {
        assert_eq!(
            Response::parse("data:hello\n@").unwrap(),
            Response::Data("hello".to_string())
        );
        // a trailing prompt after the newline is ignored
        assert_eq!(
            Response::parse("data:[\"a@alice\"]\n@alice@").unwrap(),
            Response::Data("[\"a@alice\"]".to_string())
        );
        // a leftover prompt from the previous exchange is skipped over
        assert_eq!(
            Response::parse("@alice@data:success\n").unwrap(),
            Response::Data("success".to_string())
        );
    }

    #[test]
    fn test_parse_error_with_hyphen() {
        let response = Response::parse("error:AT0015 - key not found\n@").unwrap();
        let Response::Error(error) = response else {
            panic!("expected error response");
        };
        assert_eq!(error.kind, ServerErrorKind::KeyNotFound);
        assert_eq!(error.code, "AT0015");
        assert_eq!(error.message, "key not found");
    }

    #[test]
    fn test_parse_error_with_colon() {
        let Response::Error(error) = Response::parse("error:AT0401:Client authentication failed").unwrap()
        else {
            panic!("expected error response");
        };
        assert_eq!(error.kind, ServerErrorKind::Unauthenticated);
        assert_eq!(error.message, "Client authentication failed");
    }

    #[test]
    fn test_unknown_code_keeps_original() {
        let error = ServerError::decode("AT9999-something new");
        assert_eq!(error.kind, ServerErrorKind::Unknown("AT9999".to_string()));
        assert_eq!(error.code, "AT9999");
        assert_eq!(error.message, "something new");
    }

    #[test]
    fn test_parse_notification() {
        assert_eq!(
            Response::parse("notification: {\"id\":\"1\"}\n@").unwrap(),
            Response::Notification(" {\"id\":\"1\"}".to_string())
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            Response::parse("hello there\n@"),
            Err(AtError::MalformedResponse(_))
        ));
        assert!(matches!(Response::parse("@"), Err(AtError::MalformedResponse(_))));
    }

    #[test]
    fn test_every_known_code_is_distinct() {
        let codes = [
            "AT0001", "AT0002", "AT0003", "AT0004", "AT0005", "AT0006", "AT0007", "AT0008",
            "AT0009", "AT0010", "AT0011", "AT0012", "AT0013", "AT0015", "AT0016", "AT0021",
            "AT0022", "AT0023", "AT0024", "AT0401",
        ];
        let kinds: Vec<_> = codes.iter().map(|c| ServerErrorKind::from_code(c)).collect();
        for (i, kind) in kinds.iter().enumerate() {
            assert!(!matches!(kind, ServerErrorKind::Unknown(_)));
            assert!(!kinds[i + 1..].contains(kind));
        }
    }

    #[test]
    fn test_into_data() {
        assert_eq!(Response::Data("x".into()).into_data().unwrap(), "x");
        let err = Response::parse("error:AT0015-gone").unwrap().into_data().unwrap_err();
        assert!(err.is_key_not_found());
    }
}
