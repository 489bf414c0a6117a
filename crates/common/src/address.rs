use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network endpoint of a root or secondary server
///
/// Canonical string form is `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    host: String,
    port: u16,
}

#[derive(Debug, thiserror::Error)]
#[error("cannot construct address from malformed host:port string '{0}'")]
pub struct AddressParseError(String);

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .split_once(':')
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        if host.is_empty() || port.contains(':') {
            return Err(AddressParseError(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Address::new(host, port))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}
