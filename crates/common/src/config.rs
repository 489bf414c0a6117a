use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::Address;

pub const DEFAULT_ROOT_ADDRESS: &str = "root.atsign.org:64";
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// What to do when fetching a shared key fails with anything other than
/// "key not found"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupErrorPolicy {
    /// Return the error to the caller, wrapped with the failed command
    #[default]
    Propagate,
    /// Disconnect the session and fail with `SessionAborted`
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Directory server used to locate secondaries
    #[serde(default = "default_root_address")]
    pub root_address: Address,
    /// Deadline applied to every socket read, in seconds
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Where `<@atsign>_key.atKeys` files live (defaults to ~/.atsign/keys)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys_dir: Option<PathBuf>,
    #[serde(default)]
    pub on_unexpected_lookup_error: LookupErrorPolicy,
}

fn default_root_address() -> Address {
    Address::new("root.atsign.org", 64)
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            root_address: default_root_address(),
            read_timeout_secs: default_read_timeout_secs(),
            keys_dir: None,
            on_unexpected_lookup_error: LookupErrorPolicy::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ClientConfig {
    /// Load a TOML config file; absent fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
