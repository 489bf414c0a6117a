use std::error::Error;
use std::path::PathBuf;

use common::address::Address;
use common::atsign::AtSign;
use common::client::AtClient;
use common::config::{ClientConfig, ConfigError};
use common::directory::RootDirectory;
use common::error::AtError;
use common::keystore::{FileKeyStore, KeyStore, KeyStoreError};

/// Build the client config from an optional file and the command line.
///
/// Priority: explicit `--root` flag > config file `root_address` > default.
pub fn resolve_config(
    config_path: Option<PathBuf>,
    root: Option<Address>,
) -> Result<ClientConfig, ConfigError> {
    let mut config = match config_path {
        Some(path) => ClientConfig::load(&path)?,
        None => ClientConfig::default(),
    };
    if let Some(root) = root {
        config.root_address = root;
    }
    Ok(config)
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no atSign given; pass --atsign")]
    MissingAtSign,
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
    #[error(transparent)]
    At(#[from] AtError),
}

#[derive(Clone)]
pub struct OpContext {
    pub config: ClientConfig,
    /// The atSign to act as, when the command needs a session
    pub atsign: Option<AtSign>,
}

impl OpContext {
    pub fn new(config: ClientConfig, atsign: Option<AtSign>) -> Self {
        Self { config, atsign }
    }

    pub fn atsign(&self) -> Result<&AtSign, SessionError> {
        self.atsign.as_ref().ok_or(SessionError::MissingAtSign)
    }

    pub fn keystore(&self) -> Result<FileKeyStore, KeyStoreError> {
        match &self.config.keys_dir {
            Some(dir) => Ok(FileKeyStore::new(dir)),
            None => FileKeyStore::default_location(),
        }
    }

    /// Load keys, locate the secondary and open an authenticated session
    pub async fn connect(&self) -> Result<AtClient, SessionError> {
        let atsign = self.atsign()?.clone();
        let keys = self.keystore()?.load(&atsign)?;
        let mut directory =
            RootDirectory::new(self.config.root_address.clone(), self.config.read_timeout());
        let client = AtClient::connect(&self.config, atsign, keys, &mut directory).await?;
        Ok(client)
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
