pub use clap::Parser;

use std::path::PathBuf;

use common::address::Address;
use common::atsign::AtSign;

#[derive(Parser, Debug)]
#[command(name = "at")]
#[command(about = "Read and write keys on an atSign's secondary server")]
pub struct Args {
    /// Path to a TOML client config (defaults are used when absent)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory server, overriding the config (host:port)
    #[arg(long, global = true)]
    pub root: Option<Address>,

    /// The atSign to authenticate as
    #[arg(long, global = true)]
    pub atsign: Option<AtSign>,

    /// Default log level; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: crate::Command,
}
