mod args;
mod op;
mod ops;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Get, Pubkey, Put, Scan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Scan, Scan),
    (Pubkey, Pubkey),
    (Get, Get),
    (Put, Put),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logs go to stderr so command output stays pipeable
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let log_level: tracing::Level = args.log_level.parse().unwrap_or(tracing::Level::WARN);
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();

    let config = match op::resolve_config(args.config, args.root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let ctx = op::OpContext::new(config, args.atsign);

    let result = args.command.execute(&ctx).await;
    // flush buffered logs before exiting
    drop(guard);
    match result {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
