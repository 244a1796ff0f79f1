mod cli;
mod config;
mod loader;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    //  Logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gguf_inspect=debug"));
    if args.global.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match args.command {
        cli::Commands::Inspect(a) => cli::inspect::execute(args.global, a).await,
        cli::Commands::Scan(a) => cli::scan::execute(args.global, a).await,
        cli::Commands::Tags => cli::tags::execute().await,
        cli::Commands::Config(c) => cli::config_cmd::execute(c).await,
    }
}
