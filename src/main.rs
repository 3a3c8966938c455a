//! Aquagate CLI - Main entry point.

use aquagate::config::GatewayConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Aquagate - a model-serving gateway for water potability predictions.
#[derive(Parser)]
#[command(name = "aquagate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path; environment variables are used when omitted
    #[arg(short, long, env = "AQUAGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the gateway bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "AQUAGATE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::from_env()?,
    };

    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(log_level) = cli.log_level {
        config.observability.log_level = log_level;
    }

    aquagate::run(config).await?;

    Ok(())
}
