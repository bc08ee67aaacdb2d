use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use line_gemini_gateway::{Config, Gateway};

/// LINE gateway for Gemini conversations and video transcription
#[derive(Parser)]
#[command(name = "line-gemini", version, about)]
struct Cli {
    /// Config file (defaults to <config dir>/line-gemini/config.toml)
    #[arg(short, long, env = "LINE_GEMINI_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,line_gemini_gateway=info",
        1 => "info,line_gemini_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(Command::CheckConfig) = cli.command {
        println!("configuration OK, listening on {}", config.server.bind_addr());
        return Ok(());
    }

    tracing::info!(
        addr = %config.server.bind_addr(),
        "starting LINE gateway"
    );

    let gateway = Gateway::new(config)?;
    gateway.run().await?;

    Ok(())
}
