mod cli;
mod config;
mod gateway;
mod gemini;
mod markdown;
mod research;
mod session;

pub const USER_AGENT: &str = concat!("scholar/", env!("CARGO_PKG_VERSION"));

use std::process::ExitCode;

use clap::Parser;
use cli::{App, Cli, CliError};
use config::Config;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scholar=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            print!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<String, CliError> {
    let config = Config::load(cli.global.into())?;
    debug!(data_dir = %config.data_dir.display(), lang = ?config.lang, "starting scholar");
    App::new(config)?.run(cli.command).await
}
