use anyhow::Result;
use clap::Parser;
use tracing::warn;

use autoshort_cli::settings::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = autoshort_cli::cli::Cli::parse();
    init_logger(cli.verbose)?;
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "Could not load .env file");
        }
    }

    autoshort_cli::run(cli).await?;
    Ok(())
}
