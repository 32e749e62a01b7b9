//! `reel` binary.

use clap::Parser;
use tracing::error;

use reel_cli::{telemetry, Cli};

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose)?;

    if let Err(e) = reel_cli::run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
