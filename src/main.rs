// Allowlist - capped on-chain membership registry
// Main entry point

use anyhow::Result;
use clap::Parser;

use allowlist::cli::{self, Cli};
use allowlist::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    cli::run(cli).await
}
