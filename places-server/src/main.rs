//! Binary crate for the `places` backend.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive provider configuration
//! - Serving the HTTP API and the static front end

use clap::Parser;

mod cli;
mod logging;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init(&cli.log_level)?;
    cli.run().await
}
