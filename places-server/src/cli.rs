use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use places_core::{Aggregator, Config, ProviderId};
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "places", version, about = "Location search backend with weather and nearby places")]
pub struct Cli {
    /// Config file to use instead of the one in the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for a provider, e.g. "graphhopper" or "foursquare".
    Configure {
        /// Provider short name.
        provider: String,
    },

    /// Run the HTTP server. This is the default command.
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Directory with the web front end.
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let mut config = Config::load_from(&config_path)?;

        match self.command.unwrap_or(Command::Serve { host: None, port: None, static_dir: None }) {
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;

                let api_key = Password::new(&format!("API key for {id}:"))
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .without_confirmation()
                    .prompt()
                    .context("Failed to read API key")?;

                config.upsert_provider_api_key(id, api_key.trim().to_string());
                config.save_to(&config_path)?;

                println!("Saved API key for {id} to {}", config_path.display());
                let missing: Vec<_> = [
                    ProviderId::GraphHopper,
                    ProviderId::OpenWeather,
                    config.places_provider_id()?,
                ]
                .into_iter()
                .filter(|id| !config.is_provider_configured(*id))
                .collect();
                if !missing.is_empty() {
                    let names: Vec<_> = missing.iter().map(ProviderId::as_str).collect();
                    println!("Still missing: {}", names.join(", "));
                }
            }
            Command::Serve { host, port, static_dir } => {
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                if let Some(static_dir) = static_dir {
                    config.server.static_dir = static_dir;
                }

                info!(config = %config_path.display(), "loaded configuration");
                let aggregator = Aggregator::from_config(&config)?;
                crate::server::start(&config.server, aggregator).await?;
            }
        }

        Ok(())
    }
}
