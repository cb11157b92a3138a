use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Initialize logging. `RUST_LOG` wins over `default_level` when set.
pub fn init(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level '{default_level}'"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("Failed to initialize logging: {err}"))
}
