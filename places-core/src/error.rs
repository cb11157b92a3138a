use thiserror::Error;

/// Failure of a single third-party provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned status {status}: {body}")]
    Status { provider: &'static str, status: u16, body: String },

    #[error("failed to parse {provider} response: {source}")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} returned no {what}")]
    NotFound { provider: &'static str, what: String },
}

impl ProviderError {
    /// Name of the provider that produced this error.
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Transport { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Decode { provider, .. }
            | ProviderError::NotFound { provider, .. } => provider,
        }
    }
}
