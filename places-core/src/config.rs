use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::ProviderId;

/// Configuration for a single provider (API key, optional endpoint override).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Replaces the provider's public base URL, e.g. for a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for every path outside `/api`.
    pub static_dir: PathBuf,
    /// Upper bound for a whole request, including every provider call it makes.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: PathBuf::from("./web"),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout applied to each outgoing provider request.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub search_radius_m: f64,
    /// At most this many detail lookups run at once. `0` means unbounded.
    pub max_concurrent_enrichments: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { search_radius_m: 2000.0, max_concurrent_enrichments: 10 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// places_provider = "foursquare"
///
/// [providers.openweather]
/// api_key = "..."
///
/// [server]
/// port = 8080
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Which places provider to use, e.g. "foursquare" or "geoapify".
    pub places_provider: Option<String>,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,
}

impl Config {
    /// The selected places provider, falling back to Foursquare.
    pub fn places_provider_id(&self) -> Result<ProviderId> {
        let Some(name) = self.places_provider.as_deref() else {
            return Ok(ProviderId::Foursquare);
        };

        let id = ProviderId::try_from(name)?;
        if !id.is_places_provider() {
            return Err(anyhow!(
                "Provider '{id}' cannot be used as places provider.\n\
                 Hint: set `places_provider` to one of: foursquare, geoapify."
            ));
        }

        Ok(id)
    }

    pub fn set_places_provider(&mut self, id: ProviderId) {
        self.places_provider = Some(id.as_str().to_string());
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Load config from an explicit path. A missing file yields the default config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "places", "places")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key. The first configured places provider becomes the selected one.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        let base_url = self.provider_config(provider_id).and_then(|cfg| cfg.base_url.clone());
        self.providers
            .insert(provider_id.as_str().to_string(), ProviderConfig { api_key, base_url });

        if provider_id.is_places_provider() && self.places_provider.is_none() {
            self.places_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some_and(|key| !key.is_empty())
    }

    /// API key for `provider_id`, or an error telling the user how to set one.
    pub fn require_api_key(&self, provider_id: ProviderId) -> Result<&str> {
        self.provider_api_key(provider_id).filter(|key| !key.is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured for provider '{provider_id}'.\n\
                 Hint: run `places configure {provider_id}` and enter your API key."
            )
        })
    }

    pub fn base_url_override(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).and_then(|cfg| cfg.base_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_provider_defaults_to_foursquare() {
        let cfg = Config::default();

        assert_eq!(cfg.places_provider_id().unwrap(), ProviderId::Foursquare);
    }

    #[test]
    fn places_provider_rejects_non_places_provider() {
        let cfg = Config { places_provider: Some("openweather".into()), ..Config::default() };
        let err = cfg.places_provider_id().unwrap_err();

        assert!(err.to_string().contains("cannot be used as places provider"));
    }

    #[test]
    fn upsert_selects_first_places_provider_only() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW".into());
        assert_eq!(cfg.places_provider, None);

        cfg.upsert_provider_api_key(ProviderId::Geoapify, "GEO".into());
        cfg.upsert_provider_api_key(ProviderId::Foursquare, "FSQ".into());

        assert_eq!(cfg.places_provider_id().unwrap(), ProviderId::Geoapify);
        assert!(cfg.is_provider_configured(ProviderId::OpenWeather));
        assert!(cfg.is_provider_configured(ProviderId::Foursquare));
        assert!(!cfg.is_provider_configured(ProviderId::GraphHopper));
    }

    #[test]
    fn upsert_keeps_base_url_override() {
        let mut cfg = Config::default();
        cfg.providers.insert(
            "graphhopper".into(),
            ProviderConfig { api_key: "old".into(), base_url: Some("http://localhost:9000".into()) },
        );

        cfg.upsert_provider_api_key(ProviderId::GraphHopper, "new".into());

        assert_eq!(cfg.provider_api_key(ProviderId::GraphHopper), Some("new"));
        assert_eq!(cfg.base_url_override(ProviderId::GraphHopper), Some("http://localhost:9000"));
    }

    #[test]
    fn require_api_key_hints_at_configure() {
        let err = Config::default().require_api_key(ProviderId::GraphHopper).unwrap_err();

        assert!(err.to_string().contains("places configure graphhopper"));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            places_provider = "geoapify"

            [providers.geoapify]
            api_key = "KEY"

            [server]
            port = 9090

            [aggregation]
            max_concurrent_enrichments = 0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.http.timeout_secs, 10);
        assert_eq!(cfg.aggregation.search_radius_m, 2000.0);
        assert_eq!(cfg.aggregation.max_concurrent_enrichments, 0);
        assert_eq!(cfg.provider_api_key(ProviderId::Geoapify), Some("KEY"));
    }

    #[test]
    fn save_then_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Foursquare, "FSQ".into());
        cfg.server.port = 3000;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server.port, 3000);
        assert_eq!(loaded.places_provider_id().unwrap(), ProviderId::Foursquare);
        assert_eq!(loaded.provider_api_key(ProviderId::Foursquare), Some("FSQ"));
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert!(cfg.providers.is_empty());
    }
}
