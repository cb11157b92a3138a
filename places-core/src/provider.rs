use crate::{
    Config,
    error::ProviderError,
    model::{Location, Place, Weather},
    provider::{
        foursquare::FoursquareProvider, geoapify::GeoapifyProvider,
        graphhopper::GraphHopperProvider, openweather::OpenWeatherProvider,
    },
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, fmt::Debug};

pub mod foursquare;
pub mod geoapify;
pub mod graphhopper;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    GraphHopper,
    OpenWeather,
    Foursquare,
    Geoapify,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::GraphHopper => "graphhopper",
            ProviderId::OpenWeather => "openweather",
            ProviderId::Foursquare => "foursquare",
            ProviderId::Geoapify => "geoapify",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::GraphHopper,
            ProviderId::OpenWeather,
            ProviderId::Foursquare,
            ProviderId::Geoapify,
        ]
    }

    /// Whether this provider can serve nearby search and place details.
    pub fn is_places_provider(&self) -> bool {
        matches!(self, ProviderId::Foursquare | ProviderId::Geoapify)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "graphhopper" => Ok(ProviderId::GraphHopper),
            "openweather" => Ok(ProviderId::OpenWeather),
            "foursquare" => Ok(ProviderId::Foursquare),
            "geoapify" => Ok(ProviderId::Geoapify),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: graphhopper, openweather, foursquare, geoapify."
            )),
        }
    }
}

/// Free-text query to candidate locations.
#[async_trait]
pub trait GeocodingProvider: Send + Sync + Debug {
    async fn get_locations(&self, query: &str) -> Result<Vec<Location>, ProviderError>;
}

/// Coordinate to current weather.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, lat: f64, lon: f64) -> Result<Weather, ProviderError>;
}

/// Nearby points of interest and their details.
#[async_trait]
pub trait PlacesProvider: Send + Sync + Debug {
    /// Summary forms of the places within `radius` meters, in provider order.
    async fn get_places(&self, lat: f64, lon: f64, radius: f64)
    -> Result<Vec<Place>, ProviderError>;

    /// Detailed form of a single place.
    async fn get_place_details(&self, id: &str) -> Result<Place, ProviderError>;
}

/// Build the HTTP client shared by all adapters.
pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(config.http.timeout())
        .user_agent(concat!("places/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

pub fn geocoding_from_config(
    config: &Config,
    http: &Client,
) -> anyhow::Result<Box<dyn GeocodingProvider>> {
    let id = ProviderId::GraphHopper;
    let mut provider = GraphHopperProvider::new(config.require_api_key(id)?.to_owned(), http.clone());
    if let Some(url) = config.base_url_override(id) {
        provider = provider.with_base_url(url);
    }

    Ok(Box::new(provider))
}

pub fn weather_from_config(
    config: &Config,
    http: &Client,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = ProviderId::OpenWeather;
    let mut provider = OpenWeatherProvider::new(config.require_api_key(id)?.to_owned(), http.clone());
    if let Some(url) = config.base_url_override(id) {
        provider = provider.with_base_url(url);
    }

    Ok(Box::new(provider))
}

/// Construct the places provider selected by `places_provider`.
pub fn places_from_config(
    config: &Config,
    http: &Client,
) -> anyhow::Result<Box<dyn PlacesProvider>> {
    let id = config.places_provider_id()?;
    let api_key = config.require_api_key(id)?.to_owned();
    let base_url = config.base_url_override(id);

    let boxed: Box<dyn PlacesProvider> = match id {
        ProviderId::Foursquare => {
            let provider = FoursquareProvider::new(api_key, http.clone());
            Box::new(match base_url {
                Some(url) => provider.with_base_url(url),
                None => provider,
            })
        }
        ProviderId::Geoapify => {
            let provider = GeoapifyProvider::new(api_key, http.clone());
            Box::new(match base_url {
                Some(url) => provider.with_base_url(url),
                None => provider,
            })
        }
        other => anyhow::bail!("Provider '{other}' does not serve places"),
    };

    Ok(boxed)
}

/// Send `request` and decode a successful JSON body into `T`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let res = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    let status = res.status();
    let body = res.text().await.map_err(|source| ProviderError::Transport { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|source| ProviderError::Decode { provider, source })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// One-shot HTTP server for exercising adapters without network access.
#[cfg(test)]
pub(crate) mod stub_server {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    /// Client that never routes through an environment-configured proxy.
    pub(crate) fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    /// Serves a single response and yields the request line it received.
    pub(crate) async fn respond_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {status} STUB\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            request.lines().next().unwrap_or_default().to_string()
        });

        (format!("http://{addr}"), handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde::Deserialize;
    use stub_server::client;

    fn configured() -> Config {
        let mut cfg = Config::default();
        for id in ProviderId::all() {
            cfg.upsert_provider_api_key(*id, format!("{id}-key"));
        }
        cfg
    }

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let parsed = ProviderId::try_from(id.as_str()).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
        assert_eq!(ProviderId::try_from("GeoApify").unwrap(), ProviderId::Geoapify);
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn factories_error_when_missing_api_key() {
        let cfg = Config::default();
        let http = http_client(&cfg).unwrap();

        let err = geocoding_from_config(&cfg, &http).unwrap_err();
        assert!(err.to_string().contains("'graphhopper'"));

        let err = weather_from_config(&cfg, &http).unwrap_err();
        assert!(err.to_string().contains("'openweather'"));

        let err = places_from_config(&cfg, &http).unwrap_err();
        assert!(err.to_string().contains("'foursquare'"));
    }

    #[test]
    fn factories_work_when_configured() {
        let mut cfg = configured();
        let http = http_client(&cfg).unwrap();

        assert!(geocoding_from_config(&cfg, &http).is_ok());
        assert!(weather_from_config(&cfg, &http).is_ok());
        assert!(format!("{:?}", places_from_config(&cfg, &http).unwrap()).contains("Foursquare"));

        cfg.set_places_provider(ProviderId::Geoapify);
        assert!(format!("{:?}", places_from_config(&cfg, &http).unwrap()).contains("Geoapify"));
    }

    #[test]
    fn truncate_body_limits_long_bodies_on_char_boundaries() {
        assert_eq!(truncate_body("short"), "short");

        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.chars().count(), 203);
        assert!(truncated.ends_with("..."));
    }

    #[derive(Debug, Deserialize)]
    struct Echo {
        ok: bool,
    }

    #[tokio::test]
    async fn fetch_json_decodes_success() {
        let (url, server) = stub_server::respond_once(200, r#"{"ok":true}"#).await;

        let echo: Echo = fetch_json("stub", client().get(format!("{url}/ping"))).await.unwrap();

        assert!(echo.ok);
        assert_eq!(server.await.unwrap(), "GET /ping HTTP/1.1");
    }

    #[tokio::test]
    async fn fetch_json_maps_non_success_status() {
        let (url, _server) = stub_server::respond_once(503, "maintenance").await;

        let err = fetch_json::<Echo>("stub", client().get(url)).await.unwrap_err();

        assert!(matches!(err, ProviderError::Status { status: 503, ref body, .. } if body == "maintenance"));
    }

    #[tokio::test]
    async fn fetch_json_maps_malformed_body() {
        let (url, _server) = stub_server::respond_once(200, "<html>").await;

        let err = fetch_json::<Echo>("stub", client().get(url)).await.unwrap_err();

        assert!(matches!(err, ProviderError::Decode { provider: "stub", .. }));
    }

    #[tokio::test]
    async fn fetch_json_maps_connection_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetch_json::<Echo>("stub", client().get(format!("http://{addr}")))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Transport { provider: "stub", .. }));
    }
}
