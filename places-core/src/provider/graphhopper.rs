use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::ProviderError,
    model::{Location, non_empty},
    provider::fetch_json,
};

use super::GeocodingProvider;

const PROVIDER: &str = "graphhopper";
const DEFAULT_BASE_URL: &str = "https://graphhopper.com/api/1";

#[derive(Debug, Clone)]
pub struct GraphHopperProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl GraphHopperProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GhPoint {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GhHit {
    point: GhPoint,
    #[serde(default)]
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    city: String,
}

#[derive(Debug, Deserialize)]
struct GhResponse {
    #[serde(default)]
    hits: Vec<GhHit>,
}

fn into_locations(response: GhResponse) -> Vec<Location> {
    response
        .hits
        .into_iter()
        .map(|hit| {
            let name = if hit.name.is_empty() { hit.city } else { hit.name };
            Location {
                name,
                latitude: hit.point.lat,
                longitude: hit.point.lng,
                country: non_empty(hit.country),
                state: non_empty(hit.state),
            }
        })
        .collect()
}

#[async_trait]
impl GeocodingProvider for GraphHopperProvider {
    #[instrument(skip(self))]
    async fn get_locations(&self, query: &str) -> Result<Vec<Location>, ProviderError> {
        let request = self.http.get(format!("{}/geocode", self.base_url)).query(&[
            ("q", query),
            ("key", self.api_key.as_str()),
            ("limit", "10"),
        ]);

        let locations = into_locations(fetch_json(PROVIDER, request).await?);
        debug!(count = locations.len(), "geocoded");

        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub_server;

    #[test]
    fn hits_map_to_locations_in_order() {
        let response: GhResponse = serde_json::from_str(
            r#"{"hits":[
                {"point":{"lat":48.8566,"lng":2.3522},"name":"Paris","country":"France","state":"Ile-de-France"},
                {"point":{"lat":33.66,"lng":-95.55},"name":"","city":"Paris","country":"United States"},
                {"point":{"lat":1.0,"lng":2.0},"name":"Nowhere"}
            ]}"#,
        )
        .unwrap();

        let locations = into_locations(response);

        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0].name, "Paris");
        assert_eq!(locations[0].state.as_deref(), Some("Ile-de-France"));
        assert_eq!(locations[1].name, "Paris");
        assert_eq!(locations[1].longitude, -95.55);
        assert_eq!(locations[2].country, None);
        assert_eq!(locations[2].state, None);
    }

    #[test]
    fn missing_hits_is_empty() {
        let response: GhResponse = serde_json::from_str("{}").unwrap();
        assert!(into_locations(response).is_empty());
    }

    #[tokio::test]
    async fn sends_query_and_key() {
        let (url, server) = stub_server::respond_once(
            200,
            r#"{"hits":[{"point":{"lat":59.33,"lng":18.07},"name":"Stockholm"}]}"#,
        )
        .await;
        let provider = GraphHopperProvider::new("KEY".into(), stub_server::client()).with_base_url(&url);

        let locations = provider.get_locations("stockholm").await.unwrap();

        assert_eq!(locations, vec![Location::new("Stockholm", 59.33, 18.07)]);
        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /geocode?q=stockholm&key=KEY&limit=10"));
    }

    #[tokio::test]
    async fn unauthorized_is_status_error() {
        let (url, _server) = stub_server::respond_once(401, r#"{"message":"Wrong credentials"}"#).await;
        let provider = GraphHopperProvider::new("BAD".into(), stub_server::client()).with_base_url(&url);

        let err = provider.get_locations("x").await.unwrap_err();

        assert!(matches!(err, ProviderError::Status { provider: "graphhopper", status: 401, .. }));
    }
}
