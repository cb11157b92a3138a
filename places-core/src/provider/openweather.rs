use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::{error::ProviderError, model::Weather, provider::fetch_json};

use super::WeatherProvider;

const PROVIDER: &str = "openweather";
const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: i32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl From<OwCurrentResponse> for Weather {
    fn from(parsed: OwCurrentResponse) -> Self {
        let (description, icon) = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| (w.description, w.icon))
            .unwrap_or_default();

        Weather {
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            description,
            humidity: parsed.main.humidity,
            wind_speed: parsed.wind.speed,
            icon,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self))]
    async fn get_weather(&self, lat: f64, lon: f64) -> Result<Weather, ProviderError> {
        let request = self.http.get(format!("{}/weather", self.base_url)).query(&[
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ]);

        let parsed: OwCurrentResponse = fetch_json(PROVIDER, request).await?;
        Ok(parsed.into())
    }
}
