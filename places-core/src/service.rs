//! Location aggregation.
//!
//! [`Aggregator::build_location_result`] fetches weather and nearby places for
//! one location at the same time, then looks up details for every place. A
//! failing provider degrades the result instead of failing the call.
//!
//! Every provider call is a child future of the call that issued it; nothing
//! is spawned onto the runtime. Dropping the returned future (client gone,
//! request timeout) therefore aborts all outstanding lookups.

use std::sync::Arc;

use futures::{StreamExt, future, stream};
use tracing::{debug, info, instrument, warn};

use crate::{
    Config,
    config::AggregationConfig,
    error::ProviderError,
    model::{Location, LocationResult, Place},
    provider::{
        self, GeocodingProvider, PlacesProvider, WeatherProvider, geocoding_from_config,
        places_from_config, weather_from_config,
    },
};

/// Tuning for [`Aggregator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorOptions {
    /// Nearby search radius in meters.
    pub search_radius_m: f64,
    /// Upper bound on concurrent detail lookups per request. `0` means unbounded.
    pub max_concurrent_enrichments: usize,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        AggregationConfig::default().into()
    }
}

impl From<AggregationConfig> for AggregatorOptions {
    fn from(config: AggregationConfig) -> Self {
        Self {
            search_radius_m: config.search_radius_m,
            max_concurrent_enrichments: config.max_concurrent_enrichments,
        }
    }
}

/// Combines geocoding, weather and places providers.
///
/// Holds no per-request state, so one instance can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct Aggregator {
    geocoding: Arc<dyn GeocodingProvider>,
    weather: Arc<dyn WeatherProvider>,
    places: Arc<dyn PlacesProvider>,
    options: AggregatorOptions,
}

impl Aggregator {
    pub fn new(
        geocoding: Arc<dyn GeocodingProvider>,
        weather: Arc<dyn WeatherProvider>,
        places: Arc<dyn PlacesProvider>,
    ) -> Self {
        Self { geocoding, weather, places, options: AggregatorOptions::default() }
    }

    pub fn with_options(mut self, options: AggregatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> AggregatorOptions {
        self.options
    }

    /// Build all providers described by `config` on one shared HTTP client.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = provider::http_client(config)?;

        Ok(Self::new(
            geocoding_from_config(config, &http)?.into(),
            weather_from_config(config, &http)?.into(),
            places_from_config(config, &http)?.into(),
        )
        .with_options(config.aggregation.clone().into()))
    }

    /// Candidate locations for a free-text query.
    #[instrument(skip(self))]
    pub async fn resolve_locations(&self, query: &str) -> Result<Vec<Location>, ProviderError> {
        self.geocoding.get_locations(query).await
    }

    /// Weather and enriched nearby places for `location`.
    ///
    /// Never fails. A failed weather fetch leaves `weather` empty, a failed
    /// nearby search leaves `places` empty, and both are summarized in
    /// `error`. A failed detail lookup keeps that place's summary form.
    #[instrument(
        skip(self, location),
        fields(name = %location.name, lat = location.latitude, lon = location.longitude)
    )]
    pub async fn build_location_result(&self, location: Location) -> LocationResult {
        let mut result = LocationResult::new(location);

        if !result.location.has_valid_coordinates() {
            warn!("invalid coordinates, skipping provider calls");
            result.error = Some("invalid coordinates".to_string());
            return result;
        }

        let (lat, lon) = (result.location.latitude, result.location.longitude);
        let (weather, places) =
            future::join(self.weather.get_weather(lat, lon), self.nearby_places(lat, lon)).await;

        let mut degraded = Vec::new();

        match weather {
            Ok(weather) => result.weather = Some(weather),
            Err(err) => {
                warn!(provider = err.provider(), error = %err, "weather unavailable");
                degraded.push(format!("weather unavailable: {err}"));
            }
        }

        match places {
            Ok(places) => result.places = places,
            Err(err) => {
                warn!(provider = err.provider(), error = %err, "places unavailable");
                degraded.push(format!("places unavailable: {err}"));
            }
        }

        if !degraded.is_empty() {
            result.error = Some(degraded.join("; "));
        }

        info!(
            weather = result.weather.is_some(),
            places = result.places.len(),
            degraded = degraded.len(),
            "location result assembled"
        );

        result
    }

    async fn nearby_places(&self, lat: f64, lon: f64) -> Result<Vec<Place>, ProviderError> {
        let summaries = self.places.get_places(lat, lon, self.options.search_radius_m).await?;
        Ok(self.enrich(summaries).await)
    }

    /// Replace each summary with its detailed form where the lookup succeeds.
    ///
    /// Lookups report `(index, details)` back to this function, which is the
    /// only writer of the output vector. Order and length never change.
    async fn enrich(&self, summaries: Vec<Place>) -> Vec<Place> {
        if summaries.is_empty() {
            return summaries;
        }

        let limit = match self.options.max_concurrent_enrichments {
            0 => summaries.len(),
            k => k,
        };

        let ids: Vec<String> = summaries.iter().map(|place| place.external_id.clone()).collect();
        let lookups = ids.into_iter().enumerate().map(|(index, id)| async move {
            match self.places.get_place_details(&id).await {
                Ok(details) => Some((index, details)),
                Err(err) => {
                    debug!(%id, error = %err, "keeping place summary");
                    None
                }
            }
        });

        let details: Vec<(usize, Place)> = stream::iter(lookups)
            .buffer_unordered(limit)
            .filter_map(future::ready)
            .collect()
            .await;

        debug!(enriched = details.len(), total = summaries.len(), "place details fetched");

        let mut places = summaries;
        for (index, place) in details {
            places[index] = place;
        }
        places
    }
}
