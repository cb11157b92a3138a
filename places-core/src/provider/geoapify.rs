use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::ProviderError,
    model::{Place, non_empty},
    provider::fetch_json,
};

use super::PlacesProvider;

const PROVIDER: &str = "geoapify";
const DEFAULT_BASE_URL: &str = "https://api.geoapify.com/v2";
const SEARCH_CATEGORIES: &str =
    "tourism.sights,entertainment,catering,accommodation,commercial,leisure,sport";

#[derive(Debug, Clone)]
pub struct GeoapifyProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl GeoapifyProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// GeoJSON point, `[lon, lat]`.
#[derive(Debug, Default, Deserialize)]
struct GeoGeometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

impl GeoGeometry {
    fn lat_lon(&self) -> (f64, f64) {
        match self.coordinates.as_slice() {
            [lon, lat, ..] => (*lat, *lon),
            _ => (0.0, 0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeoSearchProperties {
    place_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    categories: Vec<String>,
    distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GeoSearchFeature {
    properties: GeoSearchProperties,
    #[serde(default)]
    geometry: GeoGeometry,
}

#[derive(Debug, Deserialize)]
struct GeoSearchResponse {
    #[serde(default)]
    features: Vec<GeoSearchFeature>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeoRaw {
    name: String,
    description: String,
    wikipedia: String,
    website: String,
    phone: String,
    opening_hours: String,
    cuisine: String,
    image: String,
}

#[derive(Debug, Default, Deserialize)]
struct GeoDatasource {
    #[serde(default)]
    raw: GeoRaw,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeoContact {
    phone: String,
    email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeoDetailsProperties {
    place_id: String,
    name: String,
    categories: Vec<String>,
    postcode: String,
    city: String,
    state: String,
    country: String,
    formatted: String,
    address_line1: String,
    address_line2: String,
    website: String,
    datasource: GeoDatasource,
    contact: GeoContact,
}

#[derive(Debug, Deserialize)]
struct GeoDetailsFeature {
    #[serde(default)]
    properties: GeoDetailsProperties,
    #[serde(default)]
    geometry: GeoGeometry,
}

#[derive(Debug, Deserialize)]
struct GeoDetailsResponse {
    #[serde(default)]
    features: Vec<GeoDetailsFeature>,
}

fn into_places(response: GeoSearchResponse) -> Vec<Place> {
    response
        .features
        .into_iter()
        .filter(|f| !f.properties.name.is_empty())
        .map(|f| {
            let (lat, lon) = f.geometry.lat_lon();
            let props = f.properties;
            Place::summary(
                props.place_id,
                props.name,
                props.categories.join(", "),
                lat,
                lon,
                props.distance,
            )
        })
        .collect()
}

fn address(props: &GeoDetailsProperties) -> String {
    if !props.formatted.is_empty() {
        return props.formatted.clone();
    }

    [
        &props.address_line1,
        &props.address_line2,
        &props.city,
        &props.state,
        &props.postcode,
        &props.country,
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .map(String::as_str)
    .collect::<Vec<_>>()
    .join(", ")
}

fn describe(props: &GeoDetailsProperties) -> String {
    let raw = &props.datasource.raw;

    let mut description =
        if raw.description.is_empty() { raw.name.clone() } else { raw.description.clone() };

    let address = address(props);
    if !address.is_empty() {
        if !description.is_empty() {
            description.push_str("\n\n");
        }
        description.push_str("Address: ");
        description.push_str(&address);
    }

    let phone = if props.contact.phone.is_empty() { &raw.phone } else { &props.contact.phone };
    let lines = [
        ("Phone", phone),
        ("Email", &props.contact.email),
        ("Opening hours", &raw.opening_hours),
        ("Cuisine", &raw.cuisine),
    ];
    for (label, value) in lines {
        if value.is_empty() {
            continue;
        }
        if !description.is_empty() {
            description.push('\n');
        }
        description.push_str(&format!("{label}: {value}"));
    }

    description
}

fn into_detailed_place(id: &str, response: GeoDetailsResponse) -> Result<Place, ProviderError> {
    let feature = response.features.into_iter().next().ok_or_else(|| ProviderError::NotFound {
        provider: PROVIDER,
        what: format!("details for place {id}"),
    })?;

    let (lat, lon) = feature.geometry.lat_lon();
    let props = feature.properties;
    let description = describe(&props);
    let raw = props.datasource.raw;
    let website = if raw.website.is_empty() { props.website } else { raw.website };

    Ok(Place {
        external_id: props.place_id,
        name: props.name,
        categories: props.categories.join(", "),
        latitude: lat,
        longitude: lon,
        distance: None,
        description: non_empty(description),
        image_url: non_empty(raw.image),
        wikipedia_url: non_empty(raw.wikipedia),
        website_url: non_empty(website),
    })
}

#[async_trait]
impl PlacesProvider for GeoapifyProvider {
    #[instrument(skip(self))]
    async fn get_places(
        &self,
        lat: f64,
        lon: f64,
        radius: f64,
    ) -> Result<Vec<Place>, ProviderError> {
        let request = self.http.get(format!("{}/places", self.base_url)).query(&[
            ("categories", SEARCH_CATEGORIES.to_string()),
            ("filter", format!("circle:{lon},{lat},{}", radius as i64)),
            ("bias", format!("proximity:{lon},{lat}")),
            ("limit", "50".to_string()),
            ("apiKey", self.api_key.clone()),
        ]);

        let places = into_places(fetch_json(PROVIDER, request).await?);
        debug!(count = places.len(), "found nearby places");

        Ok(places)
    }

    #[instrument(skip(self))]
    async fn get_place_details(&self, id: &str) -> Result<Place, ProviderError> {
        let request = self
            .http
            .get(format!("{}/place-details", self.base_url))
            .query(&[("id", id), ("apiKey", self.api_key.as_str())]);

        into_detailed_place(id, fetch_json(PROVIDER, request).await?)
    }
}
