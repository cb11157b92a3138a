use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::ProviderError,
    model::{Place, non_empty},
    provider::fetch_json,
};

use super::PlacesProvider;

const PROVIDER: &str = "foursquare";
const DEFAULT_BASE_URL: &str = "https://api.foursquare.com/v3";
const DETAIL_FIELDS: &str = "fsq_id,name,description,geocodes,categories,photos,website,tel,rating";

#[derive(Debug, Clone)]
pub struct FoursquareProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl FoursquareProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{path}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FsqPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
struct FsqGeocodes {
    #[serde(default)]
    main: FsqPoint,
}

#[derive(Debug, Deserialize)]
struct FsqCategory {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FsqPhoto {
    prefix: String,
    suffix: String,
}

#[derive(Debug, Deserialize)]
struct FsqSearchResult {
    fsq_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    geocodes: FsqGeocodes,
    #[serde(default)]
    categories: Vec<FsqCategory>,
    distance: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FsqSearchResponse {
    #[serde(default)]
    results: Vec<FsqSearchResult>,
}

#[derive(Debug, Deserialize)]
struct FsqDetailsResponse {
    fsq_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    geocodes: FsqGeocodes,
    #[serde(default)]
    categories: Vec<FsqCategory>,
    #[serde(default)]
    photos: Vec<FsqPhoto>,
    #[serde(default)]
    website: String,
    #[serde(default)]
    tel: String,
    #[serde(default)]
    rating: f64,
}

fn join_categories(categories: &[FsqCategory]) -> String {
    categories.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
}

fn into_places(response: FsqSearchResponse) -> Vec<Place> {
    response
        .results
        .into_iter()
        .filter(|r| !r.name.is_empty())
        .map(|r| {
            let categories = join_categories(&r.categories);
            Place::summary(
                r.fsq_id,
                r.name,
                categories,
                r.geocodes.main.latitude,
                r.geocodes.main.longitude,
                r.distance.map(|d| d as f64),
            )
        })
        .collect()
}

fn into_detailed_place(details: FsqDetailsResponse) -> Place {
    let image_url = details
        .photos
        .first()
        .map(|photo| format!("{}original{}", photo.prefix, photo.suffix));

    let mut description = details.description;
    if description.is_empty() && details.rating > 0.0 {
        description = format!("Rating: {:.1}/10", details.rating);
    }
    if !details.tel.is_empty() {
        if !description.is_empty() {
            description.push('\n');
        }
        description.push_str(&format!("Tel: {}", details.tel));
    }

    Place {
        categories: join_categories(&details.categories),
        external_id: details.fsq_id,
        name: details.name,
        latitude: details.geocodes.main.latitude,
        longitude: details.geocodes.main.longitude,
        distance: None,
        description: non_empty(description),
        image_url,
        wikipedia_url: None,
        website_url: non_empty(details.website),
    }
}

#[async_trait]
impl PlacesProvider for FoursquareProvider {
    #[instrument(skip(self))]
    async fn get_places(
        &self,
        lat: f64,
        lon: f64,
        radius: f64,
    ) -> Result<Vec<Place>, ProviderError> {
        let request = self.get("/places/search").query(&[
            ("ll", format!("{lat},{lon}")),
            ("radius", (radius as i64).to_string()),
            ("limit", "50".to_string()),
        ]);

        let places = into_places(fetch_json(PROVIDER, request).await?);
        debug!(count = places.len(), "found nearby places");

        Ok(places)
    }

    #[instrument(skip(self))]
    async fn get_place_details(&self, id: &str) -> Result<Place, ProviderError> {
        let request = self
            .get(&format!("/places/{}", urlencoding::encode(id)))
            .query(&[("fields", DETAIL_FIELDS)]);

        let details: FsqDetailsResponse = fetch_json(PROVIDER, request).await?;
        Ok(into_detailed_place(details))
    }
}
