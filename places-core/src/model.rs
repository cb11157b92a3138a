use serde::{Deserialize, Serialize};

/// A geocoded candidate location.
///
/// Carries no identity beyond its coordinates; duplicates returned by a
/// geocoder are passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self { name: name.into(), latitude, longitude, country: None, state: None }
    }

    /// Both coordinates are finite and inside the WGS84 ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Current weather snapshot at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Degrees Celsius.
    #[serde(rename = "temp")]
    pub temperature: f64,
    pub feels_like: f64,
    pub description: String,
    /// Relative humidity, percent.
    pub humidity: i32,
    /// Meters per second.
    pub wind_speed: f64,
    pub icon: String,
}

/// A point of interest.
///
/// The same struct holds both the summary form returned by a nearby search
/// and the detailed form returned by a per-place lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(rename = "xid")]
    pub external_id: String,
    pub name: String,
    /// Category names joined with `", "`.
    #[serde(rename = "kinds")]
    pub categories: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    /// Meters from the search center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "wikipedia", default, skip_serializing_if = "Option::is_none")]
    pub wikipedia_url: Option<String>,
    #[serde(rename = "website", default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
}

impl Place {
    /// Summary form as produced by a nearby search.
    pub fn summary(
        external_id: impl Into<String>,
        name: impl Into<String>,
        categories: impl Into<String>,
        latitude: f64,
        longitude: f64,
        distance: Option<f64>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            categories: categories.into(),
            latitude,
            longitude,
            distance,
            description: None,
            image_url: None,
            wikipedia_url: None,
            website_url: None,
        }
    }
}

/// Everything known about one location, assembled by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    pub location: Location,
    pub weather: Option<Weather>,
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LocationResult {
    pub fn new(location: Location) -> Self {
        Self { location, weather: None, places: Vec::new(), error: None }
    }
}

/// `Some(s)` unless `s` is empty.
pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn location_uses_short_coordinate_names_on_the_wire() {
        let loc = Location::new("Paris", 48.8566, 2.3522);
        let value = serde_json::to_value(&loc).unwrap();

        assert_eq!(value, json!({ "name": "Paris", "lat": 48.8566, "lon": 2.3522 }));
    }

    #[test]
    fn location_accepts_missing_optional_fields() {
        let loc: Location =
            serde_json::from_value(json!({ "name": "Oslo", "lat": 59.91, "lon": 10.75 })).unwrap();

        assert_eq!(loc.country, None);
        assert_eq!(loc.state, None);
    }

    #[test]
    fn coordinate_validation() {
        assert!(Location::new("ok", 90.0, -180.0).has_valid_coordinates());
        assert!(!Location::new("lat", 90.5, 0.0).has_valid_coordinates());
        assert!(!Location::new("lon", 0.0, 181.0).has_valid_coordinates());
        assert!(!Location::new("nan", f64::NAN, 0.0).has_valid_coordinates());
    }

    #[test]
    fn empty_result_keeps_weather_null_and_places_array() {
        let result = LocationResult::new(Location::new("X", 1.0, 2.0));
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["weather"], serde_json::Value::Null);
        assert_eq!(value["places"], json!([]));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn place_summary_omits_absent_details() {
        let place = Place::summary("p1", "Cafe", "Coffee Shop", 1.0, 2.0, Some(120.0));
        let value = serde_json::to_value(&place).unwrap();

        assert_eq!(value["xid"], "p1");
        assert_eq!(value["kinds"], "Coffee Shop");
        assert_eq!(value["distance"], 120.0);
        assert!(value.get("description").is_none());
        assert!(value.get("website").is_none());
    }
}
