//! Core library for the `places` backend.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Adapters for geocoding, weather and places providers
//! - Shared domain models (locations, weather, places)
//! - The [`Aggregator`] that merges provider results for one location
//!
//! It is used by `places-server`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;

pub use config::{AggregationConfig, Config, HttpConfig, ProviderConfig, ServerConfig};
pub use error::ProviderError;
pub use model::{Location, LocationResult, Place, Weather};
pub use provider::{GeocodingProvider, PlacesProvider, ProviderId, WeatherProvider};
pub use service::{Aggregator, AggregatorOptions};
