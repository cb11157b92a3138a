use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use places_core::{Location, LocationResult, ProviderError};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use super::state::AppState;

// Error response

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Body(_) => StatusCode::BAD_REQUEST,
            ApiError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ApiErrorBody { error: self.to_string(), code: status.as_u16() };
        (status, Json(body)).into_response()
    }
}

// POST /api/search

#[derive(Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<Location>>, ApiError> {
    let start = Instant::now();
    let Json(request) = payload?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::Validation("Query is required".to_string()));
    }

    let locations = state.aggregator.resolve_locations(query).await?;

    info!(
        query,
        found = locations.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "POST /api/search"
    );

    Ok(Json(locations))
}

// POST /api/location/details

#[derive(Deserialize)]
pub struct LocationDetailsRequest {
    pub location: Location,
}

pub async fn location_details(
    State(state): State<AppState>,
    payload: Result<Json<LocationDetailsRequest>, JsonRejection>,
) -> Result<Json<LocationResult>, ApiError> {
    let start = Instant::now();
    let Json(request) = payload?;

    let result = state.aggregator.build_location_result(request.location).await;

    info!(
        location = %result.location.name,
        places = result.places.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "POST /api/location/details"
    );

    Ok(Json(result))
}
