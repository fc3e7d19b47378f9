use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{Place, PlaceSearchParams, MAX_RADIUS},
    routes::AppState,
    services::ranking::parse_limit,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub keyword: Option<String>,
    pub radius: Option<u32>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<Place>,
    pub status: String,
    pub next_page_token: Option<String>,
    pub total_results: usize,
    pub returned_results: usize,
    pub skipped: usize,
}

/// Checks that both coordinates are present and on the globe
pub fn validate_coordinates(lat: Option<f64>, lng: Option<f64>) -> AppResult<(f64, f64)> {
    let (lat, lng) = match (lat, lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(AppError::InvalidInput(
                "Latitude and longitude are required".to_string(),
            ))
        }
    };
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::InvalidInput(format!(
            "Latitude must be between -90 and 90, got {}",
            lat
        )));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::InvalidInput(format!(
            "Longitude must be between -180 and 180, got {}",
            lng
        )));
    }
    Ok((lat, lng))
}

pub fn validate_radius(radius: Option<u32>) -> AppResult<Option<u32>> {
    match radius {
        Some(r) if r == 0 || r > MAX_RADIUS => Err(AppError::InvalidInput(format!(
            "Radius must be between 1 and {} meters",
            MAX_RADIUS
        ))),
        other => Ok(other),
    }
}

/// Raw nearby search, without scoring
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let (lat, lng) = validate_coordinates(query.lat, query.lng)?;
    let radius = validate_radius(query.radius)?;
    let limit = query.limit.as_deref().map(|raw| parse_limit(Some(raw)));

    let mut params = PlaceSearchParams::restaurants(
        lat,
        lng,
        query.keyword.filter(|k| !k.trim().is_empty()),
        radius,
    );
    if let Some(place_type) = query.place_type.filter(|t| !t.trim().is_empty()) {
        params.place_type = place_type;
    }

    let search = state.places.search_nearby(&params).await?;
    let total_results = search.places.len();
    let results: Vec<Place> = match limit {
        Some(limit) => search.places.into_iter().take(limit).collect(),
        None => search.places,
    };

    Ok(Json(SearchResponse {
        returned_results: results.len(),
        results,
        status: search.status,
        next_page_token: search.next_page_token,
        total_results,
        skipped: search.skipped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coordinates() {
        assert_eq!(validate_coordinates(Some(1.3), Some(103.8)).unwrap(), (1.3, 103.8));
        assert!(validate_coordinates(None, Some(103.8)).is_err());
        assert!(validate_coordinates(Some(91.0), Some(0.0)).is_err());
        assert!(validate_coordinates(Some(0.0), Some(-180.5)).is_err());
        assert!(validate_coordinates(Some(f64::NAN), Some(0.0)).is_err());
    }

    #[test]
    fn test_validate_radius() {
        assert_eq!(validate_radius(None).unwrap(), None);
        assert_eq!(validate_radius(Some(1500)).unwrap(), Some(1500));
        assert!(validate_radius(Some(0)).is_err());
        assert!(validate_radius(Some(MAX_RADIUS + 1)).is_err());
    }
}
