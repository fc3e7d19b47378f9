use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{Cuisine, Prediction, RatingOutcome, RecommendationResponse, TopCuisinesResponse},
    routes::{
        places::{validate_coordinates, validate_radius},
        AppState,
    },
    services::{
        ranking::parse_limit,
        recommendations::{self, PredictQuery, RatingRequest, RecommendationQuery},
    },
};

#[derive(Debug, Deserialize)]
pub struct TopCuisinesParams {
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub cuisine: Option<String>,
    pub radius: Option<u32>,
    pub limit: Option<String>,
}

impl RecommendationParams {
    fn into_query(self) -> AppResult<RecommendationQuery> {
        let (lat, lng) = validate_coordinates(self.lat, self.lng)?;
        let cuisine = parse_cuisine(self.cuisine.as_deref())?;
        Ok(RecommendationQuery {
            lat,
            lng,
            cuisine,
            radius: validate_radius(self.radius)?,
            limit: parse_limit(self.limit.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub cuisine: Option<String>,
    pub rating: Option<f64>,
}

fn parse_cuisine(raw: Option<&str>) -> AppResult<Cuisine> {
    raw.ok_or_else(|| AppError::InvalidInput("Cuisine is required".to_string()))?
        .parse()
}

pub async fn top_cuisines(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<TopCuisinesParams>,
) -> AppResult<Json<TopCuisinesResponse>> {
    let response = recommendations::top_cuisines(
        state.store.as_ref(),
        state.aggregation.as_ref(),
        user.id(),
        params.group_id,
    )
    .await?;
    Ok(Json(response))
}

pub async fn personal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Json<RecommendationResponse>> {
    let query = params.into_query()?;
    let response = recommendations::personal_recommendations(
        state.store.as_ref(),
        state.places.as_ref(),
        user.id(),
        query,
    )
    .await?;
    Ok(Json(response))
}

pub async fn group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Json<RecommendationResponse>> {
    let query = params.into_query()?;
    let response = recommendations::group_recommendations(
        state.store.as_ref(),
        state.places.as_ref(),
        state.aggregation.as_ref(),
        user.id(),
        group_id,
        query,
    )
    .await?;
    Ok(Json(response))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<PredictParams>,
) -> AppResult<Json<Prediction>> {
    let query = PredictQuery {
        place_id: params.place_id.unwrap_or_default(),
        name: params.name.unwrap_or_default(),
        cuisine: parse_cuisine(params.cuisine.as_deref())?,
        rating: params.rating,
    };
    let prediction = recommendations::predict(state.store.as_ref(), user.id(), query).await?;
    Ok(Json(prediction))
}

pub async fn submit_rating(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<RatingRequest>,
) -> AppResult<Json<RatingOutcome>> {
    let outcome = recommendations::submit_rating(state.store.as_ref(), user.id(), request).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(cuisine: Option<&str>, limit: Option<&str>) -> RecommendationParams {
        RecommendationParams {
            lat: Some(1.3),
            lng: Some(103.8),
            cuisine: cuisine.map(str::to_string),
            radius: None,
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn test_into_query() {
        let query = params(Some("Thai"), Some("2")).into_query().unwrap();
        assert_eq!(query.cuisine, Cuisine::Thai);
        assert_eq!(query.limit, 2);
    }

    #[test]
    fn test_bad_limit_falls_back_to_default() {
        let query = params(Some("Thai"), Some("abc")).into_query().unwrap();
        assert_eq!(query.limit, 4);
    }

    #[test]
    fn test_missing_or_unknown_cuisine_rejected() {
        assert!(params(None, None).into_query().is_err());
        assert!(matches!(
            params(Some("Martian"), None).into_query(),
            Err(AppError::InvalidCuisine(_))
        ));
    }
}
