use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{CuisineMap, GroupResponse, PublicUser},
    routes::AppState,
    services::{
        auth::{self, AuthResponse, LoginRequest, SignupRequest, UpdatePasswordRequest},
        groups,
        users::{self, PreferenceUpdate, UpdateProfileRequest},
    },
};

#[derive(Debug, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub preferences: CuisineMap,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response = auth::signup(state.store.as_ref(), &state.tokens, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response = auth::login(state.store.as_ref(), &state.tokens, request).await?;
    Ok(Json(response))
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<PublicUser> {
    Json(PublicUser::from(&user.0))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> AppResult<Json<PublicUser>> {
    let updated = users::update_profile(state.store.as_ref(), user.id(), request).await?;
    Ok(Json(updated))
}

pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdatePasswordRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response =
        auth::update_password(state.store.as_ref(), &state.tokens, user.id(), request).await?;
    Ok(Json(response))
}

pub async fn my_groups(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<GroupResponse>>> {
    let groups = groups::user_groups(state.store.as_ref(), user.id()).await?;
    Ok(Json(groups))
}

pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<PreferencesResponse>> {
    let preferences = users::get_preferences(state.store.as_ref(), user.id()).await?;
    Ok(Json(PreferencesResponse { preferences }))
}

/// Body is a list of `{ "cuisine": "Thai", "points": 4 }`
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(updates): Json<Vec<PreferenceUpdate>>,
) -> AppResult<Json<PreferencesResponse>> {
    let preferences = users::update_preferences(state.store.as_ref(), user.id(), &updates).await?;
    Ok(Json(PreferencesResponse { preferences }))
}

pub async fn by_username(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> AppResult<Json<PublicUser>> {
    let user = users::get_by_username(state.store.as_ref(), &username).await?;
    Ok(Json(user))
}
