use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{Cuisine, CuisineMap, PublicUser},
};

use super::auth::is_email;

pub const MIN_POINTS: f64 = 1.0;
pub const MAX_POINTS: f64 = 5.0;

/// Editable account fields; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// One manual preference as sent by clients
#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceUpdate {
    pub cuisine: String,
    pub points: f64,
}

pub async fn get_user(store: &dyn Store, user_id: Uuid) -> AppResult<PublicUser> {
    let user = store.get_user(user_id).await?;
    Ok(PublicUser::from(&user))
}

pub async fn get_by_username(store: &dyn Store, username: &str) -> AppResult<PublicUser> {
    store
        .find_user_by_username(username.trim())
        .await?
        .map(|user| PublicUser::from(&user))
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))
}

fn non_blank(field: &str, value: Option<String>) -> AppResult<Option<String>> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(AppError::InvalidInput(format!("{} cannot be empty", field))),
        other => Ok(other),
    }
}

pub async fn update_profile(
    store: &dyn Store,
    user_id: Uuid,
    request: UpdateProfileRequest,
) -> AppResult<PublicUser> {
    let mut user = store.get_user(user_id).await?;

    if let Some(username) = non_blank("Username", request.username)? {
        user.username = username;
    }
    if let Some(email) = non_blank("Email", request.email)? {
        if !is_email(&email) {
            return Err(AppError::InvalidInput("Please provide a valid email".to_string()));
        }
        user.email = email.to_lowercase();
    }
    if let Some(first_name) = non_blank("First name", request.first_name)? {
        user.first_name = first_name;
    }
    if let Some(last_name) = non_blank("Last name", request.last_name)? {
        user.last_name = last_name;
    }

    let user = store.update_user(&user).await?;
    Ok(PublicUser::from(&user))
}

/// Validates a batch of preference updates
///
/// Every cuisine must be in the taxonomy and every score a finite number in
/// [1, 5]. The whole batch is rejected on the first bad entry.
pub fn parse_preferences(updates: &[PreferenceUpdate]) -> AppResult<Vec<(Cuisine, f64)>> {
    if updates.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one preference is required".to_string(),
        ));
    }

    updates
        .iter()
        .map(|update| {
            let cuisine: Cuisine = update.cuisine.parse()?;
            if !update.points.is_finite() || !(MIN_POINTS..=MAX_POINTS).contains(&update.points) {
                return Err(AppError::InvalidInput(format!(
                    "Points for {} must be between {} and {}",
                    cuisine, MIN_POINTS, MAX_POINTS
                )));
            }
            Ok((cuisine, update.points))
        })
        .collect()
}

pub async fn get_preferences(store: &dyn Store, user_id: Uuid) -> AppResult<CuisineMap> {
    Ok(store.get_profile(user_id).await?.preferences)
}

pub async fn update_preferences(
    store: &dyn Store,
    user_id: Uuid,
    updates: &[PreferenceUpdate],
) -> AppResult<CuisineMap> {
    let parsed = parse_preferences(updates)?;
    let user = store.set_preferences(user_id, &parsed).await?;

    tracing::info!(user_id = %user_id, updated = parsed.len(), "Updated manual preferences");
    Ok(user.profile.preferences)
}
