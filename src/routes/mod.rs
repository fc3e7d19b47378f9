use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::middleware::require_auth;

pub mod groups;
pub mod places;
pub mod recommendations;
pub mod state;
pub mod users;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(state.clone()))
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/users/signup", post(users::signup))
        .route("/users/login", post(users::login));

    let protected = Router::new()
        // Users
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/me/password", patch(users::update_password))
        .route("/users/me/groups", get(users::my_groups))
        .route(
            "/users/me/preferences",
            get(users::get_preferences).patch(users::update_preferences),
        )
        .route("/users/username/:username", get(users::by_username))
        // Groups
        .route("/groups", post(groups::create))
        .route("/groups/code/:code", get(groups::by_code))
        .route("/groups/code/:code/join", patch(groups::join))
        .route("/groups/:id", get(groups::get))
        .route("/groups/:id/leave", patch(groups::leave))
        .route("/groups/:id/is-member", get(groups::is_member))
        .route(
            "/groups/:id/users",
            get(groups::members).delete(groups::remove_members),
        )
        .route("/groups/:id/users/role", patch(groups::update_roles))
        // Places
        .route("/places", get(places::search))
        // Recommendations
        .route("/recommendations/top-cuisines", get(recommendations::top_cuisines))
        .route("/recommendations/personal", get(recommendations::personal))
        .route("/recommendations/group/:id", get(recommendations::group))
        .route("/recommendations/predict", get(recommendations::predict))
        .route("/recommendations/ratings", post(recommendations::submit_rating))
        .route_layer(from_fn_with_state(state, require_auth));

    public.merge(protected)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
