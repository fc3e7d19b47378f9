use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{GroupResponse, MemberResponse},
    routes::AppState,
    services::groups::{
        self, CreateGroupRequest, JoinOutcome, LeaveOutcome, MembershipStatus,
        RemoveMembersRequest, RoleUpdateOutcome, UpdateRolesRequest,
    },
};

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateGroupRequest>,
) -> AppResult<(StatusCode, Json<GroupResponse>)> {
    let group = groups::create_group(state.store.as_ref(), user.id(), request).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<GroupResponse>> {
    Ok(Json(groups::get_group(state.store.as_ref(), group_id).await?))
}

pub async fn by_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> AppResult<Json<GroupResponse>> {
    Ok(Json(groups::get_by_code(state.store.as_ref(), &code).await?))
}

pub async fn join(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(code): Path<String>,
) -> AppResult<Json<JoinOutcome>> {
    let outcome = groups::join_by_code(state.store.as_ref(), user.id(), &code).await?;
    Ok(Json(outcome))
}

pub async fn leave(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<LeaveOutcome>> {
    let outcome = groups::leave_group(state.store.as_ref(), user.id(), group_id).await?;
    Ok(Json(outcome))
}

pub async fn is_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<MembershipStatus>> {
    let status = groups::membership(state.store.as_ref(), group_id, user.id()).await?;
    Ok(Json(status))
}

pub async fn members(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<Vec<MemberResponse>>> {
    Ok(Json(groups::list_members(state.store.as_ref(), group_id).await?))
}

pub async fn update_roles(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<UpdateRolesRequest>,
) -> AppResult<Json<RoleUpdateOutcome>> {
    let outcome = groups::update_roles(state.store.as_ref(), user.id(), group_id, request).await?;
    Ok(Json(outcome))
}

pub async fn remove_members(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<RemoveMembersRequest>,
) -> AppResult<Json<GroupResponse>> {
    let group = groups::remove_members(state.store.as_ref(), user.id(), group_id, request).await?;
    Ok(Json(group))
}
