use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{Group, GroupMember, GroupResponse, MemberResponse, Role, UserSummary},
};

pub const CODE_LENGTH: usize = 6;
pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

const MAX_CODE_ATTEMPTS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRolesRequest {
    pub user_ids: Vec<Uuid>,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMembersRequest {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinOutcome {
    pub message: String,
    pub already_member: bool,
    pub group: GroupResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveOutcome {
    pub message: String,
    pub group_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MembershipStatus {
    pub group_id: Uuid,
    pub is_member: bool,
}

/// Usernames whose role changed and those that already had it
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RoleUpdateOutcome {
    pub updated: Vec<String>,
    pub already_in_role: Vec<String>,
}

/// Random alphanumeric join code
pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

fn validate_group_input(name: &str, description: Option<&str>) -> AppResult<()> {
    let length = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length) {
        return Err(AppError::InvalidInput(format!(
            "Group name must be between {} and {} characters",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        )));
    }
    if description.map(|d| d.chars().count()).unwrap_or(0) > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

/// Resolves member summaries for a response; members whose account is gone are omitted
async fn respond(store: &dyn Store, group: &Group) -> AppResult<GroupResponse> {
    let users = store.get_users(&group.member_ids()).await?;
    let summaries: Vec<UserSummary> = users.iter().map(UserSummary::from).collect();
    Ok(GroupResponse::new(group, &summaries))
}

fn require_admin(group: &Group, caller: Uuid) -> AppResult<()> {
    if !group.is_admin(caller) {
        return Err(AppError::Forbidden(
            "Only group admins can manage members".to_string(),
        ));
    }
    Ok(())
}

/// Applies a membership change, deactivating the group once it is empty
fn settle_membership(group: &mut Group) -> AppResult<()> {
    if group.members.is_empty() {
        group.active = false;
    } else if group.admin_count() == 0 {
        return Err(AppError::InvalidInput(
            "A group must keep at least one admin".to_string(),
        ));
    }
    Ok(())
}

/// Creates a group with a fresh join code; `owner` becomes its admin
pub async fn create_group(
    store: &dyn Store,
    owner: Uuid,
    request: CreateGroupRequest,
) -> AppResult<GroupResponse> {
    let name = request.name.trim().to_string();
    let description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    validate_group_input(&name, description.as_deref())?;

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let group = Group::create(name.clone(), description.clone(), generate_code(), owner);
        match store.insert_group(group).await {
            Ok(group) => {
                tracing::info!(group_id = %group.id, owner = %owner, "Group created");
                return respond(store, &group).await;
            }
            Err(AppError::Conflict(_)) => {
                tracing::debug!(attempt, "Group code collision, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal(
        "Could not generate a unique group code".to_string(),
    ))
}

pub async fn get_group(store: &dyn Store, group_id: Uuid) -> AppResult<GroupResponse> {
    let group = store.get_group(group_id).await?;
    respond(store, &group).await
}

async fn find_by_code(store: &dyn Store, code: &str) -> AppResult<Group> {
    store
        .find_group_by_code(code.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group with code {} not found", code)))
}

pub async fn get_by_code(store: &dyn Store, code: &str) -> AppResult<GroupResponse> {
    let group = find_by_code(store, code).await?;
    respond(store, &group).await
}

/// Adds `user_id` as a member; joining twice is not an error
pub async fn join_by_code(store: &dyn Store, user_id: Uuid, code: &str) -> AppResult<JoinOutcome> {
    let group = find_by_code(store, code).await?;
    store.get_user(user_id).await?;

    let mut already_member = false;
    let group = store
        .update_group(group.id, &mut |group: &mut Group| {
            already_member = group.is_member(user_id);
            if !already_member {
                group.members.push(GroupMember {
                    user_id,
                    role: Role::Member,
                });
            }
            Ok(())
        })
        .await?;

    let message = if already_member {
        "User is already a member of this group"
    } else {
        tracing::info!(group_id = %group.id, user_id = %user_id, "User joined group");
        "User successfully joined the group"
    };

    Ok(JoinOutcome {
        message: message.to_string(),
        already_member,
        group: respond(store, &group).await?,
    })
}

/// Removes the caller from a group
///
/// The only admin of a group with other members must promote someone first.
/// The last member leaving deactivates the group.
pub async fn leave_group(store: &dyn Store, user_id: Uuid, group_id: Uuid) -> AppResult<LeaveOutcome> {
    let group = store
        .update_group(group_id, &mut |group: &mut Group| {
            let member = group.member(user_id).cloned().ok_or_else(|| {
                AppError::InvalidInput("You are not a member of this group".to_string())
            })?;

            let only_admin = member.role == Role::Admin && group.admin_count() == 1;
            if only_admin && group.members.len() > 1 {
                return Err(AppError::InvalidInput(
                    "You are the only admin. Please promote another member before leaving."
                        .to_string(),
                ));
            }

            group.members.retain(|m| m.user_id != user_id);
            settle_membership(group)
        })
        .await?;

    tracing::info!(
        group_id = %group_id,
        user_id = %user_id,
        deactivated = !group.active,
        "User left group"
    );

    Ok(LeaveOutcome {
        message: format!("You have left {}", group.name),
        group_name: group.name,
    })
}

pub async fn membership(store: &dyn Store, group_id: Uuid, user_id: Uuid) -> AppResult<MembershipStatus> {
    let group = store.get_group(group_id).await?;
    Ok(MembershipStatus {
        group_id,
        is_member: group.is_member(user_id),
    })
}

pub async fn list_members(store: &dyn Store, group_id: Uuid) -> AppResult<Vec<MemberResponse>> {
    Ok(get_group(store, group_id).await?.members)
}

/// Sets `role` for the listed members (admin only); non-members are ignored
pub async fn update_roles(
    store: &dyn Store,
    caller: Uuid,
    group_id: Uuid,
    request: UpdateRolesRequest,
) -> AppResult<RoleUpdateOutcome> {
    let users = store.get_users(&request.user_ids).await?;
    let username = |id: Uuid| {
        users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let mut outcome = RoleUpdateOutcome::default();
    store
        .update_group(group_id, &mut |group: &mut Group| {
            require_admin(group, caller)?;
            outcome = RoleUpdateOutcome::default();
            for member in group
                .members
                .iter_mut()
                .filter(|m| request.user_ids.contains(&m.user_id))
            {
                if member.role == request.role {
                    outcome.already_in_role.push(username(member.user_id));
                } else {
                    member.role = request.role;
                    outcome.updated.push(username(member.user_id));
                }
            }
            settle_membership(group)
        })
        .await?;

    tracing::info!(
        group_id = %group_id,
        role = request.role.as_str(),
        updated = outcome.updated.len(),
        already_in_role = outcome.already_in_role.len(),
        "Updated member roles"
    );
    Ok(outcome)
}

/// Removes the listed members (admin only)
pub async fn remove_members(
    store: &dyn Store,
    caller: Uuid,
    group_id: Uuid,
    request: RemoveMembersRequest,
) -> AppResult<GroupResponse> {
    let mut removed = 0;
    let group = store
        .update_group(group_id, &mut |group: &mut Group| {
            require_admin(group, caller)?;
            let before = group.members.len();
            group.members.retain(|m| !request.user_ids.contains(&m.user_id));
            removed = before - group.members.len();
            settle_membership(group)
        })
        .await?;

    tracing::info!(group_id = %group_id, removed, "Removed group members");
    respond(store, &group).await
}

pub async fn user_groups(store: &dyn Store, user_id: Uuid) -> AppResult<Vec<GroupResponse>> {
    let groups = store.user_groups(user_id).await?;
    let mut responses = Vec::with_capacity(groups.len());
    for group in &groups {
        responses.push(respond(store, group).await?);
    }
    Ok(responses)
}
