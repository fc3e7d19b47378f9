use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Cuisine, Group, TasteProfile, User},
};

use super::store::{GroupChange, Store, WeightAdjustment, WeightChange};

#[derive(Default)]
struct MemoryStoreInner {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, Group>,
}

/// Process-local store used when no database is configured, and in tests
///
/// A single lock guards all state, so every write is serialized.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}

fn group_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Group {} not found", id))
}

impl MemoryStoreInner {
    fn check_unique_user(&self, user: &User) -> AppResult<()> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(AppError::Conflict("Username is already taken".to_string()));
            }
            if other.email == user.email {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        inner.check_unique_user(&user)?;
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        let inner = self.inner.read().await;
        inner.users.get(&id).cloned().ok_or_else(|| user_not_found(id))
    }

    async fn get_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| inner.users.get(id).cloned()).collect())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        inner.check_unique_user(user)?;

        let stored = inner.users.get_mut(&user.id).ok_or_else(|| user_not_found(user.id))?;
        stored.username = user.username.clone();
        stored.email = user.email.clone();
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.password_hash = user.password_hash.clone();
        stored.password_changed_at = user.password_changed_at;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn set_preferences(&self, id: Uuid, updates: &[(Cuisine, f64)]) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        let stored = inner.users.get_mut(&id).ok_or_else(|| user_not_found(id))?;
        for (cuisine, points) in updates {
            stored.profile.preferences.set(*cuisine, *points);
        }
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn get_profile(&self, id: Uuid) -> AppResult<TasteProfile> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id)
            .map(|u| u.profile.clone())
            .ok_or_else(|| user_not_found(id))
    }

    async fn get_profiles(&self, ids: &[Uuid]) -> AppResult<Vec<TasteProfile>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).map(|u| u.profile.clone()))
            .collect())
    }

    async fn update_weight(
        &self,
        id: Uuid,
        cuisine: Cuisine,
        adjust: WeightAdjustment<'_>,
    ) -> AppResult<WeightChange> {
        let mut inner = self.inner.write().await;
        let stored = inner.users.get_mut(&id).ok_or_else(|| user_not_found(id))?;

        let previous = stored.profile.weight(cuisine);
        let current = adjust(stored.profile.preference(cuisine), previous);
        stored.profile.weights.set(cuisine, current);
        stored.updated_at = Utc::now();

        Ok(WeightChange { previous, current })
    }

    async fn insert_group(&self, group: Group) -> AppResult<Group> {
        let mut inner = self.inner.write().await;
        if inner.groups.values().any(|g| g.code == group.code) {
            return Err(AppError::Conflict(format!(
                "Group code {} is already in use",
                group.code
            )));
        }
        inner.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, id: Uuid) -> AppResult<Group> {
        let inner = self.inner.read().await;
        inner
            .groups
            .get(&id)
            .filter(|g| g.active)
            .cloned()
            .ok_or_else(|| group_not_found(id))
    }

    async fn find_group_by_code(&self, code: &str) -> AppResult<Option<Group>> {
        let inner = self.inner.read().await;
        Ok(inner
            .groups
            .values()
            .find(|g| g.active && g.code == code)
            .cloned())
    }

    async fn update_group(&self, id: Uuid, change: GroupChange<'_>) -> AppResult<Group> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .groups
            .get_mut(&id)
            .filter(|g| g.active)
            .ok_or_else(|| group_not_found(id))?;

        let mut updated = stored.clone();
        change(&mut updated)?;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    async fn get_group_members(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        self.get_group(id).await.map(|g| g.member_ids())
    }

    async fn user_groups(&self, user_id: Uuid) -> AppResult<Vec<Group>> {
        let inner = self.inner.read().await;
        let mut groups: Vec<Group> = inner
            .groups
            .values()
            .filter(|g| g.active && g.is_member(user_id))
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.created_at);
        Ok(groups)
    }
}
