use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Cuisine, Group, TasteProfile, User},
};

/// Computes a new weight from the stored (preference, weight) pair
pub type WeightAdjustment<'a> = &'a (dyn Fn(f64, f64) -> f64 + Send + Sync);

/// Edits a group in place; an error leaves the stored group untouched
pub type GroupChange<'a> = &'a mut (dyn FnMut(&mut Group) -> AppResult<()> + Send);

/// A learned weight before and after an update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightChange {
    pub previous: f64,
    pub current: f64,
}

/// Persistence for users, their taste profiles and groups
///
/// Inactive users and groups are invisible: lookups report `NotFound`.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new user; duplicate username or email is a `Conflict`
    async fn insert_user(&self, user: User) -> AppResult<User>;

    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// Users among `ids` that exist, in no particular order
    async fn get_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Persists account fields (names, email, password)
    ///
    /// The taste profile is left untouched; see [`Store::set_preferences`]
    /// and [`Store::update_weight`].
    async fn update_user(&self, user: &User) -> AppResult<User>;

    /// Overwrites the given manual preferences, leaving other cuisines as they are
    async fn set_preferences(&self, id: Uuid, updates: &[(Cuisine, f64)]) -> AppResult<User>;

    async fn get_profile(&self, id: Uuid) -> AppResult<TasteProfile>;

    /// Profiles of the users among `ids` that exist
    async fn get_profiles(&self, ids: &[Uuid]) -> AppResult<Vec<TasteProfile>>;

    /// Atomically replaces the learned weight for `cuisine` with `adjust(preference, weight)`
    ///
    /// Concurrent updates for the same user are serialized so none is lost.
    async fn update_weight(
        &self,
        id: Uuid,
        cuisine: Cuisine,
        adjust: WeightAdjustment<'_>,
    ) -> AppResult<WeightChange>;

    /// Inserts a new group; a duplicate code is a `Conflict`
    async fn insert_group(&self, group: Group) -> AppResult<Group>;

    async fn get_group(&self, id: Uuid) -> AppResult<Group>;

    async fn find_group_by_code(&self, code: &str) -> AppResult<Option<Group>>;

    /// Atomically applies `change` to the stored group and persists the result
    ///
    /// `change` sees the latest membership; concurrent updates of the same
    /// group are serialized so no join or leave is lost.
    async fn update_group(&self, id: Uuid, change: GroupChange<'_>) -> AppResult<Group>;

    async fn get_group_members(&self, id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Active groups `user_id` belongs to
    async fn user_groups(&self, user_id: Uuid) -> AppResult<Vec<Group>>;
}
