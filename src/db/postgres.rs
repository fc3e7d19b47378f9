use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Cuisine, CuisineMap, Group, GroupMember, Role, TasteProfile, User},
};

use super::store::{GroupChange, Store, WeightAdjustment, WeightChange};

/// Connection pool for [`PgStore`]
///
/// Weight and membership updates each hold a row lock for one short
/// transaction, so a small pool is enough.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
     password_changed_at, preferences, cuisine_weights, created_at, updated_at";

const GROUP_COLUMNS: &str = "id, name, code, description, active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    password_changed_at: Option<DateTime<Utc>>,
    preferences: Json<CuisineMap>,
    cuisine_weights: Json<CuisineMap>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            password_changed_at: row.password_changed_at,
            profile: TasteProfile {
                preferences: row.preferences.0,
                weights: row.cuisine_weights.0,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    preferences: Json<CuisineMap>,
    cuisine_weights: Json<CuisineMap>,
}

impl From<ProfileRow> for TasteProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            preferences: row.preferences.0,
            weights: row.cuisine_weights.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    code: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self, members: Vec<GroupMember>) -> Group {
        Group {
            id: self.id,
            name: self.name,
            code: self.code,
            description: self.description,
            members,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    group_id: Uuid,
    user_id: Uuid,
    role: String,
}

impl TryFrom<MemberRow> for GroupMember {
    type Error = AppError;

    fn try_from(row: MemberRow) -> AppResult<Self> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| AppError::Internal(format!("Unknown member role: {}", row.role)))?;
        Ok(Self {
            user_id: row.user_id,
            role,
        })
    }
}

/// Maps unique-constraint violations to `Conflict`
fn conflict_on_duplicate(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}

fn group_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Group {} not found", id))
}

/// PostgreSQL-backed store
///
/// Taste profiles live in two JSONB columns on `users`; membership lives in
/// `group_members`, ordered by join position.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations from `migrations/`
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_user(&self, clause: &str, value: &str) -> AppResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE {} = $1 AND active",
            USER_COLUMNS, clause
        );
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn load_members<'e>(
        executor: impl PgExecutor<'e>,
        group_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<GroupMember>>> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            "SELECT group_id, user_id, role FROM group_members \
             WHERE group_id = ANY($1) ORDER BY group_id, position",
        )
        .bind(group_ids)
        .fetch_all(executor)
        .await?;

        let mut members: HashMap<Uuid, Vec<GroupMember>> = HashMap::new();
        for row in rows {
            let group_id = row.group_id;
            members.entry(group_id).or_default().push(row.try_into()?);
        }
        Ok(members)
    }

    async fn with_members(&self, rows: Vec<GroupRow>) -> AppResult<Vec<Group>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut members = Self::load_members(&self.pool, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let group_members = members.remove(&row.id).unwrap_or_default();
                row.into_group(group_members)
            })
            .collect())
    }

    async fn write_members(tx: &mut Transaction<'_, Postgres>, group: &Group) -> AppResult<()> {
        sqlx::query("DELETE FROM group_members WHERE group_id = $1")
            .bind(group.id)
            .execute(&mut **tx)
            .await?;

        for (position, member) in group.members.iter().enumerate() {
            sqlx::query(
                "INSERT INTO group_members (group_id, user_id, role, position) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(group.id)
            .bind(member.user_id)
            .bind(member.role.as_str())
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: User) -> AppResult<User> {
        sqlx::query(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash, \
             password_changed_at, preferences, cuisine_weights, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.password_changed_at)
        .bind(Json(&user.profile.preferences))
        .bind(Json(&user.profile.weights))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Username or email is already taken"))?;

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1 AND active", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::from).ok_or_else(|| user_not_found(id))
    }

    async fn get_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE id = ANY($1) AND active",
            USER_COLUMNS
        );
        let rows: Vec<UserRow> = sqlx::query_as(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.fetch_user("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.fetch_user("email", email).await
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        let query = format!(
            "UPDATE users SET username = $2, email = $3, first_name = $4, last_name = $5, \
             password_hash = $6, password_changed_at = $7, updated_at = now() \
             WHERE id = $1 AND active RETURNING {}",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(user.password_changed_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, "Username or email is already taken"))?;

        row.map(User::from).ok_or_else(|| user_not_found(user.id))
    }

    async fn set_preferences(&self, id: Uuid, updates: &[(Cuisine, f64)]) -> AppResult<User> {
        let patch: CuisineMap = updates.iter().copied().collect();
        // jsonb || merges top-level keys, leaving other cuisines in place
        let query = format!(
            "UPDATE users SET preferences = preferences || $2, updated_at = now() \
             WHERE id = $1 AND active RETURNING {}",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id)
            .bind(Json(&patch))
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::from).ok_or_else(|| user_not_found(id))
    }

    async fn get_profile(&self, id: Uuid) -> AppResult<TasteProfile> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT preferences, cuisine_weights FROM users WHERE id = $1 AND active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TasteProfile::from).ok_or_else(|| user_not_found(id))
    }

    async fn get_profiles(&self, ids: &[Uuid]) -> AppResult<Vec<TasteProfile>> {
        let rows: Vec<ProfileRow> = sqlx::query_as(
            "SELECT preferences, cuisine_weights FROM users WHERE id = ANY($1) AND active",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TasteProfile::from).collect())
    }

    async fn update_weight(
        &self,
        id: Uuid,
        cuisine: Cuisine,
        adjust: WeightAdjustment<'_>,
    ) -> AppResult<WeightChange> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent ratings for the same user
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT preferences, cuisine_weights FROM users WHERE id = $1 AND active FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let mut profile = row.map(TasteProfile::from).ok_or_else(|| user_not_found(id))?;

        let previous = profile.weight(cuisine);
        let current = adjust(profile.preference(cuisine), previous);
        profile.weights.set(cuisine, current);

        sqlx::query("UPDATE users SET cuisine_weights = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(Json(&profile.weights))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(WeightChange { previous, current })
    }

    async fn insert_group(&self, group: Group) -> AppResult<Group> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO groups (id, name, code, description, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.code)
        .bind(&group.description)
        .bind(group.active)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Group code is already in use"))?;

        Self::write_members(&mut tx, &group).await?;
        tx.commit().await?;

        Ok(group)
    }

    async fn get_group(&self, id: Uuid) -> AppResult<Group> {
        let query = format!("SELECT {} FROM groups WHERE id = $1 AND active", GROUP_COLUMNS);
        let row: Option<GroupRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let row = row.ok_or_else(|| group_not_found(id))?;

        let mut groups = self.with_members(vec![row]).await?;
        groups.pop().ok_or_else(|| group_not_found(id))
    }

    async fn find_group_by_code(&self, code: &str) -> AppResult<Option<Group>> {
        let query = format!("SELECT {} FROM groups WHERE code = $1 AND active", GROUP_COLUMNS);
        let row: Option<GroupRow> = sqlx::query_as(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_members(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_group(&self, id: Uuid, change: GroupChange<'_>) -> AppResult<Group> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes membership changes to the same group
        let query = format!(
            "SELECT {} FROM groups WHERE id = $1 AND active FOR UPDATE",
            GROUP_COLUMNS
        );
        let row: Option<GroupRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let row = row.ok_or_else(|| group_not_found(id))?;

        let members = Self::load_members(&mut *tx, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        let mut group = row.into_group(members);

        // Dropping the transaction on error rolls it back
        change(&mut group)?;
        group.updated_at = Utc::now();

        sqlx::query(
            "UPDATE groups SET name = $2, description = $3, active = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.active)
        .bind(group.updated_at)
        .execute(&mut *tx)
        .await?;

        Self::write_members(&mut tx, &group).await?;
        tx.commit().await?;
        Ok(group)
    }

    async fn get_group_members(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        self.get_group(id).await.map(|g| g.member_ids())
    }

    async fn user_groups(&self, user_id: Uuid) -> AppResult<Vec<Group>> {
        let query = format!(
            "SELECT {} FROM groups WHERE active AND id IN \
             (SELECT group_id FROM group_members WHERE user_id = $1) ORDER BY created_at",
            GROUP_COLUMNS
        );
        let rows: Vec<GroupRow> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        self.with_members(rows).await
    }
}
