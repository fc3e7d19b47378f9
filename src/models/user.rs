use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CuisineMap, TasteProfile};

/// A registered user as persisted by the store
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub profile: TasteProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

impl User {
    /// Builds a user with the initial taste profile
    ///
    /// This is the only place a profile is created, so every stored user carries
    /// an entry for each cuisine from day one.
    pub fn create(new_user: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: new_user.username.trim().to_string(),
            email: new_user.email.trim().to_lowercase(),
            first_name: new_user.first_name.trim().to_string(),
            last_name: new_user.last_name.trim().to_string(),
            password_hash: new_user.password_hash,
            password_changed_at: None,
            profile: TasteProfile::initial(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether the password was changed after a token issued at `issued_at` (unix seconds)
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        self.password_changed_at
            .map(|changed| issued_at < changed.timestamp())
            .unwrap_or(false)
    }
}

/// User representation returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub preferences: CuisineMap,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            preferences: user.profile.preferences.clone(),
            created_at: user.created_at,
        }
    }
}

/// Minimal member info embedded in group responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cuisine;

    fn new_user() -> NewUser {
        NewUser {
            username: " alice ".to_string(),
            email: "Alice@Example.COM".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Tan".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[test]
    fn test_create_normalizes_and_initializes_profile() {
        let user = User::create(new_user());
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.profile, TasteProfile::initial());
        assert_eq!(user.profile.preference(Cuisine::Italian), 1.0);
    }

    #[test]
    fn test_public_user_hides_secrets() {
        let user = User::create(new_user());
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("weights").is_none());
        assert_eq!(json["full_name"], "Alice Tan");
    }

    #[test]
    fn test_changed_password_after() {
        let mut user = User::create(new_user());
        assert!(!user.changed_password_after(0));

        let changed = Utc::now();
        user.password_changed_at = Some(changed);
        assert!(user.changed_password_after(changed.timestamp() - 10));
        assert!(!user.changed_password_after(changed.timestamp() + 10));
    }
}
