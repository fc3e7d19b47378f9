use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: Uuid,
    pub role: Role,
}

/// A dining group; only membership matters for aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub members: Vec<GroupMember>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates an active group with `owner` as its sole admin
    pub fn create(name: String, description: Option<String>, code: String, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            code,
            description,
            members: vec![GroupMember {
                user_id: owner,
                role: Role::Admin,
            }],
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn member(&self, user_id: Uuid) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member(user_id).is_some()
    }

    pub fn is_admin(&self, user_id: Uuid) -> bool {
        self.member(user_id)
            .map(|m| m.role == Role::Admin)
            .unwrap_or(false)
    }

    pub fn member_ids(&self) -> Vec<Uuid> {
        self.members.iter().map(|m| m.user_id).collect()
    }

    pub fn admin_count(&self) -> usize {
        self.members.iter().filter(|m| m.role == Role::Admin).count()
    }
}

/// Group representation returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub user_count: usize,
    pub members: Vec<MemberResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberResponse {
    pub user: UserSummary,
    pub role: Role,
}

impl GroupResponse {
    /// Builds a response from a group and the summaries of its resolvable members
    pub fn new(group: &Group, users: &[UserSummary]) -> Self {
        let members = group
            .members
            .iter()
            .filter_map(|member| {
                users
                    .iter()
                    .find(|u| u.id == member.user_id)
                    .map(|user| MemberResponse {
                        user: user.clone(),
                        role: member.role,
                    })
            })
            .collect();

        Self {
            id: group.id,
            name: group.name.clone(),
            code: group.code.clone(),
            description: group.description.clone(),
            user_count: group.members.len(),
            members,
            created_at: group.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_makes_owner_admin() {
        let owner = Uuid::new_v4();
        let group = Group::create("Lunch Club".to_string(), None, "abc123".to_string(), owner);
        assert!(group.active);
        assert!(group.is_member(owner));
        assert!(group.is_admin(owner));
        assert_eq!(group.admin_count(), 1);
        assert_eq!(group.member_ids(), vec![owner]);
    }

    #[test]
    fn test_non_member_is_not_admin() {
        let group = Group::create("Lunch Club".to_string(), None, "abc123".to_string(), Uuid::new_v4());
        assert!(!group.is_admin(Uuid::new_v4()));
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(role, Role::Member);
        assert_eq!(Role::parse(Role::Admin.as_str()), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }
}
