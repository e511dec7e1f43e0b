use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    ItTeam,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::User => "user",
            UserRole::ItTeam => "it_team",
        }
    }

    pub fn is_it_team(&self) -> bool {
        matches!(self, UserRole::ItTeam)
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Least-privilege stand-in used when the profile row cannot be read.
    pub fn fallback(identity: Uuid) -> Self {
        Profile {
            id: identity,
            email: String::new(),
            full_name: String::new(),
            role: UserRole::User,
            created_at: Utc::now(),
        }
    }
}

/// Profile row plus the stored password hash. Only the auth handlers see this.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileCredentials {
    #[sqlx(flatten)]
    pub profile: Profile,
    pub password_hash: String,
}
