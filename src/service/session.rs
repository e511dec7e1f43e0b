//! Explicit session context built once per authenticated request.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::models::profilemodel::{Profile, UserRole};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
}

impl Identity {
    pub fn new(id: Uuid) -> Self {
        Identity {
            id,
            username: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    ItTeam,
    User,
}

impl Dashboard {
    pub fn views(&self) -> &'static [&'static str] {
        match self {
            Dashboard::ItTeam => &["tickets", "team_performance", "analytics"],
            Dashboard::User => &["my_tickets", "create_ticket", "feedback"],
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionContext {
    pub loading: bool,
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
}

impl Default for SessionContext {
    fn default() -> Self {
        SessionContext {
            loading: true,
            identity: None,
            profile: None,
        }
    }
}

impl SessionContext {
    /// Resolves the profile for `identity`. A failed lookup yields a
    /// `user`-role fallback profile instead of leaving the session pending;
    /// a lookup that finds nothing leaves `profile` empty.
    pub async fn initialize<F, Fut>(identity: Option<Identity>, lookup: F) -> SessionContext
    where
        F: FnOnce(Uuid) -> Fut,
        Fut: Future<Output = Result<Option<Profile>, sqlx::Error>>,
    {
        let Some(mut identity) = identity else {
            return SessionContext {
                loading: false,
                identity: None,
                profile: None,
            };
        };

        let profile = match lookup(identity.id).await {
            Ok(Some(profile)) => {
                identity.username = profile.email.clone();
                Some(profile)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    "Failed to load profile for {}, using default user profile: {}",
                    identity.id,
                    e
                );
                Some(Profile::fallback(identity.id))
            }
        };

        SessionContext {
            loading: false,
            identity: Some(identity),
            profile,
        }
    }

    pub fn role(&self) -> UserRole {
        self.profile.as_ref().map(|p| p.role).unwrap_or_default()
    }

    pub fn dashboard(&self) -> Dashboard {
        if self.role().is_it_team() {
            Dashboard::ItTeam
        } else {
            Dashboard::User
        }
    }
}
