use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::profilemodel::{Profile, UserRole};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterProfileDto {
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    pub full_name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,

    /// Requested role. `it_team` needs `invite_code`.
    pub role: Option<UserRole>,
    pub invite_code: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginProfileDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoleDto {
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterProfileDto {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FilterProfileDto {
    pub fn filter_profile(profile: &Profile) -> Self {
        FilterProfileDto {
            id: profile.id.to_string(),
            email: profile.email.to_owned(),
            full_name: profile.full_name.to_owned(),
            role: profile.role.to_str().to_string(),
            created_at: profile.created_at,
        }
    }

    pub fn filter_profiles(profiles: &[Profile]) -> Vec<FilterProfileDto> {
        profiles.iter().map(FilterProfileDto::filter_profile).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileLoginResponseDto {
    pub status: String,
    pub token: String,
    pub profile: FilterProfileDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register() -> RegisterProfileDto {
        RegisterProfileDto {
            full_name: "Robin Reyes".to_string(),
            email: "robin@corp.test".to_string(),
            password: "hunter22".to_string(),
            password_confirm: "hunter22".to_string(),
            role: None,
            invite_code: None,
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(register().validate().is_ok());
    }

    #[test]
    fn mismatched_passwords_fail() {
        let mut dto = register();
        dto.password_confirm = "different".to_string();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn bad_email_fails() {
        let mut dto = register();
        dto.email = "not-an-email".to_string();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn role_is_parsed_from_snake_case() {
        let dto: RegisterProfileDto = serde_json::from_str(
            r#"{"full_name":"A","email":"a@b.co","password":"secret1","passwordConfirm":"secret1","role":"it_team","invite_code":"x"}"#,
        )
        .unwrap();
        assert_eq!(dto.role, Some(UserRole::ItTeam));
    }
}
