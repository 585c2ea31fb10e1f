use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::User;

fn default_true() -> bool {
    true
}

/// User as exchanged over the API. The password never appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub username: String,
    pub email: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub role: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub modified_by: Option<Uuid>,
    #[serde(default)]
    pub owner: Option<Uuid>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: Some(u.id),
            username: u.username,
            email: u.email,
            enabled: u.enabled,
            verified: u.verified,
            role: u.role,
            created_at: Some(u.audit.created_at),
            created_by: u.audit.created_by,
            modified_at: u.audit.modified_at,
            modified_by: u.audit.modified_by,
            owner: u.audit.owner,
        }
    }
}

/// Self-service sign up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDto {
    pub username: String,
    pub email: String,
    pub password: String,
    pub matching_password: String,
}

/// Confirms a password reset with the mailed code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetDto {
    pub email: String,
    pub token: String,
    pub password: String,
    pub matching_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordConfirmationDto {
    pub password: String,
    pub matching_password: String,
}

/// Query of `GET /Users/get`.
#[derive(Debug, Default, Deserialize)]
pub struct UserLookup {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}
