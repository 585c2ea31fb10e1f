use sqlx::FromRow;
use uuid::Uuid;

use crate::audit::Audit;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>, // Argon2 hash, never exposed in JSON
    pub enabled: bool,
    pub verified: bool,
    pub role: Option<Uuid>,
    #[sqlx(flatten)]
    pub audit: Audit,
}

impl User {
    /// A fresh account: enabled, unverified, no password, no role.
    pub fn new(username: &str, email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.trim().to_string(),
            email: normalize_email(email),
            password_hash: None,
            enabled: true,
            verified: false,
            role: None,
            audit: Audit::created(None, None),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
