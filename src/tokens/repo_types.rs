use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::{self, Audit};

/// What a single-use account token is for. Each kind has its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Verification,
    PasswordReset,
}

impl TokenKind {
    pub fn table(self) -> &'static str {
        match self {
            TokenKind::Verification => "verification_tokens",
            TokenKind::PasswordReset => "password_reset_tokens",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            TokenKind::Verification => "verification token",
            TokenKind::PasswordReset => "password reset token",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Token {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub expiry_date: OffsetDateTime,
    #[sqlx(flatten)]
    pub audit: Audit,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        self.expiry_date <= audit::now()
    }
}
