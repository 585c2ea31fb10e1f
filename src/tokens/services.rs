use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    audit::{self, Audit},
    error::{AppError, AppResult},
    store::Store,
    tokens::{
        repo::TokenStore,
        repo_types::{Token, TokenKind},
    },
};

pub const CODE_LEN: usize = 32;

/// Compares codes in constant time.
fn code_matches(stored: &str, given: &str) -> bool {
    stored.as_bytes().ct_eq(given.trim().as_bytes()).into()
}

pub fn generate_code() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect()
}

/// Issues a token of `kind` for the user, renewing the existing one if any.
///
/// There is at most one token per user and kind; renewal keeps the id and
/// replaces the code and expiry.
pub async fn issue(
    store: &dyn Store,
    kind: TokenKind,
    user_id: Uuid,
    ttl: Duration,
    issued_by: Option<Uuid>,
) -> anyhow::Result<Token> {
    let now = audit::now();
    let token = match store.find_token_by_user(kind, user_id).await? {
        Some(mut existing) => {
            existing.code = generate_code();
            existing.expiry_date = now + ttl;
            existing.audit.touch(issued_by);
            existing
        }
        None => Token {
            id: Uuid::new_v4(),
            user_id,
            code: generate_code(),
            expiry_date: now + ttl,
            audit: Audit::created(issued_by, Some(user_id)),
        },
    };
    let saved = store.save_token(kind, token).await?;
    debug!(%user_id, token_id = %saved.id, kind = ?kind, "token issued");
    Ok(saved)
}

/// Checks `code` against the user's token and invalidates it.
///
/// Invalidation moves the expiry to now, so a used token always ends up with
/// an earlier expiry than it was issued with.
pub async fn consume(
    store: &dyn Store,
    kind: TokenKind,
    user_id: Uuid,
    code: &str,
    consumed_by: Option<Uuid>,
) -> AppResult<Token> {
    let Some(mut token) = store.find_token_by_user(kind, user_id).await? else {
        warn!(%user_id, kind = ?kind, "no token for user");
        return Err(AppError::not_found(kind.noun()));
    };
    if !code_matches(&token.code, code) {
        warn!(%user_id, kind = ?kind, "token code mismatch");
        return Err(AppError::not_found(kind.noun()));
    }
    if token.is_expired() {
        warn!(%user_id, kind = ?kind, "token expired");
        return Err(AppError::BadRequest(format!("{} expired", kind.noun())));
    }

    token.expiry_date = audit::now();
    token.audit.touch(consumed_by);
    let saved = store.save_token(kind, token).await?;
    debug!(%user_id, token_id = %saved.id, kind = ?kind, "token consumed");
    Ok(saved)
}
