use lazy_static::lazy_static;
use regex::Regex;
use time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    audit::Audit,
    auth::password::{check_new_password, hash_password},
    error::{AppError, AppResult},
    mailer::{password_reset_mail, verification_mail, Mail},
    roles::repo::RoleStore,
    seed::USER_ROLE,
    state::AppState,
    tokens::{repo_types::TokenKind, services as tokens},
    users::{
        dto::{PasswordConfirmationDto, PasswordResetDto, RegistrationDto, UserDto},
        repo::UserStore,
        repo_types::{normalize_email, User},
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_identity(username: &str, email: &str) -> AppResult<()> {
    if username.trim().is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    // logins accept a username or an email, so the two must never overlap
    if username.contains('@') {
        return Err(AppError::BadRequest("Username must not contain '@'".into()));
    }
    if !is_valid_email(&normalize_email(email)) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(())
}

fn ttl(minutes: i64) -> Duration {
    Duration::minutes(minutes)
}

async fn deliver(state: &AppState, mail: Mail) {
    let to = mail.to.clone();
    if let Err(e) = state.mailer.send(mail).await {
        error!(error = %e, %to, "mail delivery failed");
    }
}

pub async fn create_user(state: &AppState, dto: UserDto) -> AppResult<User> {
    check_identity(&dto.username, &dto.email)?;
    if state
        .store
        .user_exists(dto.id, &dto.username, &dto.email)
        .await?
    {
        warn!(username = %dto.username, "user already exists");
        return Err(AppError::conflict("user"));
    }

    let mut user = User::new(&dto.username, &dto.email);
    if let Some(id) = dto.id {
        user.id = id;
    }
    user.enabled = dto.enabled;
    user.verified = dto.verified;
    user.role = dto.role;
    user.audit = Audit::created(dto.created_by, dto.owner);

    let user = state.store.add_user(user).await?;
    info!(user_id = %user.id, username = %user.username, "user created");
    Ok(user)
}

/// Applies the editable fields of `dto` to user `id`.
///
/// `modifiedBy` comes from the body when given, else from the caller.
pub async fn update_user(
    state: &AppState,
    id: Uuid,
    dto: UserDto,
    principal: Uuid,
) -> AppResult<User> {
    check_identity(&dto.username, &dto.email)?;
    let Some(mut user) = state.store.find_user(id).await? else {
        return Err(AppError::not_found("user"));
    };

    for other in [
        state.store.find_user_by_username_or_email(&dto.username, "").await?,
        state.store.find_user_by_username_or_email("", &dto.email).await?,
    ]
    .into_iter()
    .flatten()
    {
        if other.id != id {
            warn!(user_id = %id, other_id = %other.id, "update collides with another user");
            return Err(AppError::conflict("user"));
        }
    }

    user.username = dto.username.trim().to_string();
    user.email = normalize_email(&dto.email);
    user.enabled = dto.enabled;
    user.verified = dto.verified;
    user.role = dto.role;
    user.audit.owner = dto.owner;
    user.audit.touch(dto.modified_by.or(Some(principal)));

    let user = state
        .store
        .update_user(user)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    info!(user_id = %user.id, "user updated");
    Ok(user)
}

pub async fn register(state: &AppState, dto: RegistrationDto) -> AppResult<User> {
    check_identity(&dto.username, &dto.email)?;
    check_new_password(&dto.password, &dto.matching_password)?;
    if state
        .store
        .user_exists(None, &dto.username, &dto.email)
        .await?
    {
        warn!(username = %dto.username, "registration for existing account");
        return Err(AppError::conflict("user"));
    }

    let mut user = User::new(&dto.username, &dto.email);
    user.password_hash = Some(hash_password(&dto.password)?);
    user.role = state.store.find_role_by_name(USER_ROLE).await?.map(|r| r.id);
    let user = state.store.add_user(user).await?;

    let issued = tokens::issue(
        state.store.as_ref(),
        TokenKind::Verification,
        user.id,
        ttl(state.config.tokens.verification_ttl_minutes),
        Some(user.id),
    )
    .await;
    let token = match issued {
        Ok(token) => token,
        Err(e) => {
            // no account without a verification token: undo so a retry can succeed
            error!(error = ?e, user_id = %user.id, "verification token failed, removing account");
            if let Err(undo) = state.store.delete_user(user.id).await {
                error!(
                    error = ?undo,
                    user_id = %user.id,
                    "account left without token, recover with send_verification"
                );
            }
            return Err(e.into());
        }
    };
    deliver(state, verification_mail(&user.email, &user.username, &token.code)).await;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn verify(state: &AppState, id: Uuid, code: &str, principal: Uuid) -> AppResult<()> {
    if state.store.find_user(id).await?.is_none() {
        return Err(AppError::not_found("user"));
    }
    tokens::consume(
        state.store.as_ref(),
        TokenKind::Verification,
        id,
        code,
        Some(principal),
    )
    .await?;
    state.store.set_user_verified(id, true, Some(principal)).await?;
    info!(user_id = %id, "user verified");
    Ok(())
}

/// Mails a verification code. Returns `false` when the account is already
/// verified and nothing was sent.
pub async fn send_verification(
    state: &AppState,
    email: &str,
    principal: Uuid,
) -> AppResult<bool> {
    let Some(user) = state.store.find_user_by_email(email).await? else {
        return Err(AppError::not_found("user"));
    };
    if user.verified {
        debug!(user_id = %user.id, "already verified, no mail sent");
        return Ok(false);
    }

    let token = tokens::issue(
        state.store.as_ref(),
        TokenKind::Verification,
        user.id,
        ttl(state.config.tokens.verification_ttl_minutes),
        Some(principal),
    )
    .await?;
    deliver(state, verification_mail(&user.email, &user.username, &token.code)).await;
    Ok(true)
}

/// Starts a password reset. Unknown emails are silently ignored.
pub async fn request_password_reset(state: &AppState, email: &str) -> AppResult<()> {
    let Some(user) = state.store.find_user_by_email(email).await? else {
        debug!("password reset for unknown email");
        return Ok(());
    };

    let token = tokens::issue(
        state.store.as_ref(),
        TokenKind::PasswordReset,
        user.id,
        ttl(state.config.tokens.password_reset_ttl_minutes),
        None,
    )
    .await?;
    deliver(state, password_reset_mail(&user.email, &user.username, &token.code)).await;
    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

pub async fn reset_password(state: &AppState, dto: PasswordResetDto) -> AppResult<()> {
    check_new_password(&dto.password, &dto.matching_password)?;
    let Some(user) = state.store.find_user_by_email(&dto.email).await? else {
        return Err(AppError::not_found("user"));
    };
    tokens::consume(
        state.store.as_ref(),
        TokenKind::PasswordReset,
        user.id,
        &dto.token,
        Some(user.id),
    )
    .await?;

    let hash = hash_password(&dto.password)?;
    state
        .store
        .set_user_password(user.id, &hash, Some(user.id))
        .await?;
    info!(user_id = %user.id, "password reset");
    Ok(())
}

pub async fn change_password(
    state: &AppState,
    id: Uuid,
    dto: PasswordConfirmationDto,
    principal: Uuid,
) -> AppResult<()> {
    check_new_password(&dto.password, &dto.matching_password)?;
    if state.store.find_user(id).await?.is_none() {
        return Err(AppError::not_found("user"));
    }
    let hash = hash_password(&dto.password)?;
    if !state
        .store
        .set_user_password(id, &hash, Some(principal))
        .await?
    {
        return Err(AppError::not_found("user"));
    }
    info!(user_id = %id, "password changed");
    Ok(())
}

pub async fn activate(state: &AppState, id: Uuid, enabled: bool, principal: Uuid) -> AppResult<()> {
    if !state
        .store
        .set_user_enabled(id, enabled, Some(principal))
        .await?
    {
        return Err(AppError::not_found("user"));
    }
    info!(user_id = %id, enabled, "user activation changed");
    Ok(())
}
