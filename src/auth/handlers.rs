use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::verify_password,
        permission::active_principal,
    },
    error::{AppError, AppResult},
    extract::Json,
    roles::repo::RoleStore,
    state::AppState,
    users::{repo::UserStore, repo_types::User},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

async fn issue_pair(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    let permissions = state.store.find_permission_names_for_user(user.id).await?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::new(user, permissions),
    })
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let login = payload.login.trim();
    if login.is_empty() {
        return Err(AppError::BadRequest("login is required".into()));
    }

    let Some(user) = state
        .store
        .find_user_by_username_or_email(login, login)
        .await?
    else {
        warn!(login = %login, "login unknown account");
        return Err(invalid_credentials());
    };

    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "login on account without password");
        return Err(invalid_credentials());
    };
    if !verify_password(&payload.password, hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }
    if !user.enabled {
        warn!(user_id = %user.id, "login on disabled account");
        return Err(AppError::Unauthorized("account disabled".into()));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_pair(&state, user).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = active_principal(state.store.as_ref(), claims.sub).await?;
    Ok(Json(issue_pair(&state, user).await?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = active_principal(state.store.as_ref(), user_id).await?;
    let permissions = state.store.find_permission_names_for_user(user_id).await?;
    Ok(Json(PublicUser::new(user, permissions)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::testing::{body_json, send, TestApp};

    #[test]
    fn public_user_serialization() {
        let user = User::new("foo", "test@example.com");
        let json = serde_json::to_string(&PublicUser::new(user, vec![])).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("password"));
    }

    #[tokio::test]
    async fn login_refresh_and_me() {
        let t = TestApp::new().await;

        let res = send(
            &t.app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"login": "ADMIN", "password": "admin-password"}).to_string()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["user"]["username"], "admin");
        assert!(body["user"]["permissions"]
            .as_array()
            .unwrap()
            .contains(&json!("Users_READ")));
        let access = body["accessToken"].as_str().unwrap().to_string();
        let refresh = body["refreshToken"].as_str().unwrap().to_string();

        let res = send(&t.app, Method::GET, "/me", Some(&access), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["email"], "admin@starter.local");

        // a refresh token is not accepted as an access token
        let res = send(&t.app, Method::GET, "/me", Some(&refresh), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(
            &t.app,
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh }).to_string()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let t = TestApp::new().await;

        let res = send(
            &t.app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"login": "admin", "password": "wrong-password"}).to_string()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(
            &t.app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"login": "nobody", "password": "whatever"}).to_string()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_requires_token() {
        let t = TestApp::new().await;
        let res = send(&t.app, Method::GET, "/me", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
