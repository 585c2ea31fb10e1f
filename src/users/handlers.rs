use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        permission::{active_principal, authorize, Operation, Resource},
    },
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    state::AppState,
    users::{
        dto::{PasswordConfirmationDto, PasswordResetDto, RegistrationDto, UserDto, UserLookup},
        repo::UserStore,
        services,
    },
};

pub fn crud_routes() -> Router<AppState> {
    Router::new()
        .route("/Users", get(list_users).post(add_user))
        .route("/Users/get", get(get_user_by_username_or_email))
        .route(
            "/Users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/Users/register", post(register))
        .route("/Users/verify/:id", put(verify))
        .route("/Users/send_verification", post(send_verification))
        .route(
            "/Users/reset_password",
            post(request_password_reset).put(reset_password),
        )
        .route("/Users/change_password/:id", put(change_password))
        .route("/Users/:id/activate", put(activate))
}

/// Plain-text bodies may also arrive JSON-quoted.
fn text_body(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') {
        if let Ok(s) = serde_json::from_str::<String>(trimmed) {
            return s.trim().to_string();
        }
    }
    trimmed.to_string()
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<Vec<UserDto>>> {
    authorize(state.store.as_ref(), principal, Resource::Users, Operation::Read).await?;
    let users = state.store.find_all_users().await?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserDto>> {
    authorize(state.store.as_ref(), principal, Resource::Users, Operation::Read).await?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn get_user_by_username_or_email(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(q): Query<UserLookup>,
) -> AppResult<Json<UserDto>> {
    authorize(state.store.as_ref(), principal, Resource::Users, Operation::Read).await?;
    let user = state
        .store
        .find_user_by_username_or_email(&q.username, &q.email)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, dto))]
pub async fn add_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(dto): Json<UserDto>,
) -> AppResult<(StatusCode, HeaderMap, Json<UserDto>)> {
    authorize(state.store.as_ref(), principal, Resource::Users, Operation::Create).await?;
    let user = services::create_user(&state, dto).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/Users/{}", user.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(user.into())))
}

#[instrument(skip(state, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(dto): Json<UserDto>,
) -> AppResult<Json<UserDto>> {
    authorize(state.store.as_ref(), principal, Resource::Users, Operation::Update).await?;
    let user = services::update_user(&state, id, dto, principal).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    authorize(state.store.as_ref(), principal, Resource::Users, Operation::Delete).await?;
    if !state.store.delete_user(id).await? {
        return Err(AppError::not_found("user"));
    }
    debug!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, dto))]
pub async fn register(
    State(state): State<AppState>,
    Json(dto): Json<RegistrationDto>,
) -> AppResult<StatusCode> {
    services::register(&state, dto).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn verify(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    body: String,
) -> AppResult<StatusCode> {
    active_principal(state.store.as_ref(), principal).await?;
    services::verify(&state, id, &text_body(&body), principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn send_verification(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    body: String,
) -> AppResult<StatusCode> {
    active_principal(state.store.as_ref(), principal).await?;
    let sent = services::send_verification(&state, &text_body(&body), principal).await?;
    Ok(if sent {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::OK
    })
}

#[instrument(skip(state, body))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    body: String,
) -> AppResult<StatusCode> {
    services::request_password_reset(&state, &text_body(&body)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, dto))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(dto): Json<PasswordResetDto>,
) -> AppResult<StatusCode> {
    services::reset_password(&state, dto).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, dto))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(dto): Json<PasswordConfirmationDto>,
) -> AppResult<StatusCode> {
    if principal == id {
        active_principal(state.store.as_ref(), principal).await?;
    } else {
        authorize(state.store.as_ref(), principal, Resource::Users, Operation::Update).await?;
    }
    services::change_password(&state, id, dto, principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn activate(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    body: String,
) -> AppResult<StatusCode> {
    authorize(state.store.as_ref(), principal, Resource::Users, Operation::Update).await?;
    let enabled = serde_json::from_str::<bool>(body.trim())
        .map_err(|_| AppError::BadRequest("expected true or false".into()))?;
    services::activate(&state, id, enabled, principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::{
        auth::password::verify_password,
        testing::{body_bytes, body_json, send, TestApp},
        tokens::{repo::TokenStore, repo_types::TokenKind},
        users::repo_types::User,
    };

    const DUMMY_USERNAME: &str = "Foo";
    const DUMMY_EMAIL: &str = "foo@email.com";

    struct Fixture {
        t: TestApp,
        creator: User,
        owner: User,
        entity: User,
    }

    async fn fixture() -> Fixture {
        let t = TestApp::new().await;
        let creator = t
            .store
            .add_user(User::new("Foo_Creator", "foo.creator@creation.org"))
            .await
            .unwrap();
        let owner = t
            .store
            .add_user(User::new("Foo_Owner", "foo.owner@creation.org"))
            .await
            .unwrap();
        let mut entity = User::new(DUMMY_USERNAME, DUMMY_EMAIL);
        entity.audit.created_by = Some(creator.id);
        entity.audit.owner = Some(owner.id);
        let entity = t.store.add_user(entity).await.unwrap();
        Fixture {
            t,
            creator,
            owner,
            entity,
        }
    }

    #[test]
    fn text_body_accepts_raw_and_quoted() {
        assert_eq!(text_body(" foo@email.com \n"), "foo@email.com");
        assert_eq!(text_body("\"foo@email.com\""), "foo@email.com");
    }

    #[tokio::test]
    async fn get_user_by_id() {
        let f = fixture().await;
        let token = f.t.admin_token();

        let res = send(&f.t.app, Method::GET, &format!("/Users/{}", Uuid::new_v4()), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(res).await.is_empty());

        let res = send(&f.t.app, Method::GET, &format!("/Users/{}", f.entity.id), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["id"], f.entity.id.to_string());
        assert_eq!(body["username"], DUMMY_USERNAME);
        assert_eq!(body["email"], DUMMY_EMAIL);
        assert_eq!(body["enabled"], true);
        assert_eq!(body["verified"], false);
        assert!(body["createdAt"].is_string());
        assert_eq!(body["createdBy"], f.creator.id.to_string());
        assert!(body["modifiedAt"].is_null());
        assert!(body["modifiedBy"].is_null());
        assert_eq!(body["owner"], f.owner.id.to_string());
        assert!(body.get("password").is_none());
        assert!(body.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn get_all_users() {
        let f = fixture().await;
        let res = send(&f.t.app, Method::GET, "/Users", Some(&f.t.admin_token()), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        // the three fixture users plus the seeded admin
        assert_eq!(body_json(res).await.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn add_user_then_conflict() {
        let f = fixture().await;
        let token = f.t.admin_token();
        let body = json!({"username": "Bar", "email": "bar@email.com"}).to_string();

        let res = send(&f.t.app, Method::POST, "/Users", Some(&token), Some(body.clone())).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let location = res.headers().get(header::LOCATION).cloned();
        let created = body_json(res).await;
        assert_eq!(
            location.unwrap().to_str().unwrap(),
            format!("/Users/{}", created["id"].as_str().unwrap())
        );
        assert_eq!(created["username"], "Bar");
        assert_eq!(created["email"], "bar@email.com");
        assert!(created["createdAt"].is_string());
        assert!(created["createdBy"].is_null());
        assert!(created["modifiedAt"].is_null());
        assert!(created["modifiedBy"].is_null());

        let res = send(&f.t.app, Method::POST, "/Users", Some(&token), Some(body)).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert!(body_bytes(res).await.is_empty());
    }

    #[tokio::test]
    async fn update_user() {
        let f = fixture().await;
        let token = f.t.admin_token();

        let dummy = json!({"id": Uuid::new_v4(), "username": "God", "email": "god@creation.org"});
        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/{}", dummy["id"].as_str().unwrap()),
            Some(&token),
            Some(dummy.to_string()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let mut dto = UserDto::from(f.entity.clone());
        dto.email = "new@email.com".into();
        dto.modified_by = Some(f.owner.id);
        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/{}", f.entity.id),
            Some(&token),
            Some(serde_json::to_string(&dto).unwrap()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["id"], f.entity.id.to_string());
        assert_eq!(body["username"], DUMMY_USERNAME);
        assert_eq!(body["email"], "new@email.com");
        assert_eq!(body["enabled"], true);
        assert_eq!(body["verified"], false);
        assert_eq!(body["createdBy"], f.creator.id.to_string());
        assert!(body["modifiedAt"].is_string());
        assert_eq!(body["modifiedBy"], f.owner.id.to_string());
        assert_eq!(body["owner"], f.owner.id.to_string());
    }

    #[tokio::test]
    async fn update_user_rejects_taken_email() {
        let f = fixture().await;
        let mut dto = UserDto::from(f.entity.clone());
        dto.email = f.owner.email.clone();
        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/{}", f.entity.id),
            Some(&f.t.admin_token()),
            Some(serde_json::to_string(&dto).unwrap()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_user() {
        let f = fixture().await;
        let token = f.t.admin_token();

        let res = send(&f.t.app, Method::DELETE, &format!("/Users/{}", Uuid::new_v4()), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(&f.t.app, Method::DELETE, &format!("/Users/{}", f.entity.id), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(f.t.store.find_user(f.entity.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_user_by_username_or_email() {
        let f = fixture().await;
        let token = f.t.admin_token();

        let res = send(&f.t.app, Method::GET, "/Users/get?username=&email=", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(res).await.is_empty());

        let res = send(
            &f.t.app,
            Method::GET,
            "/Users/get?username=Foo&email=foo%40email.com",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["id"], f.entity.id.to_string());
        assert_eq!(body["createdBy"], f.creator.id.to_string());
        assert_eq!(body["owner"], f.owner.id.to_string());
    }

    #[tokio::test]
    async fn reset_password() {
        let f = fixture().await;

        let res = send(&f.t.app, Method::POST, "/Users/reset_password", None, Some("dummy_email".into())).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(f.t.mailer.messages().is_empty());

        let res = send(&f.t.app, Method::POST, "/Users/reset_password", None, Some(DUMMY_EMAIL.into())).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let tokens = f.t.store.find_all_tokens(TokenKind::PasswordReset).await.unwrap();
        assert_eq!(tokens.len(), 1);
        let token = tokens[0].clone();
        assert!(!token.code.is_empty());
        assert!(f.t.mailer.messages()[0].body.contains(&token.code));

        let dto = PasswordResetDto {
            email: DUMMY_EMAIL.into(),
            token: token.code.clone(),
            password: "password".into(),
            matching_password: "password".into(),
        };
        let res = send(
            &f.t.app,
            Method::PUT,
            "/Users/reset_password",
            None,
            Some(serde_json::to_string(&dto).unwrap()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let updated = f.t.store.find_token(TokenKind::PasswordReset, token.id).await.unwrap().unwrap();
        assert!(token.expiry_date > updated.expiry_date);

        let user = f.t.store.find_user(f.entity.id).await.unwrap().unwrap();
        assert!(verify_password("password", user.password_hash.as_deref().unwrap()).unwrap());

        // the code is single use
        let res = send(
            &f.t.app,
            Method::PUT,
            "/Users/reset_password",
            None,
            Some(serde_json::to_string(&dto).unwrap()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn change_password() {
        let f = fixture().await;
        let token = f.t.admin_token();
        let dto = json!({"password": "password", "matchingPassword": "password"}).to_string();

        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/change_password/{}", Uuid::new_v4()),
            Some(&token),
            Some(dto.clone()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/change_password/{}", f.entity.id),
            Some(&token),
            Some(dto),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let user = f.t.store.find_user_by_email(DUMMY_EMAIL).await.unwrap().unwrap();
        assert!(verify_password("password", user.password_hash.as_deref().unwrap()).unwrap());
    }

    #[tokio::test]
    async fn change_password_rejects_mismatch() {
        let f = fixture().await;
        let dto = json!({"password": "password", "matchingPassword": "passw0rd"}).to_string();
        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/change_password/{}", f.entity.id),
            Some(&f.t.admin_token()),
            Some(dto),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn activate() {
        let f = fixture().await;
        let token = f.t.admin_token();

        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/{}/activate", Uuid::new_v4()),
            Some(&token),
            Some("true".into()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/{}/activate", f.entity.id),
            Some(&token),
            Some("false".into()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let user = f.t.store.find_user_by_email(DUMMY_EMAIL).await.unwrap().unwrap();
        assert!(!user.enabled);
    }

    #[tokio::test]
    async fn register_and_verify() {
        let f = fixture().await;
        let token = f.t.admin_token();
        let registration = json!({
            "username": "Bar",
            "email": "bar@monogramm.io",
            "password": "password",
            "matchingPassword": "password",
        })
        .to_string();

        let res = send(&f.t.app, Method::POST, "/Users/register", None, Some(registration.clone())).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(res).await.is_empty());

        let tokens = f.t.store.find_all_tokens(TokenKind::Verification).await.unwrap();
        assert_eq!(tokens.len(), 1);
        let issued = tokens[0].clone();

        let res = send(&f.t.app, Method::POST, "/Users/register", None, Some(registration)).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert!(body_bytes(res).await.is_empty());

        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/verify/{}", Uuid::new_v4()),
            Some(&token),
            Some(issued.code.clone()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let registered = f.t.store.find_user_by_email("bar@monogramm.io").await.unwrap().unwrap();
        assert!(registered.password_hash.is_some());
        assert!(registered.role.is_some());
        assert!(f.t.mailer.messages()[0].body.contains(&issued.code));
        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/verify/{}", registered.id),
            Some(&token),
            Some(issued.code.clone()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let used = f.t.store.find_token(TokenKind::Verification, issued.id).await.unwrap().unwrap();
        assert!(issued.expiry_date > used.expiry_date);
        assert!(f.t.store.find_user(registered.id).await.unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn register_rejects_mismatched_passwords() {
        let f = fixture().await;
        let registration = json!({
            "username": "Bar",
            "email": "bar@monogramm.io",
            "password": "password",
            "matchingPassword": "different",
        })
        .to_string();
        let res = send(&f.t.app, Method::POST, "/Users/register", None, Some(registration)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(f.t.store.find_user_by_email("bar@monogramm.io").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn send_verification_and_verify() {
        let f = fixture().await;
        let token = f.t.admin_token();

        // the seeded admin is already verified: nothing is issued
        let res = send(
            &f.t.app,
            Method::POST,
            "/Users/send_verification",
            Some(&token),
            Some(f.t.admin.email.clone()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(f.t.store.find_all_tokens(TokenKind::Verification).await.unwrap().is_empty());

        let res = send(
            &f.t.app,
            Method::POST,
            "/Users/send_verification",
            Some(&token),
            Some(DUMMY_EMAIL.into()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let tokens = f.t.store.find_all_tokens(TokenKind::Verification).await.unwrap();
        assert_eq!(tokens.len(), 1);
        let issued = tokens[0].clone();

        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/verify/{}", Uuid::new_v4()),
            Some(&token),
            Some(issued.code.clone()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/verify/{}", f.entity.id),
            Some(&token),
            Some(issued.code.clone()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        assert!(f.t.store.find_user_by_email(DUMMY_EMAIL).await.unwrap().unwrap().verified);
        let used = f.t.store.find_token(TokenKind::Verification, issued.id).await.unwrap().unwrap();
        assert!(issued.expiry_date > used.expiry_date);
    }

    #[tokio::test]
    async fn crud_requires_permission() {
        let f = fixture().await;
        let user_token = f.t.token_for(f.entity.id);

        let res = send(&f.t.app, Method::GET, "/Users", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(&f.t.app, Method::GET, "/Users", Some(&user_token), None).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        // changing one's own password needs no permission
        let dto = json!({"password": "password", "matchingPassword": "password"}).to_string();
        let res = send(
            &f.t.app,
            Method::PUT,
            &format!("/Users/change_password/{}", f.entity.id),
            Some(&user_token),
            Some(dto),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn malformed_input_is_a_json_bad_request() {
        let f = fixture().await;

        let res = send(
            &f.t.app,
            Method::POST,
            "/Users/register",
            None,
            Some(json!({"username": "Bar", "email": "bar@monogramm.io", "password": "password"}).to_string()),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["error"], "BAD_REQUEST");
        assert!(body["message"].as_str().unwrap().contains("matchingPassword"));

        let res = send(&f.t.app, Method::POST, "/Users/register", None, Some("{not json".into())).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "BAD_REQUEST");

        let res = send(&f.t.app, Method::GET, "/Users/not-a-uuid", Some(&f.t.admin_token()), None).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn username_cannot_look_like_an_email() {
        let f = fixture().await;
        let registration = json!({
            "username": DUMMY_EMAIL,
            "email": "bar@monogramm.io",
            "password": "password",
            "matchingPassword": "password",
        })
        .to_string();

        let res = send(&f.t.app, Method::POST, "/Users/register", None, Some(registration)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(f.t.store.find_user_by_email("bar@monogramm.io").await.unwrap().is_none());
    }
}
