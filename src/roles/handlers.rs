use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        permission::{authorize, Operation, Resource},
    },
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    named::dto::NameQuery,
    roles::{dto::RoleDto, repo::RoleStore, services},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/Roles", get(list_roles).post(add_role))
        .route("/Roles/get", get(get_role_by_name))
        .route("/Roles/search", get(search_roles))
        .route(
            "/Roles/:id",
            get(get_role).put(update_role).delete(delete_role),
        )
}

#[instrument(skip(state))]
pub async fn list_roles(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<Vec<RoleDto>>> {
    authorize(state.store.as_ref(), principal, Resource::Roles, Operation::Read).await?;
    let roles = state.store.find_all_roles().await?;
    Ok(Json(roles.into_iter().map(RoleDto::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_role(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RoleDto>> {
    authorize(state.store.as_ref(), principal, Resource::Roles, Operation::Read).await?;
    let role = state
        .store
        .find_role(id)
        .await?
        .ok_or_else(|| AppError::not_found("role"))?;
    Ok(Json(role.into()))
}

#[instrument(skip(state))]
pub async fn get_role_by_name(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(q): Query<NameQuery>,
) -> AppResult<Json<RoleDto>> {
    authorize(state.store.as_ref(), principal, Resource::Roles, Operation::Read).await?;
    let role = state
        .store
        .find_role_by_name(&q.name)
        .await?
        .ok_or_else(|| AppError::not_found("role"))?;
    Ok(Json(role.into()))
}

#[instrument(skip(state))]
pub async fn search_roles(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(q): Query<NameQuery>,
) -> AppResult<Json<Vec<RoleDto>>> {
    authorize(state.store.as_ref(), principal, Resource::Roles, Operation::Read).await?;
    let roles = state.store.find_roles_containing(&q.name).await?;
    Ok(Json(roles.into_iter().map(RoleDto::from).collect()))
}

#[instrument(skip(state, dto))]
pub async fn add_role(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(dto): Json<RoleDto>,
) -> AppResult<(StatusCode, HeaderMap, Json<RoleDto>)> {
    authorize(state.store.as_ref(), principal, Resource::Roles, Operation::Create).await?;
    let role = services::create(state.store.as_ref(), dto).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/Roles/{}", role.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(role.into())))
}

#[instrument(skip(state, dto))]
pub async fn update_role(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(dto): Json<RoleDto>,
) -> AppResult<Json<RoleDto>> {
    authorize(state.store.as_ref(), principal, Resource::Roles, Operation::Update).await?;
    let role = services::update(state.store.as_ref(), id, dto, principal).await?;
    Ok(Json(role.into()))
}

#[instrument(skip(state))]
pub async fn delete_role(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    authorize(state.store.as_ref(), principal, Resource::Roles, Operation::Delete).await?;
    if !state.store.delete_role(id).await? {
        return Err(AppError::not_found("role"));
    }
    debug!(role_id = %id, "role deleted");
    Ok(StatusCode::NO_CONTENT)
}
