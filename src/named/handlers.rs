use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Extension, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        permission::{authorize, Operation},
    },
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    named::{
        dto::{NameQuery, NamedDto},
        repo::NamedStore,
        repo_types::Collection,
        services,
    },
    state::AppState,
};

/// CRUD routes for one collection, mounted at `/<Collection>`.
pub fn routes(collection: Collection) -> Router<AppState> {
    let base = format!("/{}", collection.resource());
    Router::new()
        .route(&base, get(list).post(add))
        .route(&format!("{base}/get"), get(get_by_name))
        .route(&format!("{base}/search"), get(search))
        .route(&format!("{base}/:id"), get(get_one).put(update).delete(delete))
        .layer(Extension(collection))
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<Vec<NamedDto>>> {
    authorize(state.store.as_ref(), principal, collection.resource(), Operation::Read).await?;
    let rows = state.store.find_all_named(collection).await?;
    Ok(Json(rows.into_iter().map(NamedDto::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_one(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<NamedDto>> {
    authorize(state.store.as_ref(), principal, collection.resource(), Operation::Read).await?;
    let entity = state
        .store
        .find_named(collection, id)
        .await?
        .ok_or_else(|| AppError::not_found(collection.noun()))?;
    Ok(Json(entity.into()))
}

#[instrument(skip(state))]
pub async fn get_by_name(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    AuthUser(principal): AuthUser,
    Query(q): Query<NameQuery>,
) -> AppResult<Json<NamedDto>> {
    authorize(state.store.as_ref(), principal, collection.resource(), Operation::Read).await?;
    let entity = state
        .store
        .find_named_by_name(collection, &q.name)
        .await?
        .ok_or_else(|| AppError::not_found(collection.noun()))?;
    Ok(Json(entity.into()))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    AuthUser(principal): AuthUser,
    Query(q): Query<NameQuery>,
) -> AppResult<Json<Vec<NamedDto>>> {
    authorize(state.store.as_ref(), principal, collection.resource(), Operation::Read).await?;
    let rows = state
        .store
        .find_all_named_containing(collection, &q.name)
        .await?;
    Ok(Json(rows.into_iter().map(NamedDto::from).collect()))
}

#[instrument(skip(state, dto))]
pub async fn add(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    AuthUser(principal): AuthUser,
    Json(dto): Json<NamedDto>,
) -> AppResult<(StatusCode, HeaderMap, Json<NamedDto>)> {
    authorize(state.store.as_ref(), principal, collection.resource(), Operation::Create).await?;
    let entity = services::create(state.store.as_ref(), collection, dto).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/{}/{}", collection.resource(), entity.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(entity.into())))
}

#[instrument(skip(state, dto))]
pub async fn update(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(dto): Json<NamedDto>,
) -> AppResult<Json<NamedDto>> {
    authorize(state.store.as_ref(), principal, collection.resource(), Operation::Update).await?;
    let entity = services::update(state.store.as_ref(), collection, id, dto, principal).await?;
    Ok(Json(entity.into()))
}

#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    authorize(state.store.as_ref(), principal, collection.resource(), Operation::Delete).await?;
    if !state.store.delete_named(collection, id).await? {
        return Err(AppError::not_found(collection.noun()));
    }
    debug!(collection = collection.table(), %id, "deleted");
    Ok(StatusCode::NO_CONTENT)
}
