use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    audit::Audit,
    error::{AppError, AppResult},
    named::{
        dto::NamedDto,
        repo::NamedStore,
        repo_types::{Collection, NamedEntity},
    },
    store::Store,
};

fn check_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    Ok(())
}

pub async fn create(
    store: &dyn Store,
    collection: Collection,
    dto: NamedDto,
) -> AppResult<NamedEntity> {
    check_name(&dto.name)?;
    if store.named_exists(collection, dto.id, &dto.name).await? {
        warn!(collection = collection.table(), name = %dto.name, "already exists");
        return Err(AppError::conflict(collection.noun()));
    }

    let mut entity = NamedEntity::new(&dto.name);
    if let Some(id) = dto.id {
        entity.id = id;
    }
    entity.audit = Audit::created(dto.created_by, dto.owner);

    let entity = store.add_named(collection, entity).await?;
    info!(collection = collection.table(), id = %entity.id, "created");
    Ok(entity)
}

pub async fn update(
    store: &dyn Store,
    collection: Collection,
    id: Uuid,
    dto: NamedDto,
    principal: Uuid,
) -> AppResult<NamedEntity> {
    check_name(&dto.name)?;
    let Some(mut entity) = store.find_named(collection, id).await? else {
        return Err(AppError::not_found(collection.noun()));
    };

    entity.name = dto.name.trim().to_string();
    entity.audit.owner = dto.owner;
    entity.audit.touch(dto.modified_by.or(Some(principal)));

    let entity = store
        .update_named(collection, entity)
        .await?
        .ok_or_else(|| AppError::not_found(collection.noun()))?;
    info!(collection = collection.table(), %id, "updated");
    Ok(entity)
}
