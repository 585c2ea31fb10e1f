use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    audit::Audit,
    error::{AppError, AppResult},
    named::{repo::NamedStore, repo_types::Collection},
    roles::{dto::RoleDto, repo::RoleStore, repo_types::Role},
    store::Store,
};

async fn check_role(store: &dyn Store, dto: &RoleDto) -> AppResult<()> {
    if dto.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    for id in &dto.permissions {
        if store.find_named(Collection::Permissions, *id).await?.is_none() {
            return Err(AppError::BadRequest(format!("unknown permission {id}")));
        }
    }
    Ok(())
}

pub async fn create(store: &dyn Store, dto: RoleDto) -> AppResult<Role> {
    check_role(store, &dto).await?;
    if store.role_exists(dto.id, &dto.name).await? {
        warn!(name = %dto.name, "role already exists");
        return Err(AppError::conflict("role"));
    }

    let mut role = Role::new(&dto.name, dto.permissions);
    if let Some(id) = dto.id {
        role.id = id;
    }
    role.audit = Audit::created(dto.created_by, dto.owner);

    let role = store.add_role(role).await?;
    info!(role_id = %role.id, name = %role.name, "role created");
    Ok(role)
}

pub async fn update(store: &dyn Store, id: Uuid, dto: RoleDto, principal: Uuid) -> AppResult<Role> {
    check_role(store, &dto).await?;
    let Some(mut role) = store.find_role(id).await? else {
        return Err(AppError::not_found("role"));
    };

    role.name = dto.name.trim().to_string();
    role.permissions = dto.permissions;
    role.audit.owner = dto.owner;
    role.audit.touch(dto.modified_by.or(Some(principal)));

    let role = store
        .update_role(role)
        .await?
        .ok_or_else(|| AppError::not_found("role"))?;
    info!(role_id = %id, "role updated");
    Ok(role)
}
