use anyhow::Context;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{
        password::hash_password,
        permission::{all_permission_names, permission_name, Operation, Resource},
    },
    config::AppConfig,
    named::{
        repo::NamedStore,
        repo_types::{Collection, NamedEntity},
    },
    roles::{repo::RoleStore, repo_types::Role},
    store::Store,
    users::{repo::UserStore, repo_types::User},
};

pub const ADMIN_ROLE: &str = "Administrator";
pub const USER_ROLE: &str = "User";

/// What the loader found or created.
#[derive(Debug, Clone)]
pub struct InitialData {
    pub permissions: Vec<NamedEntity>,
    pub roles: Vec<Role>,
    pub admin: Option<User>,
}

async fn ensure_permission(store: &dyn Store, name: &str) -> anyhow::Result<NamedEntity> {
    if let Some(found) = store.find_named_by_name(Collection::Permissions, name).await? {
        return Ok(found);
    }
    let created = store
        .add_named(Collection::Permissions, NamedEntity::new(name))
        .await
        .with_context(|| format!("create permission {name}"))?;
    info!(permission = %name, "permission created");
    Ok(created)
}

/// Creates the role if missing, and grants it any of `permissions` it lacks.
async fn ensure_role(
    store: &dyn Store,
    name: &str,
    permissions: Vec<Uuid>,
) -> anyhow::Result<Role> {
    let Some(mut role) = store.find_role_by_name(name).await? else {
        let role = store
            .add_role(Role::new(name, permissions))
            .await
            .with_context(|| format!("create role {name}"))?;
        info!(role = %name, "role created");
        return Ok(role);
    };

    let missing: Vec<_> = permissions
        .into_iter()
        .filter(|p| !role.permissions.contains(p))
        .collect();
    if missing.is_empty() {
        return Ok(role);
    }
    role.permissions.extend(missing);
    role.audit.touch(None);
    store
        .update_role(role)
        .await?
        .with_context(|| format!("role {name} vanished during seeding"))
}

/// Loads permissions, default roles and the configured administrator.
/// Safe to run on every start.
pub async fn load_initial_data(store: &dyn Store, config: &AppConfig) -> anyhow::Result<InitialData> {
    let mut permissions = Vec::new();
    for resource in Resource::ALL {
        for name in all_permission_names(resource) {
            permissions.push(ensure_permission(store, &name).await?);
        }
    }

    let admin_role = ensure_role(
        store,
        ADMIN_ROLE,
        permissions.iter().map(|p| p.id).collect(),
    )
    .await?;
    let type_reader = permission_name(Resource::Types, Operation::Read);
    let user_role = ensure_role(
        store,
        USER_ROLE,
        permissions
            .iter()
            .filter(|p| p.name == type_reader)
            .map(|p| p.id)
            .collect(),
    )
    .await?;

    let admin = match &config.admin {
        Some(cfg) => {
            let existing = store
                .find_user_by_username_or_email(&cfg.username, &cfg.email)
                .await?;
            match existing {
                Some(user) => Some(user),
                None => {
                    let mut user = User::new(&cfg.username, &cfg.email);
                    user.password_hash = Some(hash_password(&cfg.password)?);
                    user.verified = true;
                    user.role = Some(admin_role.id);
                    let user = store.add_user(user).await.context("create admin user")?;
                    info!(user_id = %user.id, username = %user.username, "admin user created");
                    Some(user)
                }
            }
        }
        None => None,
    };

    Ok(InitialData {
        permissions,
        roles: vec![admin_role, user_role],
        admin,
    })
}
