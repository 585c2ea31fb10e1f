use std::fmt;

use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    roles::repo::RoleStore,
    store::Store,
    users::{repo::UserStore, repo_types::User},
};

/// Resources guarded by permissions. The display name is also the URL prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Types,
    Roles,
    Permissions,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Users,
        Resource::Types,
        Resource::Roles,
        Resource::Permissions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Users => "Users",
            Resource::Types => "Types",
            Resource::Roles => "Roles",
            Resource::Permissions => "Permissions",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "READ",
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

/// `Users` + `Read` -> `Users_READ`.
pub fn permission_name(resource: Resource, op: Operation) -> String {
    format!("{}_{}", resource.as_str(), op.as_str())
}

pub fn all_permission_names(resource: Resource) -> Vec<String> {
    Operation::ALL
        .iter()
        .map(|op| permission_name(resource, *op))
        .collect()
}

/// Loads the principal and refuses deleted or disabled accounts.
pub async fn active_principal(store: &dyn Store, user_id: Uuid) -> AppResult<User> {
    match store.find_user(user_id).await? {
        Some(user) if user.enabled => Ok(user),
        Some(_) => {
            warn!(%user_id, "disabled principal");
            Err(AppError::Unauthorized("account disabled".into()))
        }
        None => {
            warn!(%user_id, "unknown principal");
            Err(AppError::Unauthorized("unknown account".into()))
        }
    }
}

/// Fails with 403 unless the user's role grants `resource`/`op`.
pub async fn authorize(
    store: &dyn Store,
    user_id: Uuid,
    resource: Resource,
    op: Operation,
) -> AppResult<()> {
    active_principal(store, user_id).await?;
    let wanted = permission_name(resource, op);
    let granted = store.find_permission_names_for_user(user_id).await?;
    if granted.iter().any(|p| p.eq_ignore_ascii_case(&wanted)) {
        Ok(())
    } else {
        warn!(%user_id, permission = %wanted, "permission denied");
        Err(AppError::Forbidden(format!("missing permission {wanted}")))
    }
}
