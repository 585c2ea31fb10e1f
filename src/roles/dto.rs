use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::roles::repo_types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDto {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    /// Permission ids.
    #[serde(default)]
    pub permissions: Vec<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub modified_by: Option<Uuid>,
    #[serde(default)]
    pub owner: Option<Uuid>,
}

impl From<Role> for RoleDto {
    fn from(r: Role) -> Self {
        Self {
            id: Some(r.id),
            name: r.name,
            permissions: r.permissions,
            created_at: Some(r.audit.created_at),
            created_by: r.audit.created_by,
            modified_at: r.audit.modified_at,
            modified_by: r.audit.modified_by,
            owner: r.audit.owner,
        }
    }
}
