use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::named::repo_types::NamedEntity;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedDto {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
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

impl From<NamedEntity> for NamedDto {
    fn from(e: NamedEntity) -> Self {
        Self {
            id: Some(e.id),
            name: e.name,
            created_at: Some(e.audit.created_at),
            created_by: e.audit.created_by,
            modified_at: e.audit.modified_at,
            modified_by: e.audit.modified_by,
            owner: e.audit.owner,
        }
    }
}

/// `?name=` query used by the lookup and search endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}
