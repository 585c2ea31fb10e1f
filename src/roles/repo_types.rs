use sqlx::FromRow;
use uuid::Uuid;

use crate::audit::Audit;

/// A named bundle of permissions assigned to users.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<Uuid>,
    #[sqlx(flatten)]
    pub audit: Audit,
}

impl Role {
    pub fn new(name: &str, permissions: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            permissions,
            audit: Audit::created(None, None),
        }
    }
}
