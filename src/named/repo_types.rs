use sqlx::FromRow;
use uuid::Uuid;

use crate::{audit::Audit, auth::permission::Resource};

/// The name-keyed collections that share one repository shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Types,
    Permissions,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Types, Collection::Permissions];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Types => "types",
            Collection::Permissions => "permissions",
        }
    }

    pub fn resource(self) -> Resource {
        match self {
            Collection::Types => Resource::Types,
            Collection::Permissions => Resource::Permissions,
        }
    }

    /// Singular noun for logs and conflict messages.
    pub fn noun(self) -> &'static str {
        match self {
            Collection::Types => "type",
            Collection::Permissions => "permission",
        }
    }
}

/// A record identified by a case-insensitively unique name.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct NamedEntity {
    pub id: Uuid,
    pub name: String,
    #[sqlx(flatten)]
    pub audit: Audit,
}

impl NamedEntity {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            audit: Audit::created(None, None),
        }
    }
}
