use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Who created, last touched and owns a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
    pub modified_by: Option<Uuid>,
    pub owner: Option<Uuid>,
}

impl Audit {
    pub fn created(created_by: Option<Uuid>, owner: Option<Uuid>) -> Self {
        Self {
            created_at: now(),
            created_by,
            modified_at: None,
            modified_by: None,
            owner,
        }
    }

    pub fn touch(&mut self, modified_by: Option<Uuid>) {
        self.modified_at = Some(now());
        self.modified_by = modified_by;
    }
}

/// Current time truncated to microseconds, the precision Postgres keeps.
pub fn now() -> OffsetDateTime {
    let t = OffsetDateTime::now_utc();
    t.replace_nanosecond(t.microsecond() * 1_000).unwrap_or(t)
}
