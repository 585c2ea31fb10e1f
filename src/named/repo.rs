use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    named::repo_types::{Collection, NamedEntity},
    store::{map_write_err, PgStore},
};

const NAMED_COLUMNS: &str = "id, name, created_at, created_by, modified_at, modified_by, owner";

#[async_trait]
pub trait NamedStore: Send + Sync {
    async fn find_all_named(&self, collection: Collection) -> anyhow::Result<Vec<NamedEntity>>;

    async fn find_named(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> anyhow::Result<Option<NamedEntity>>;

    async fn find_all_named_containing(
        &self,
        collection: Collection,
        fragment: &str,
    ) -> anyhow::Result<Vec<NamedEntity>>;

    /// Exact name match ignoring case. `None` when nothing or more than one
    /// record matches.
    async fn find_named_by_name(
        &self,
        collection: Collection,
        name: &str,
    ) -> anyhow::Result<Option<NamedEntity>>;

    /// True when the id or the name (ignoring case) is already used.
    async fn named_exists(
        &self,
        collection: Collection,
        id: Option<Uuid>,
        name: &str,
    ) -> anyhow::Result<bool>;

    async fn add_named(
        &self,
        collection: Collection,
        entity: NamedEntity,
    ) -> anyhow::Result<NamedEntity>;

    async fn update_named(
        &self,
        collection: Collection,
        entity: NamedEntity,
    ) -> anyhow::Result<Option<NamedEntity>>;

    async fn delete_named(&self, collection: Collection, id: Uuid) -> anyhow::Result<bool>;
}

/// Escapes LIKE wildcards so a fragment only matches literally.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl NamedStore for PgStore {
    async fn find_all_named(&self, collection: Collection) -> anyhow::Result<Vec<NamedEntity>> {
        let rows = sqlx::query_as::<_, NamedEntity>(&format!(
            "SELECT {NAMED_COLUMNS} FROM {} ORDER BY created_at ASC",
            collection.table()
        ))
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("list {}", collection.table()))?;
        Ok(rows)
    }

    async fn find_named(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> anyhow::Result<Option<NamedEntity>> {
        let row = sqlx::query_as::<_, NamedEntity>(&format!(
            "SELECT {NAMED_COLUMNS} FROM {} WHERE id = $1",
            collection.table()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("find {} by id", collection.noun()))?;
        Ok(row)
    }

    async fn find_all_named_containing(
        &self,
        collection: Collection,
        fragment: &str,
    ) -> anyhow::Result<Vec<NamedEntity>> {
        let rows = sqlx::query_as::<_, NamedEntity>(&format!(
            "SELECT {NAMED_COLUMNS} FROM {} WHERE name ILIKE $1 ORDER BY created_at ASC",
            collection.table()
        ))
        .bind(like_pattern(fragment))
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("search {}", collection.table()))?;
        Ok(rows)
    }

    async fn find_named_by_name(
        &self,
        collection: Collection,
        name: &str,
    ) -> anyhow::Result<Option<NamedEntity>> {
        let mut rows = sqlx::query_as::<_, NamedEntity>(&format!(
            "SELECT {NAMED_COLUMNS} FROM {} WHERE LOWER(name) = LOWER($1) LIMIT 2",
            collection.table()
        ))
        .bind(name.trim())
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("find {} by name", collection.noun()))?;
        if rows.len() == 1 {
            Ok(rows.pop())
        } else {
            Ok(None)
        }
    }

    async fn named_exists(
        &self,
        collection: Collection,
        id: Option<Uuid>,
        name: &str,
    ) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 OR LOWER(name) = LOWER($2))",
            collection.table()
        ))
        .bind(id)
        .bind(name.trim())
        .fetch_one(&self.db)
        .await
        .with_context(|| format!("check {} exists", collection.noun()))?;
        Ok(exists)
    }

    async fn add_named(
        &self,
        collection: Collection,
        entity: NamedEntity,
    ) -> anyhow::Result<NamedEntity> {
        let row = sqlx::query_as::<_, NamedEntity>(&format!(
            r#"
            INSERT INTO {} (id, name, created_at, created_by, modified_at, modified_by, owner)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {NAMED_COLUMNS}
            "#,
            collection.table()
        ))
        .bind(entity.id)
        .bind(&entity.name)
        .bind(entity.audit.created_at)
        .bind(entity.audit.created_by)
        .bind(entity.audit.modified_at)
        .bind(entity.audit.modified_by)
        .bind(entity.audit.owner)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_write_err(e, collection.noun()))?;
        Ok(row)
    }

    async fn update_named(
        &self,
        collection: Collection,
        entity: NamedEntity,
    ) -> anyhow::Result<Option<NamedEntity>> {
        let row = sqlx::query_as::<_, NamedEntity>(&format!(
            r#"
            UPDATE {}
               SET name = $2, modified_at = $3, modified_by = $4, owner = $5
             WHERE id = $1
            RETURNING {NAMED_COLUMNS}
            "#,
            collection.table()
        ))
        .bind(entity.id)
        .bind(&entity.name)
        .bind(entity.audit.modified_at)
        .bind(entity.audit.modified_by)
        .bind(entity.audit.owner)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_write_err(e, collection.noun()))?;
        Ok(row)
    }

    async fn delete_named(&self, collection: Collection, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", collection.table()))
            .bind(id)
            .execute(&self.db)
            .await
            .with_context(|| format!("delete {}", collection.noun()))?;
        Ok(res.rows_affected() > 0)
    }
}
