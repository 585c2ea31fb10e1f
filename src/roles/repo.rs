use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    named::repo::like_pattern,
    roles::repo_types::Role,
    store::{map_write_err, PgStore},
};

const ROLE_SELECT: &str = r#"
    SELECT r.id, r.name,
           COALESCE(
               ARRAY_AGG(rp.permission_id ORDER BY rp.permission_id)
                   FILTER (WHERE rp.permission_id IS NOT NULL),
               '{}'::uuid[]
           ) AS permissions,
           r.created_at, r.created_by, r.modified_at, r.modified_by, r.owner
      FROM roles r
      LEFT JOIN role_permissions rp ON rp.role_id = r.id
"#;

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_all_roles(&self) -> anyhow::Result<Vec<Role>>;

    async fn find_role(&self, id: Uuid) -> anyhow::Result<Option<Role>>;

    /// Roles whose name contains `fragment`, ignoring case.
    async fn find_roles_containing(&self, fragment: &str) -> anyhow::Result<Vec<Role>>;

    /// Exact name match ignoring case; `None` unless exactly one role matches.
    async fn find_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>>;

    async fn role_exists(&self, id: Option<Uuid>, name: &str) -> anyhow::Result<bool>;

    async fn add_role(&self, role: Role) -> anyhow::Result<Role>;

    async fn update_role(&self, role: Role) -> anyhow::Result<Option<Role>>;

    async fn delete_role(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Names of the permissions granted to a user through its role.
    async fn find_permission_names_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<String>>;
}

async fn replace_permissions_tx(
    tx: &mut Transaction<'_, Postgres>,
    role_id: Uuid,
    permissions: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut **tx)
        .await
        .context("clear role permissions")?;
    if !permissions.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permissions)
        .execute(&mut **tx)
        .await
        .context("insert role permissions")?;
    }
    Ok(())
}

#[async_trait]
impl RoleStore for PgStore {
    async fn find_all_roles(&self) -> anyhow::Result<Vec<Role>> {
        let rows = sqlx::query_as::<_, Role>(&format!(
            "{ROLE_SELECT} GROUP BY r.id ORDER BY r.created_at ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list roles")?;
        Ok(rows)
    }

    async fn find_role(&self, id: Uuid) -> anyhow::Result<Option<Role>> {
        let row = sqlx::query_as::<_, Role>(&format!(
            "{ROLE_SELECT} WHERE r.id = $1 GROUP BY r.id"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find role by id")?;
        Ok(row)
    }

    async fn find_roles_containing(&self, fragment: &str) -> anyhow::Result<Vec<Role>> {
        let rows = sqlx::query_as::<_, Role>(&format!(
            "{ROLE_SELECT} WHERE r.name ILIKE $1 GROUP BY r.id ORDER BY r.created_at ASC"
        ))
        .bind(like_pattern(fragment))
        .fetch_all(&self.db)
        .await
        .context("search roles")?;
        Ok(rows)
    }

    async fn find_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        let mut rows = sqlx::query_as::<_, Role>(&format!(
            "{ROLE_SELECT} WHERE LOWER(r.name) = LOWER($1) GROUP BY r.id LIMIT 2"
        ))
        .bind(name.trim())
        .fetch_all(&self.db)
        .await
        .context("find role by name")?;
        if rows.len() == 1 {
            Ok(rows.pop())
        } else {
            Ok(None)
        }
    }

    async fn role_exists(&self, id: Option<Uuid>, name: &str) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM roles WHERE id = $1 OR LOWER(name) = LOWER($2))",
        )
        .bind(id)
        .bind(name.trim())
        .fetch_one(&self.db)
        .await
        .context("check role exists")?;
        Ok(exists)
    }

    async fn add_role(&self, role: Role) -> anyhow::Result<Role> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, created_at, created_by, modified_at, modified_by, owner)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(role.audit.created_at)
        .bind(role.audit.created_by)
        .bind(role.audit.modified_at)
        .bind(role.audit.modified_by)
        .bind(role.audit.owner)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_err(e, "role"))?;
        replace_permissions_tx(&mut tx, role.id, &role.permissions).await?;
        tx.commit().await.context("commit tx")?;

        self.find_role(role.id)
            .await?
            .context("role vanished after insert")
    }

    async fn update_role(&self, role: Role) -> anyhow::Result<Option<Role>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let res = sqlx::query(
            r#"
            UPDATE roles
               SET name = $2, modified_at = $3, modified_by = $4, owner = $5
             WHERE id = $1
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(role.audit.modified_at)
        .bind(role.audit.modified_by)
        .bind(role.audit.owner)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_err(e, "role"))?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        replace_permissions_tx(&mut tx, role.id, &role.permissions).await?;
        tx.commit().await.context("commit tx")?;

        self.find_role(role.id).await
    }

    async fn delete_role(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete role")?;
        Ok(res.rows_affected() > 0)
    }

    async fn find_permission_names_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.name
              FROM users u
              JOIN role_permissions rp ON rp.role_id = u.role
              JOIN permissions p ON p.id = rp.permission_id
             WHERE u.id = $1
             ORDER BY p.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list permissions for user")?;
        Ok(names)
    }
}
