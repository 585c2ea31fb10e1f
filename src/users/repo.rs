use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    audit,
    store::{map_write_err, PgStore},
    users::repo_types::User,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, enabled, verified, role, \
     created_at, created_by, modified_at, modified_by, owner";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_all_users(&self) -> anyhow::Result<Vec<User>>;

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Case-insensitive lookup by email.
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// First user whose username or email matches, ignoring case. Empty
    /// arguments never match.
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> anyhow::Result<Option<User>>;

    /// True when the id, the username or the email is already taken.
    async fn user_exists(
        &self,
        id: Option<Uuid>,
        username: &str,
        email: &str,
    ) -> anyhow::Result<bool>;

    async fn add_user(&self, user: User) -> anyhow::Result<User>;

    /// Replaces the stored row; `None` if no user has that id.
    async fn update_user(&self, user: User) -> anyhow::Result<Option<User>>;

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn set_user_password(
        &self,
        id: Uuid,
        password_hash: &str,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool>;

    async fn set_user_enabled(
        &self,
        id: Uuid,
        enabled: bool,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool>;

    async fn set_user_verified(
        &self,
        id: Uuid,
        verified: bool,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool>;
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_all_users(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows)
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE ($1 <> '' AND LOWER(username) = LOWER($1))
                OR ($2 <> '' AND LOWER(email) = LOWER($2))
             ORDER BY created_at ASC
             LIMIT 1
            "#
        ))
        .bind(username.trim())
        .bind(email.trim())
        .fetch_optional(&self.db)
        .await
        .context("find user by username or email")?;
        Ok(user)
    }

    async fn user_exists(
        &self,
        id: Option<Uuid>,
        username: &str,
        email: &str,
    ) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                 WHERE id = $1
                    OR LOWER(username) = LOWER($2)
                    OR LOWER(email) = LOWER($3)
            )
            "#,
        )
        .bind(id)
        .bind(username.trim())
        .bind(email.trim())
        .fetch_one(&self.db)
        .await
        .context("check user exists")?;
        Ok(exists)
    }

    async fn add_user(&self, user: User) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, enabled, verified, role,
                               created_at, created_by, modified_at, modified_by, owner)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.enabled)
        .bind(user.verified)
        .bind(user.role)
        .bind(user.audit.created_at)
        .bind(user.audit.created_by)
        .bind(user.audit.modified_at)
        .bind(user.audit.modified_by)
        .bind(user.audit.owner)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_write_err(e, "user"))?;
        Ok(row)
    }

    async fn update_user(&self, user: User) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET username = $2, email = $3, password_hash = $4, enabled = $5,
                   verified = $6, role = $7, modified_at = $8, modified_by = $9, owner = $10
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.enabled)
        .bind(user.verified)
        .bind(user.role)
        .bind(user.audit.modified_at)
        .bind(user.audit.modified_by)
        .bind(user.audit.owner)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_write_err(e, "user"))?;
        Ok(row)
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_user_password(
        &self,
        id: Uuid,
        password_hash: &str,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET password_hash = $2, modified_at = $3, modified_by = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(audit::now())
        .bind(modified_by)
        .execute(&self.db)
        .await
        .context("set user password")?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_user_enabled(
        &self,
        id: Uuid,
        enabled: bool,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET enabled = $2, modified_at = $3, modified_by = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(enabled)
        .bind(audit::now())
        .bind(modified_by)
        .execute(&self.db)
        .await
        .context("set user enabled")?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_user_verified(
        &self,
        id: Uuid,
        verified: bool,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET verified = $2, modified_at = $3, modified_by = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(verified)
        .bind(audit::now())
        .bind(modified_by)
        .execute(&self.db)
        .await
        .context("set user verified")?;
        Ok(res.rows_affected() > 0)
    }
}
