use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    store::{map_write_err, PgStore},
    tokens::repo_types::{Token, TokenKind},
};

const TOKEN_COLUMNS: &str =
    "id, user_id, code, expiry_date, created_at, created_by, modified_at, modified_by, owner";

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn find_all_tokens(&self, kind: TokenKind) -> anyhow::Result<Vec<Token>>;

    async fn find_token(&self, kind: TokenKind, id: Uuid) -> anyhow::Result<Option<Token>>;

    async fn find_token_by_user(
        &self,
        kind: TokenKind,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Token>>;

    /// Inserts the token, or overwrites the stored one with the same id.
    async fn save_token(&self, kind: TokenKind, token: Token) -> anyhow::Result<Token>;

    async fn delete_token(&self, kind: TokenKind, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl TokenStore for PgStore {
    async fn find_all_tokens(&self, kind: TokenKind) -> anyhow::Result<Vec<Token>> {
        let rows = sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM {} ORDER BY created_at ASC",
            kind.table()
        ))
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("list {}s", kind.noun()))?;
        Ok(rows)
    }

    async fn find_token(&self, kind: TokenKind, id: Uuid) -> anyhow::Result<Option<Token>> {
        let row = sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM {} WHERE id = $1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("find {}", kind.noun()))?;
        Ok(row)
    }

    async fn find_token_by_user(
        &self,
        kind: TokenKind,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Token>> {
        let row = sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM {} WHERE user_id = $1",
            kind.table()
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("find {} by user", kind.noun()))?;
        Ok(row)
    }

    async fn save_token(&self, kind: TokenKind, token: Token) -> anyhow::Result<Token> {
        let row = sqlx::query_as::<_, Token>(&format!(
            r#"
            INSERT INTO {} (id, user_id, code, expiry_date,
                            created_at, created_by, modified_at, modified_by, owner)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
               SET code = EXCLUDED.code,
                   expiry_date = EXCLUDED.expiry_date,
                   modified_at = EXCLUDED.modified_at,
                   modified_by = EXCLUDED.modified_by
            RETURNING {TOKEN_COLUMNS}
            "#,
            kind.table()
        ))
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.code)
        .bind(token.expiry_date)
        .bind(token.audit.created_at)
        .bind(token.audit.created_by)
        .bind(token.audit.modified_at)
        .bind(token.audit.modified_by)
        .bind(token.audit.owner)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_write_err(e, kind.noun()))?;
        Ok(row)
    }

    async fn delete_token(&self, kind: TokenKind, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&self.db)
            .await
            .with_context(|| format!("delete {}", kind.noun()))?;
        Ok(res.rows_affected() > 0)
    }
}
