use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::{
    named::repo::NamedStore, roles::repo::RoleStore, tokens::repo::TokenStore,
    users::repo::UserStore,
};

pub mod memory;

pub use memory::MemoryStore;

/// Everything the handlers need from persistence.
pub trait Store: UserStore + NamedStore + RoleStore + TokenStore {}

impl<T> Store for T where T: UserStore + NamedStore + RoleStore + TokenStore {}

/// A write collided with a unique constraint.
#[derive(Debug, Error)]
#[error("{0} already exists")]
pub struct Conflict(pub &'static str);

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

/// Maps a unique violation to [`Conflict`], anything else to a plain error.
pub(crate) fn map_write_err(e: sqlx::Error, what: &'static str) -> anyhow::Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Conflict(what).into(),
        _ => anyhow::Error::new(e).context(format!("write {what}")),
    }
}
