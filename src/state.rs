use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, StoreBackend};
use crate::mailer::{LogMailer, Mailer};
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store {
            StoreBackend::Postgres => {
                let pg = PgStore::connect(&config.database_url).await?;
                pg.migrate().await?;
                info!("using postgres store");
                Arc::new(pg) as Arc<dyn Store>
            }
            StoreBackend::Memory => {
                info!("using in-memory store");
                Arc::new(MemoryStore::default()) as Arc<dyn Store>
            }
        };

        Ok(Self::from_parts(store, Arc::new(LogMailer), config))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }
}
