use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::{AppConfig, StoreBackend};
use crate::users::{
    memory::InMemoryUserStore,
    repo::{PgUserStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let users: Arc<dyn UserStore> = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("database url missing for postgres store")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    warn!(error = %e, "migration failed; continuing");
                }
                info!("using postgres user store");
                Arc::new(PgUserStore::new(db))
            }
            StoreBackend::Memory => {
                info!("using in-memory user store");
                Arc::new(InMemoryUserStore::default())
            }
        };

        Ok(Self {
            users,
            config: Arc::new(config),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreBackend::Memory,
            database_url: None,
            seed_users: false,
        };
        Self {
            users: Arc::new(InMemoryUserStore::default()),
            config: Arc::new(config),
        }
    }
}
