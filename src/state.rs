use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{self, MemoryRepository, PgRepository, Repository};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Repository>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Connects the Postgres pool and brings the schema up to date.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database_url, config.max_connections).await?;
        db::migrate(&pool).await;

        Ok(Self::from_parts(
            Arc::new(PgRepository::new(pool)),
            Arc::new(config),
        ))
    }

    /// Users and messages kept in process; nothing survives a restart.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(Arc::new(MemoryRepository::new()), Arc::new(config))
    }

    pub fn from_parts(db: Arc<dyn Repository>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::in_memory(AppConfig {
            database_url: String::new(),
            max_connections: 1,
            per_page: 30,
            session: crate::config::SessionConfig {
                database_url: String::new(),
                secret_key: "test".into(),
                ttl_minutes: 5,
                secure_cookie: false,
            },
        })
    }
}
