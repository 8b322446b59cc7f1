use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
    gateway::{ShortenerApi, StorageApi},
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageApi>,
    pub shortener: Option<Arc<dyn ShortenerApi>>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        storage: Arc<dyn StorageApi>,
        shortener: Option<Arc<dyn ShortenerApi>>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            storage,
            shortener,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
