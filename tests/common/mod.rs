use std::collections::{HashMap, HashSet};
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDateTime;
use diesel::connection::SimpleConnection;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

use qrlink::config::{AppConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_SWEEP_INTERVAL_SECONDS};
use qrlink::db::{self, PgPool};
use qrlink::gateway::{
    DeleteError, ShortenError, ShortenerApi, StorageApi, StorageUploadResponse, UploadDestination,
    UploadError,
};
use qrlink::models::{NewQrCode, QrCode};
use qrlink::routes;
use qrlink::state::AppState;
use qrlink::store;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[derive(Default)]
pub struct FakeStorageApi {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    next_file_id: Mutex<Option<String>>,
    upload_counter: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_delete_for: Mutex<HashSet<String>>,
}

impl FakeStorageApi {
    #[allow(dead_code)]
    pub async fn set_next_file_id(&self, file_id: &str) {
        *self.next_file_id.lock().await = Some(file_id.to_string());
    }

    #[allow(dead_code)]
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub async fn fail_delete(&self, file_id: &str) {
        self.fail_delete_for.lock().await.insert(file_id.to_string());
    }

    #[allow(dead_code)]
    pub async fn insert_object(&self, file_id: &str, bytes: Vec<u8>) {
        self.objects.lock().await.insert(file_id.to_string(), bytes);
    }

    #[allow(dead_code)]
    pub async fn get(&self, file_id: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(file_id).cloned()
    }

    #[allow(dead_code)]
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl StorageApi for FakeStorageApi {
    async fn upload(
        &self,
        file: &Path,
        _destination: &UploadDestination,
    ) -> Result<StorageUploadResponse, UploadError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(UploadError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "injected upload failure".to_string(),
            });
        }

        let bytes = tokio::fs::read(file)
            .await
            .map_err(|source| UploadError::Io {
                path: file.display().to_string(),
                source,
            })?;

        let file_id = match self.next_file_id.lock().await.take() {
            Some(id) => id,
            None => format!(
                "file-{}",
                self.upload_counter.fetch_add(1, Ordering::SeqCst)
            ),
        };
        let url = format!("https://fake-store/{file_id}");
        self.objects.lock().await.insert(file_id.clone(), bytes);

        Ok(StorageUploadResponse {
            status_code: Some(200),
            message: Some("uploaded".to_string()),
            url,
            file_id,
        })
    }

    async fn delete(&self, _project_id: &str, file_id: &str) -> Result<(), DeleteError> {
        if self.fail_delete_for.lock().await.contains(file_id) {
            return Err(DeleteError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }

        match self.objects.lock().await.remove(file_id) {
            Some(_) => Ok(()),
            None => Err(DeleteError::NotFound {
                file_id: file_id.to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeShortener {
    next_short: Mutex<Option<String>>,
    counter: AtomicUsize,
}

impl FakeShortener {
    #[allow(dead_code)]
    pub async fn set_next_short(&self, short_url: &str) {
        *self.next_short.lock().await = Some(short_url.to_string());
    }
}

#[async_trait]
impl ShortenerApi for FakeShortener {
    async fn shorten(&self, _long_url: &str) -> Result<String, ShortenError> {
        match self.next_short.lock().await.take() {
            Some(short) => Ok(short),
            None => Ok(format!(
                "https://s/x{}",
                self.counter.fetch_add(1, Ordering::SeqCst)
            )),
        }
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    storage: Arc<FakeStorageApi>,
    shortener: Arc<FakeShortener>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::build(true).await
    }

    #[allow(dead_code)]
    pub async fn new_without_shortener() -> Result<Self> {
        Self::build(false).await
    }

    async fn build(with_shortener: bool) -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            storage_api_base_url: "http://storage.invalid".to_string(),
            storage_project_id: "test-project".to_string(),
            storage_folder_id: "test-folder".to_string(),
            shortener_base_url: with_shortener.then(|| "http://shortener.invalid".to_string()),
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
            http_max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cors_allowed_origin: None,
        };

        let pool = db::init_pool(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let storage = Arc::new(FakeStorageApi::default());
        let shortener = Arc::new(FakeShortener::default());
        let storage_for_state: Arc<dyn StorageApi> = storage.clone();
        let shortener_for_state: Option<Arc<dyn ShortenerApi>> =
            with_shortener.then(|| shortener.clone() as Arc<dyn ShortenerApi>);

        let state = AppState::new(pool, config, storage_for_state, shortener_for_state);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            storage,
            shortener,
        })
    }

    #[allow(dead_code)]
    pub fn storage(&self) -> Arc<FakeStorageApi> {
        self.storage.clone()
    }

    #[allow(dead_code)]
    pub fn shortener(&self) -> Arc<FakeShortener> {
        self.shortener.clone()
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(|conn| truncate_all(conn)).await
    }

    #[allow(dead_code)]
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn load_records(&self) -> Result<Vec<QrCode>> {
        self.with_conn(|conn| {
            use diesel::prelude::*;
            use qrlink::schema::qr_code;
            let rows = qr_code::table
                .order(qr_code::id.asc())
                .load::<QrCode>(conn)
                .context("failed to load qr code records")?;
            Ok(rows)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn record_count(&self) -> Result<i64> {
        self.with_conn(|conn| store::count_records(conn).context("failed to count records"))
            .await
    }

    #[allow(dead_code)]
    pub async fn insert_record(
        &self,
        file_id: &str,
        url: &str,
        expiration_date: NaiveDateTime,
    ) -> Result<QrCode> {
        let record = NewQrCode {
            url: url.to_string(),
            file_id: file_id.to_string(),
            is_active: true,
            expiration_date,
        };
        self.with_conn(move |conn| {
            store::insert_record(conn, record).context("failed to insert qr code record")
        })
        .await
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

#[allow(dead_code)]
pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE qr_code RESTART IDENTITY;")
        .context("failed to truncate tables")?;
    Ok(())
}
