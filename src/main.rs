use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use qrlink::config::AppConfig;
use qrlink::db;
use qrlink::gateway::{self, HttpShortener, HttpStorageApi, ShortenerApi, StorageApi};
use qrlink::routes;
use qrlink::state::AppState;
use qrlink::ExpirationSweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        storage_api = %config.storage_api_base_url,
        shortener_enabled = config.shortener_base_url.is_some(),
        sweep_interval_seconds = config.sweep_interval_seconds,
        "loaded configuration"
    );

    let pool = db::init_pool(&config.database_url, config.database_max_pool_size)?;
    let client = gateway::build_client()?;
    let storage: Arc<dyn StorageApi> = Arc::new(HttpStorageApi::new(
        client.clone(),
        config.storage_api_base_url.clone(),
        config.http_max_body_bytes,
    ));
    let shortener: Option<Arc<dyn ShortenerApi>> = config
        .shortener_base_url
        .as_ref()
        .map(|base| Arc::new(HttpShortener::new(client.clone(), base.clone())) as Arc<dyn ShortenerApi>);

    let state = AppState::new(pool, config, storage, shortener);
    let sweeper = ExpirationSweeper::new(
        state.clone(),
        Duration::from_secs(state.config.sweep_interval_seconds),
    );

    let listen_addr: SocketAddr =
        format!("{}:{}", state.config.server_host, state.config.server_port).parse()?;
    let router = routes::create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);

    tokio::spawn(async move { sweeper.run().await });

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        tracing::info!("received shutdown signal");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
