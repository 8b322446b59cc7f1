use std::env;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use qrlink::config::AppConfig;
use qrlink::db;
use qrlink::gateway::{self, HttpShortener, HttpStorageApi, ShortenerApi, StorageApi};
use qrlink::state::AppState;
use qrlink::sweep;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("sweep-expired") => sweep_expired().await?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\nUsage: maintenance sweep-expired");
            std::process::exit(1);
        }
        None => {
            eprintln!("Usage: maintenance sweep-expired");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn sweep_expired() -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        storage_api = %config.storage_api_base_url,
        "loaded configuration"
    );

    let pool = db::init_pool(&config.database_url, 1)?;
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
    let outcome = sweep::sweep_once(&state).await?;

    println!(
        "Sweep finished: {} expired, {} failed.",
        outcome.expired, outcome.failed
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
