//! Session Tracker
//!
//! Tracks user sessions and their timestamped events in a single
//! key-value table with one secondary index:
//! - Session and event CRUD by composite key
//! - Sessions-by-user lookup through the index
//! - Timelines, analytics, and partition audits
//! - Bounded-concurrency batch tracking

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use kv_store::{health::check_connection, StoreBackend, StoreConfig};
use session_engine::{IngestConfig, SessionEngine, SystemClock};
use telemetry::{init_tracing, TracingConfig};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    ingest: IngestConfig,

    #[serde(default)]
    logging: TracingConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store: StoreConfig::default(),
            ingest: IngestConfig::default(),
            logging: TracingConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config.logging);

    info!("Starting Session Tracker v{}", env!("CARGO_PKG_VERSION"));
    info!(
        backend = ?config.store.backend,
        table = %config.store.table_name,
        endpoint = config.store.endpoint_url.as_deref().unwrap_or("default"),
        "Loaded store config"
    );

    let store = kv_store::connect(&config.store)
        .await
        .context("Failed to open key-value store")?;

    if check_connection(store.as_ref()).await {
        info!("Store connection: healthy");
    } else {
        // Keep serving; /health/ready reports the outage
        error!("Store connection: unhealthy");
    }

    let engine = SessionEngine::with_clock(store, std::sync::Arc::new(SystemClock), config.ingest);
    let app = router(AppState::new(engine));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("TRACKER")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides; nested parsing mangles underscored field names
    if let Ok(backend) = std::env::var("TRACKER_STORE_BACKEND") {
        config.store.backend = match backend.to_lowercase().as_str() {
            "dynamodb" => StoreBackend::Dynamodb,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("Unknown store backend '{}'", other),
        };
    }
    if let Ok(table) = std::env::var("TRACKER_STORE_TABLE_NAME") {
        config.store.table_name = table;
    }
    if let Ok(index) = std::env::var("TRACKER_STORE_INDEX_NAME") {
        config.store.index_name = index;
    }
    if let Ok(endpoint) = std::env::var("TRACKER_STORE_ENDPOINT_URL") {
        config.store.endpoint_url = Some(endpoint);
    }
    if let Ok(region) = std::env::var("TRACKER_STORE_REGION") {
        config.store.region = Some(region);
    }
    if let Ok(json) = std::env::var("LOG_JSON") {
        config.logging.json = json == "1" || json.eq_ignore_ascii_case("true");
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
