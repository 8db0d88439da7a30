use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use telemetry_service::{
    api::{self, AppState},
    config::{Config, StoreBackend},
    db,
    ingest::IngestService,
    publisher::{BroadcastPublisher, MqttPublisher, SharedPublisher},
    query::LatestQueryService,
    store::{MemoryReadingStore, PgReadingStore, SharedStore},
};

const MQTT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent — env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    // Store: one pool (or one in-memory map) for the whole process
    let mut pool = None;
    let store: SharedStore = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let pg = db::create_pool(url, config.db_max_connections).await?;
            db::run_migrations(&pg).await?;
            info!("Database ready");
            pool = Some(pg.clone());
            Arc::new(PgReadingStore::new(pg))
        }
        StoreBackend::Memory => {
            info!("Using in-memory reading store; data is lost on exit");
            Arc::new(MemoryReadingStore::new())
        }
    };

    // Publisher: MQTT when a broker is configured, in-process broadcast otherwise
    let mut mqtt = None;
    let publisher: SharedPublisher = match &config.mqtt {
        Some(mqtt_config) => {
            let (publisher, eventloop) = MqttPublisher::connect(mqtt_config);
            info!(
                broker = %format!("{}:{}", mqtt_config.host, mqtt_config.port),
                topic = %mqtt_config.topic,
                "MQTT publisher started"
            );
            mqtt = Some((publisher.clone(), eventloop));
            Arc::new(publisher)
        }
        None => {
            let publisher = BroadcastPublisher::new(config.publish_queue_capacity);
            spawn_debug_consumer(&publisher);
            info!("MQTT_HOST not set; publishing in-process only");
            Arc::new(publisher)
        }
    };

    let state = AppState {
        ingest: IngestService::new(store.clone(), publisher),
        query: LatestQueryService::new(store),
        environment: Arc::from(config.environment.as_str()),
    };

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((publisher, eventloop)) = mqtt {
        publisher.shutdown(eventloop, MQTT_SHUTDOWN_GRACE).await;
    }
    if let Some(pool) = pool {
        pool.close().await;
    }
    info!("Shutdown complete");

    Ok(())
}

/// Logs every in-process published reading at debug level, standing in for a
/// downstream consumer when no broker is configured.
fn spawn_debug_consumer(publisher: &BroadcastPublisher) {
    let mut rx = publisher.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    debug!(payload = %String::from_utf8_lossy(&payload), "Published reading");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Debug consumer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
