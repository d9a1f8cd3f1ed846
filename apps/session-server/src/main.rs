use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};

use session_api::{build_router, AppState};
use session_core::{SessionManager, SessionStore};
use session_infrastructure::{MemoryStore, ReconnectWatchdog, RedisStore};
use session_shared::config::{AppConfig, StoreBackend};
use session_shared::constants::DEFAULT_MEMORY_SWEEP_INTERVAL_MS;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize telemetry
    session_shared::telemetry::init_telemetry();

    info!("Session server starting...");

    // Load configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Connect the session store
    let (store, watchdog): (Arc<dyn SessionStore>, Option<Arc<ReconnectWatchdog>>) =
        match config.store.backend {
            StoreBackend::Redis => {
                let redis = RedisStore::connect(&config.store)
                    .await
                    .context("failed to connect session store")?;
                let watchdog = Arc::clone(redis.watchdog());
                (Arc::new(redis), Some(watchdog))
            }
            StoreBackend::Memory => {
                warn!("Using in-memory session store; sessions are lost on restart");
                let memory = Arc::new(MemoryStore::new(config.store.prefix.clone()));
                memory.spawn_sweeper(Duration::from_millis(DEFAULT_MEMORY_SWEEP_INTERVAL_MS));
                (memory as Arc<dyn SessionStore>, None)
            }
        };

    let manager = SessionManager::from_settings(&config.session, Arc::clone(&store))
        .context("invalid session settings")?;

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    let app = build_router(AppState::new(manager, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .into_future();

    tokio::select! {
        result = server => {
            close_store(store.as_ref()).await;
            result.context("server error")?;
        }
        _ = store_lost(watchdog) => {
            error!("Session store unreachable past the reconnect window, exiting");
            close_store(store.as_ref()).await;
            anyhow::bail!("session store connection lost");
        }
    }

    info!("Server stopped.");
    Ok(())
}

/// Never resolves for backends without a watchdog.
async fn store_lost(watchdog: Option<Arc<ReconnectWatchdog>>) {
    match watchdog {
        Some(watchdog) => watchdog.expired().await,
        None => std::future::pending().await,
    }
}

async fn close_store(store: &dyn SessionStore) {
    if let Err(e) = store.close().await {
        warn!("Failed to close session store: {}", e);
    }
}

// ── Graceful shutdown ──────────────────────────────────────────────────────

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received, stopping server...");
}
