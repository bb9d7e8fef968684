//! Verification Gate Binary
//!
//! Runs the init-data verification HTTP server.

use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use initgate_server::{
    create_router, spawn_pruner, AppState, GateConfig, MemoryStore, ReplayGuard, ReplayStore,
    StorageError, StoreTarget, Verifier,
};

#[tokio::main]
async fn main() {
    // Configuration comes first so the log level is known
    let config = match GateConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("initgate: configuration error: {}", e);
            process::exit(1);
        }
    };

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("initgate: failed to set tracing subscriber: {}", e);
        process::exit(1);
    }

    // Initialize storage
    let store = match open_store(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to open replay store");
            process::exit(1);
        }
    };

    info!(
        backend = store.backend(),
        max_age_secs = config.freshness.max_age_secs,
        max_future_skew_secs = config.freshness.max_future_skew_secs,
        retention_secs = config.replay.retention_secs,
        secret = %config.secret.fingerprint(),
        port = config.port,
        "Starting verification gate"
    );

    let guard = ReplayGuard::new(store, config.replay);
    let pruner = spawn_pruner(guard.clone(), config.prune_interval);
    let verifier = Verifier::new(config.secret, config.freshness, guard);

    // Create application state
    let state = Arc::new(AppState { verifier });

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind to address");
            process::exit(1);
        }
    };

    info!(addr = %addr, "Verification gate listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    pruner.abort();

    if let Err(e) = served {
        error!(error = %e, "Server error");
        process::exit(1);
    }

    info!("Verification gate stopped");
}

async fn open_store(target: &StoreTarget) -> Result<Arc<dyn ReplayStore>, StorageError> {
    match target {
        StoreTarget::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "postgres")]
        StoreTarget::Postgres(url) => {
            let store = initgate_server::PostgresStore::new(url).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StoreTarget::Postgres(_) => Err(StorageError::Connection(
            "postgres support not compiled in".into(),
        )),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
