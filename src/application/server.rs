use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::application::routes::app_router;
use crate::application::state::{AppState, AppStateConfig};
use crate::infrastructure::storage::StorageClient;

/// Storage credentials resolved from the environment at startup.
pub struct StorageSettings {
    pub url: String,
    pub key: String,
}

pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub inference_url: String,
    pub storage: Option<StorageSettings>,
    pub bucket: String,
    pub scratch_dir: PathBuf,
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let storage = match config.storage {
        Some(settings) => {
            let client = StorageClient::new(&settings.url, settings.key, config.bucket)
                .context("invalid storage endpoint URL")?;
            info!(endpoint = %settings.url, bucket = %client.bucket(), "storage client initialized");
            Some(Arc::new(client))
        }
        None => {
            warn!(
                "storage URL or key not set; results will NOT be uploaded and every \
                 request will fail at the publish phase"
            );
            None
        }
    };

    tokio::fs::create_dir_all(&config.scratch_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create scratch directory {}",
                config.scratch_dir.display()
            )
        })?;

    let state = AppState::new(AppStateConfig {
        inference_url: config.inference_url.clone(),
        storage,
        scratch_dir: config.scratch_dir,
    });

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_address))?;

    let app = app_router(state);

    info!(
        address = %config.bind_address,
        inference = %config.inference_url,
        "starting HTTP server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    info!("server shutdown complete");

    Ok(())
}

#[allow(clippy::expect_used)] // Startup: panicking is appropriate if signal handlers fail
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
