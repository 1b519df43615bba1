use std::path::PathBuf;
use std::sync::Arc;

use crate::infrastructure::storage::StorageClient;

/// Configuration for external services — everything that varies between
/// production and test environments.
pub struct AppStateConfig {
    pub inference_url: String,
    pub storage: Option<Arc<StorageClient>>,
    pub scratch_dir: PathBuf,
}

/// Shared, read-only request-handling state. Built once at startup; the
/// storage client is `None` when credentials were absent, in which case
/// every publish phase fails deterministically.
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub inference_url: String,
    pub storage: Option<Arc<StorageClient>>,
    pub scratch_dir: PathBuf,
}

impl AppState {
    pub fn new(config: AppStateConfig) -> Self {
        Self {
            #[allow(clippy::expect_used)]
            http_client: reqwest::ClientBuilder::new()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .expect("failed to build HTTP client"),
            inference_url: config.inference_url,
            storage: config.storage,
            scratch_dir: config.scratch_dir,
        }
    }
}
