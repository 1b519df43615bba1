use std::path::Path;

use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::application::errors::AppError;

/// Client for a Supabase-compatible storage API. Built once at startup from
/// the configured endpoint, access key, and bucket; shared read-only across
/// requests.
pub struct StorageClient {
    http: reqwest::Client,
    endpoint: String,
    key: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(
        endpoint: &str,
        key: String,
        bucket: String,
    ) -> Result<Self, url::ParseError> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        Url::parse(&endpoint)?;
        #[allow(clippy::expect_used)]
        let http = reqwest::ClientBuilder::new()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");
        Ok(Self {
            http,
            endpoint,
            key,
            bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload a local file into the bucket under `{folder}/{uuid}_{filename}`
    /// and return its public URL. The random prefix keeps concurrent uploads
    /// of identically-named files from colliding.
    pub async fn publish(&self, file_path: &Path, folder: &str) -> Result<String, AppError> {
        let bytes = tokio::fs::read(file_path).await.map_err(|e| {
            AppError::upload(format!(
                "File not found for upload: {}: {e}",
                file_path.display()
            ))
        })?;

        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        let object_key = format!("{folder}/{}_{filename}", Uuid::new_v4());
        let content_type = content_type_for(&filename);

        let upload_url = format!(
            "{}/storage/v1/object/{}/{object_key}",
            self.endpoint, self.bucket
        );

        let response = self
            .http
            .post(&upload_url)
            .bearer_auth(&self.key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::upload(format!("Storage upload failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(unreadable body)".to_string());
            return Err(AppError::upload(format!(
                "Storage upload returned status {status}: {body}"
            )));
        }

        let public_url = self.public_url(&object_key);
        info!(key = %object_key, content_type, "uploaded file to storage");
        Ok(public_url)
    }

    /// Public URL for an object key. Composed locally; the storage API does
    /// not need to be consulted.
    pub fn public_url(&self, object_key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{object_key}",
            self.endpoint, self.bucket
        )
    }
}

/// Content type by file extension. Hosted spaces usually emit `.webp` or
/// `.png`, so unknown extensions default to `image/webp`.
pub(crate) fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpeg") || lower.ends_with(".jpg") {
        "image/jpeg"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        "image/webp"
    }
}
