use std::path::Path;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::application::errors::AppError;

/// Download a remote image to `dest`, streaming the body chunk-by-chunk so
/// memory use stays bounded regardless of image size. Single attempt; any
/// transport error or non-success status is fatal for the request.
pub async fn download_image(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), AppError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::download(format!("Error downloading image from {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::download(format!(
            "Error downloading image from {url}: status {}",
            response.status()
        )));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| AppError::download(format!("Failed to create {}: {e}", dest.display())))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| AppError::download(format!("Error downloading image from {url}: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::download(format!("Failed to write {}: {e}", dest.display())))?;
    }

    file.flush()
        .await
        .map_err(|e| AppError::download(format!("Failed to write {}: {e}", dest.display())))?;

    debug!(url, dest = %dest.display(), "downloaded image");
    Ok(())
}
