use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::application::errors::AppError;
use crate::infrastructure::fetch;
use crate::infrastructure::scratch::{ScratchFile, unique_filename};

/// Identifier of the hosted try-on space. Resolution of the identifier into
/// an endpoint follows the host's naming scheme; see [`service_base_url`].
pub const SERVICE_ID: &str = "jallenjia/Change-Clothes-AI";

/// Named remote procedure exposed by the space.
const TRYON_ENDPOINT: &str = "tryon";

// Fixed generation parameters. The model is invoked with automatic masking
// and no cropping; tuning these is not exposed to callers.
const AUTO_MASK: bool = true;
const AUTO_CROP: bool = false;
const DENOISE_STEPS: i64 = 30;
const SEED: i64 = -1;
const CATEGORY: &str = "upper_body";

/// Resolve a `owner/space` service identifier to its hosted base URL.
pub fn service_base_url(service_id: &str) -> String {
    let slug: String = service_id
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("https://{slug}.hf.space")
}

/// The two images produced by a try-on run, fetched to local scratch files:
/// the composed result and the garment mask. Both are deleted when dropped.
#[derive(Debug)]
pub struct TryOnOutputs {
    pub output: ScratchFile,
    pub mask: ScratchFile,
}

/// Run the try-on procedure against the space at `base_url`: upload both
/// local images, invoke the remote procedure with the fixed parameters, and
/// fetch the two referenced output files into `scratch_dir`.
pub async fn run_tryon(
    client: &reqwest::Client,
    base_url: &str,
    human_image: &Path,
    garment_image: &Path,
    garment_description: &str,
    scratch_dir: &Path,
) -> Result<TryOnOutputs, AppError> {
    let human_ref = upload_file(client, base_url, human_image).await?;
    let garment_ref = upload_file(client, base_url, garment_image).await?;

    info!(endpoint = TRYON_ENDPOINT, "invoking inference procedure");
    let response = predict(client, base_url, &human_ref, &garment_ref, garment_description).await?;
    let (output_ref, mask_ref) = decode_outputs(&response)?;
    debug!(output = %output_ref.path, mask = %mask_ref.path, "inference returned output files");

    let output = fetch_output(client, base_url, &output_ref, "output", scratch_dir).await?;
    let mask = fetch_output(client, base_url, &mask_ref, "mask", scratch_dir).await?;

    Ok(TryOnOutputs { output, mask })
}

// --- Wire types ---

/// A server-side file reference, as produced by the space's upload endpoint
/// and returned from the procedure call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    data: Vec<Value>,
}

// --- Internal helpers ---

async fn upload_file(
    client: &reqwest::Client,
    base_url: &str,
    path: &Path,
) -> Result<FileRef, AppError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::inference(format!("Failed to read {}: {e}", path.display())))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let form = reqwest::multipart::Form::new()
        .part("files", reqwest::multipart::Part::bytes(bytes).file_name(filename));

    let response = client
        .post(format!("{base_url}/upload"))
        .multipart(form)
        .send()
        .await
        .map_err(|e| AppError::inference(format!("Inference upload failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::inference(format!(
            "Inference upload returned status {}",
            response.status()
        )));
    }

    // The upload endpoint returns a JSON array of server-side paths, one per
    // uploaded file.
    let paths: Vec<String> = response
        .json()
        .await
        .map_err(|e| AppError::inference(format!("Failed to parse upload response: {e}")))?;

    let path = paths
        .into_iter()
        .next()
        .ok_or_else(|| AppError::inference("Inference upload returned no file path"))?;

    Ok(FileRef { path, url: None })
}

async fn predict(
    client: &reqwest::Client,
    base_url: &str,
    human_ref: &FileRef,
    garment_ref: &FileRef,
    garment_description: &str,
) -> Result<PredictResponse, AppError> {
    // The first argument is an image-editor value: the person photo as the
    // background with no drawn layers or composite.
    let request_body = json!({
        "data": [
            {
                "background": human_ref,
                "layers": [],
                "composite": null,
            },
            garment_ref,
            garment_description,
            AUTO_MASK,
            AUTO_CROP,
            DENOISE_STEPS,
            SEED,
            CATEGORY,
        ]
    });

    let response = client
        .post(format!("{base_url}/run/{TRYON_ENDPOINT}"))
        .json(&request_body)
        .send()
        .await
        .map_err(|e| AppError::inference(format!("Inference request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "(unreadable body)".to_string());
        return Err(AppError::inference(format!(
            "Inference service returned status {status}: {body}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::inference(format!("Failed to parse inference response: {e}")))
}

/// Validate that the procedure returned exactly two file references. Any
/// other shape signals an upstream API contract change and is surfaced as a
/// distinct error kind.
fn decode_outputs(response: &PredictResponse) -> Result<(FileRef, FileRef), AppError> {
    let [output, mask] = response.data.as_slice() else {
        return Err(AppError::UnexpectedResponseFormat);
    };

    let output: FileRef =
        serde_json::from_value(output.clone()).map_err(|_| AppError::UnexpectedResponseFormat)?;
    let mask: FileRef =
        serde_json::from_value(mask.clone()).map_err(|_| AppError::UnexpectedResponseFormat)?;

    Ok((output, mask))
}

/// Where to fetch a returned file from: its absolute URL when given, else
/// the space's file-serving route for the server-side path.
fn resolve_file_url(base_url: &str, file: &FileRef) -> String {
    match &file.url {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.clone(),
        _ => format!("{base_url}/file={}", file.path),
    }
}

async fn fetch_output(
    client: &reqwest::Client,
    base_url: &str,
    file: &FileRef,
    prefix: &str,
    scratch_dir: &Path,
) -> Result<ScratchFile, AppError> {
    let url = resolve_file_url(base_url, file);
    // Keep the remote extension so content-type selection works downstream.
    let scratch = ScratchFile::new(scratch_dir, &unique_filename(prefix, &file.path));
    fetch::download_image(client, &url, scratch.path()).await?;
    Ok(scratch)
}
