use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::errors::AppError;
use crate::application::state::AppState;
use crate::infrastructure::scratch::{ScratchFile, unique_filename};
use crate::infrastructure::{fetch, inference};

/// Bucket folders the two result images are published under.
const PROCESSED_FOLDER: &str = "processed_images";
const MASKED_FOLDER: &str = "masked_images";

const MISSING_URL_MESSAGE: &str = "Missing human_image_url or garment_image_url";

#[derive(Debug, Deserialize)]
pub struct TryOnRequest {
    pub human_image_url: Option<String>,
    pub garment_image_url: Option<String>,
    #[serde(default)]
    pub garment_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub output_url: String,
    pub masked_url: String,
}

/// The full request lifecycle: validate, download both inputs, delegate to
/// the inference service, publish the two outputs, respond. Every scratch
/// file created along the way is held by a guard, so cleanup happens on
/// every exit path.
#[tracing::instrument(skip(state, request))]
pub(crate) async fn virtual_try_on(
    State(state): State<AppState>,
    Json(request): Json<TryOnRequest>,
) -> Result<Json<TryOnResponse>, AppError> {
    let (human_url, garment_url) = validate(&request)?;
    let garment_description = request.garment_description.as_deref().unwrap_or("");

    let human_image = ScratchFile::new(
        &state.scratch_dir,
        &unique_filename("human_input", human_url),
    );
    fetch::download_image(&state.http_client, human_url, human_image.path()).await?;

    let garment_image = ScratchFile::new(
        &state.scratch_dir,
        &unique_filename("garment_input", garment_url),
    );
    fetch::download_image(&state.http_client, garment_url, garment_image.path()).await?;

    let outputs = inference::run_tryon(
        &state.http_client,
        &state.inference_url,
        human_image.path(),
        garment_image.path(),
        garment_description,
        &state.scratch_dir,
    )
    .await?;

    let storage = state.storage.as_ref().ok_or(AppError::StorageUnavailable)?;
    let output_url = storage.publish(outputs.output.path(), PROCESSED_FOLDER).await?;
    let masked_url = storage.publish(outputs.mask.path(), MASKED_FOLDER).await?;

    info!(%output_url, %masked_url, "try-on request complete");

    Ok(Json(TryOnResponse {
        output_url,
        masked_url,
    }))
}

fn validate(request: &TryOnRequest) -> Result<(&str, &str), AppError> {
    let human_url = request.human_image_url.as_deref().filter(|s| !s.is_empty());
    let garment_url = request
        .garment_image_url
        .as_deref()
        .filter(|s| !s.is_empty());

    match (human_url, garment_url) {
        (Some(human), Some(garment)) => Ok((human, garment)),
        _ => Err(AppError::validation(MISSING_URL_MESSAGE)),
    }
}
