use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::classify::{self, Label, XrayModel};
use crate::config::{self, IMAGE_EXTENSIONS};
use crate::pipeline::{
    convert_batch, package, resolve_inputs, ArchiveHandle, BatchDecision, FailureDetail,
    OutputStore, Workspace,
};

use super::error::ApiError;

/// Shared state for all request handlers.
pub struct AppState {
    pub store: OutputStore,
    pub model: Option<Arc<dyn XrayModel>>,
    pub worker_pool_size: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/predict", post(predict))
        .route("/convert", post(convert))
        .route("/downloads/:handle", get(download))
        .layer(DefaultBodyLimit::max(config::BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Label,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub handle: ArchiveHandle,
    pub download: String,
    pub converted: Vec<String>,
    /// Items that could not be converted. Never silently dropped: a
    /// partial success still lists every failure here.
    pub failed: Vec<FailureDetail>,
}

/// One uploaded file pulled out of a multipart body.
struct UploadedFile {
    name: String,
    bytes: Vec<u8>,
}

async fn read_uploads(multipart: &mut Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {e}")))?;
        if name.is_empty() || bytes.is_empty() {
            continue;
        }
        uploads.push(UploadedFile {
            name,
            bytes: bytes.to_vec(),
        });
    }
    Ok(uploads)
}

/// Classify one uploaded X-ray photograph.
async fn predict(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let model = state.model.clone().ok_or(ApiError::ModelUnavailable)?;

    let uploads = read_uploads(&mut multipart).await?;
    let upload = uploads.into_iter().next().ok_or(ApiError::NoInput)?;

    if !config::has_allowed_extension(&upload.name, &IMAGE_EXTENSIONS) {
        return Err(ApiError::BadRequest(
            "Invalid file format. Please upload a PNG or JPEG image.".to_string(),
        ));
    }

    // Inference is CPU-bound; keep it off the async workers.
    let prediction =
        tokio::task::spawn_blocking(move || classify::classify(model.as_ref(), &upload.bytes))
            .await
            .map_err(|e| ApiError::Internal(format!("prediction task aborted: {e}")))??;

    tracing::info!(
        label = ?prediction.label,
        confidence = prediction.confidence,
        "prediction served"
    );

    Ok(Json(PredictResponse {
        prediction: prediction.label,
        confidence: prediction.confidence,
    }))
}

/// Convert an uploaded batch of DICOM files (loose and/or one archive)
/// and package the results for download.
///
/// Mixed outcomes package the successes and list the failures; only a
/// fully failed batch aborts the request. The workspace and everything in
/// it (originals, extracted entries, intermediate rasters) is removed on
/// every exit path.
async fn convert(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, ApiError> {
    let workspace = Workspace::create().map_err(|e| ApiError::Internal(e.to_string()))?;

    let uploads = read_uploads(&mut multipart).await?;
    let mut staged = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        staged.push(
            workspace
                .stage(&upload.name, &upload.bytes)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        );
    }

    let items = resolve_inputs(&staged, &workspace.extract_dir())?;
    let result = convert_batch(items, workspace.output_dir(), state.worker_pool_size).await;

    if result.decision == BatchDecision::TotalFailure {
        return Err(ApiError::AllFailed(result.failures()));
    }

    let converted = result.converted_names();
    let handle = package(workspace.output_dir(), &converted, &state.store)?;

    Ok(Json(ConvertResponse {
        handle,
        download: format!("/downloads/{handle}"),
        converted,
        failed: result.failures(),
    }))
}

/// Stream a completed archive back by its handle.
async fn download(
    State(state): State<Arc<AppState>>,
    UrlPath(handle): UrlPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.store.fetch(&handle)?;
    let disposition = format!("attachment; filename=\"{handle}{}\"", config::ARCHIVE_SUFFIX);
    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
