//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::classify::ClassifyError;
use crate::pipeline::{FailureDetail, InputError, PackagingError, StoreError};

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    /// Per-item failure reasons, present only for a fully failed batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<FailureDetail>>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No files uploaded")]
    NoInput,
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),
    #[error("No valid inputs after filtering")]
    NoValidInputs,
    #[error("Batch too large: {count} items (limit {max})")]
    BatchTooLarge { count: usize, max: usize },
    #[error("All items failed to convert")]
    AllFailed(Vec<FailureDetail>),
    #[error("Packaging failed: {0}")]
    Packaging(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Classifier model not loaded")]
    ModelUnavailable,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut failures = None;
        let (status, code, message) = match self {
            ApiError::NoInput => (
                StatusCode::BAD_REQUEST,
                "NO_INPUT",
                "No files uploaded".to_string(),
            ),
            ApiError::InvalidArchive(detail) => (
                StatusCode::BAD_REQUEST,
                "INVALID_ARCHIVE",
                detail,
            ),
            ApiError::NoValidInputs => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_VALID_INPUTS",
                "No file matched the accepted DICOM extensions (.dcm, .dicom)".to_string(),
            ),
            ApiError::BatchTooLarge { count, max } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "BATCH_TOO_LARGE",
                format!("Batch of {count} items exceeds the {max}-item limit"),
            ),
            ApiError::AllFailed(details) => {
                let message = format!("All {} items failed to convert", details.len());
                failures = Some(details);
                (StatusCode::UNPROCESSABLE_ENTITY, "ALL_FAILED", message)
            }
            ApiError::Packaging(detail) => {
                tracing::error!(%detail, "packaging failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PACKAGING",
                    "The converted batch could not be packaged".to_string(),
                )
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MODEL_UNAVAILABLE",
                "No classifier model is loaded".to_string(),
            ),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                failures,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::NoFiles => ApiError::NoInput,
            InputError::InvalidArchive(detail) => {
                ApiError::InvalidArchive(format!("Could not read archive: {detail}"))
            }
            InputError::MultipleArchives(n) => {
                ApiError::InvalidArchive(format!("At most one archive per request, got {n}"))
            }
            InputError::NoValidInputs => ApiError::NoValidInputs,
            InputError::BatchTooLarge { count, max } => ApiError::BatchTooLarge { count, max },
            InputError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PackagingError> for ApiError {
    fn from(err: PackagingError) -> Self {
        ApiError::Packaging(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => {
                ApiError::NotFound("No archive exists for this handle".to_string())
            }
            StoreError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::UnreadableImage(detail) => {
                ApiError::BadRequest(format!("Could not read uploaded image: {detail}"))
            }
            ClassifyError::ModelNotFound(_) | ClassifyError::ModelInit(_) => {
                ApiError::ModelUnavailable
            }
            ClassifyError::Inference(detail) => ApiError::Internal(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn no_input_returns_400() {
        let response = ApiError::NoInput.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "NO_INPUT");
    }

    #[tokio::test]
    async fn no_valid_inputs_returns_422() {
        let response = ApiError::NoValidInputs.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "NO_VALID_INPUTS");
    }

    #[tokio::test]
    async fn all_failed_lists_every_failure() {
        let response = ApiError::AllFailed(vec![
            FailureDetail {
                source: "a.dcm".into(),
                reason: "broken header".into(),
            },
            FailureDetail {
                source: "b.dcm".into(),
                reason: "no pixel data".into(),
            },
        ])
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "ALL_FAILED");
        assert_eq!(json["error"]["failures"].as_array().unwrap().len(), 2);
        assert_eq!(json["error"]["failures"][0]["source"], "a.dcm");
    }

    #[tokio::test]
    async fn model_unavailable_returns_503() {
        let response = ApiError::ModelUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn packaging_hides_detail_from_client() {
        let response = ApiError::Packaging("disk full at /var".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "PACKAGING");
        assert!(!json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("/var"));
    }

    #[tokio::test]
    async fn store_not_found_maps_to_404() {
        let api_err: ApiError = StoreError::NotFound.into();
        let response = api_err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn batch_too_large_returns_413() {
        let response = ApiError::BatchTooLarge { count: 300, max: 256 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
