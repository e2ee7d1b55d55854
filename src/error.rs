use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong while answering a prediction request.
///
/// The first three variants are caller mistakes and map to HTTP 400; only
/// `Internal` maps to 500. A request either fully succeeds or fails with
/// exactly one of these.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0}")]
    InvalidFormat(String),

    #[error("Invalid number of features. Expected 8 features, got {0}.")]
    InvalidFeatureCount(usize),

    #[error("Invalid feature values: {0}")]
    InvalidFeatureValue(String),

    #[error("{0}")]
    Internal(String),
}

impl PredictError {
    /// The canonical message for a missing or malformed request body.
    pub fn invalid_format() -> Self {
        PredictError::InvalidFormat(
            "Invalid request format. Expected JSON with \"data\" field containing features array."
                .to_string(),
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
