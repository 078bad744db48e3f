use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Too many active jobs (limit {limit}). Try again shortly.")]
    AtCapacity { limit: usize },

    #[error("Missing job id")]
    MissingJobId,
}

impl TrackerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "JOB_NOT_FOUND",
            Self::AtCapacity { .. } => "JOBS_AT_CAPACITY",
            Self::MissingJobId => "MISSING_JOB_ID",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AtCapacity { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingJobId => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(json!({
                "error": {
                    "code": self.code(),
                    "message": self.to_string()
                }
            })),
        )
            .into_response()
    }
}
