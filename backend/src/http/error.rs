//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Scheduler error, mapped by kind
    Scheduler(SchedulerError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Scheduler(e) if e.is_unknown_section() => StatusCode::NOT_FOUND,
            AppError::Scheduler(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            AppError::Scheduler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::NotFound(msg) => ApiError::new("NOT_FOUND", msg),
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg),
            AppError::Internal(msg) => ApiError::new("INTERNAL_ERROR", msg),
            AppError::Scheduler(e) => {
                let code = match &e {
                    _ if e.is_unknown_section() => "NOT_FOUND",
                    SchedulerError::InvalidInput { .. } => "INVALID_INPUT",
                    SchedulerError::Configuration { .. } => "CONFIGURATION_ERROR",
                    SchedulerError::Persistence { .. } => "PERSISTENCE_ERROR",
                };
                let details = e.context().to_string();
                let message = match &e {
                    SchedulerError::InvalidInput { message, .. }
                    | SchedulerError::Configuration { message, .. }
                    | SchedulerError::Persistence { message, .. } => message.clone(),
                };
                ApiError::new(code, message).with_details(details)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        AppError::Scheduler(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionId;

    #[test]
    fn test_scheduler_error_status_mapping() {
        let section = SectionId::new("s1").unwrap();
        assert_eq!(
            AppError::from(SchedulerError::unknown_section(&section, "report")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(SchedulerError::invalid_input("negative load")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(SchedulerError::persistence("disk full")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_shape() {
        let response = AppError::BadRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
