use crate::coaching::{CoachingError, CoachingServiceError, RepositoryError, SurveyImportError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Coaching(CoachingServiceError),
    Survey(SurveyImportError),
    InvalidRequest(String),
}

impl AppError {
    /// Stable machine-readable identifier used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration_error",
            AppError::Telemetry(_) => "telemetry_error",
            AppError::Io(_) => "io_error",
            AppError::Server(_) => "server_error",
            AppError::Coaching(err) => err.kind(),
            AppError::Survey(_) => "invalid_survey",
            AppError::InvalidRequest(_) => "invalid_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Survey(_) => StatusCode::BAD_REQUEST,
            AppError::Coaching(
                CoachingServiceError::Coaching(
                    CoachingError::CategoryNotFound(_)
                    | CoachingError::GoalNotFound(_)
                    | CoachingError::ProfileNotFound(_),
                )
                | CoachingServiceError::Repository(RepositoryError::NotFound),
            ) => StatusCode::NOT_FOUND,
            AppError::Coaching(
                CoachingServiceError::Coaching(CoachingError::ProfileExists(_))
                | CoachingServiceError::Repository(RepositoryError::Conflict),
            ) => StatusCode::CONFLICT,
            AppError::Coaching(CoachingServiceError::Coaching(
                CoachingError::UpstreamService { .. } | CoachingError::UnparsableGenerativeOutput(_),
            )) => StatusCode::BAD_GATEWAY,
            AppError::Coaching(CoachingServiceError::Repository(RepositoryError::Unavailable(_)))
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Coaching(err) => write!(f, "coaching error: {}", err),
            AppError::Survey(err) => write!(f, "survey import error: {}", err),
            AppError::InvalidRequest(message) => write!(f, "invalid request: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Coaching(err) => Some(err),
            AppError::Survey(err) => Some(err),
            AppError::InvalidRequest(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CoachingServiceError> for AppError {
    fn from(value: CoachingServiceError) -> Self {
        Self::Coaching(value)
    }
}

impl From<CoachingError> for AppError {
    fn from(value: CoachingError) -> Self {
        Self::Coaching(CoachingServiceError::Coaching(value))
    }
}

impl From<SurveyImportError> for AppError {
    fn from(value: SurveyImportError) -> Self {
        Self::Survey(value)
    }
}
