use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::ErrorResponse;
use crate::error::MonitorError;

#[derive(Debug)]
pub struct AppError(pub MonitorError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MonitorError::Auth(_) | MonitorError::Remote { .. } | MonitorError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            MonitorError::Transport(_) => StatusCode::GATEWAY_TIMEOUT,
            MonitorError::Notify(_) | MonitorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, error_kind = self.0.kind(), "Request failed");
        }
        let body = ErrorResponse {
            error: self.0.kind().to_owned(),
            details: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<MonitorError> for AppError {
    fn from(e: MonitorError) -> Self {
        Self(e)
    }
}
