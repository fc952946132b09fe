use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use moodlog_core::CheckinError;

/// Errors surfaced to HTTP clients as `{success: false, message}`.
#[derive(Debug)]
pub enum ApiError {
    Checkin(CheckinError),
    NoSession(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Checkin(e) => match e {
                CheckinError::MissingPrecondition(_) => StatusCode::BAD_REQUEST,
                CheckinError::NoPendingConfirmation | CheckinError::NothingToSave => {
                    StatusCode::CONFLICT
                }
                CheckinError::AllModalitiesEmpty => StatusCode::UNPROCESSABLE_ENTITY,
                CheckinError::NoSignal(_) | CheckinError::ServiceUnavailable { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                CheckinError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NoSession(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Checkin(e) => e.to_string(),
            Self::NoSession(user) => format!("No check-in in progress for {}", user),
            Self::BadRequest(msg) => msg.clone(),
            Self::Internal(e) => format!("{:#}", e),
        }
    }
}

impl From<CheckinError> for ApiError {
    fn from(e: CheckinError) -> Self {
        Self::Checkin(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, message);
        }
        let body = serde_json::json!({ "success": false, "message": message });
        (status, Json(body)).into_response()
    }
}
