use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use itrack_core::error::{AppError, ErrorKind};
use serde_json::json;

/// HTTP face of [`AppError`].
#[derive(Debug)]
pub struct ApiError(pub AppError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0.kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Storage | ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = self.0;

        let body = match err.kind {
            ErrorKind::Validation => {
                tracing::debug!(code = %err.code, errors = ?err.errors, "rejected request");
                json!({ "code": err.code, "errors": err.errors })
            }
            ErrorKind::NotFound => json!({ "code": err.code, "error": err.message }),
            ErrorKind::Storage | ErrorKind::Config => {
                tracing::error!(
                    error_code = %err.code,
                    status_code = status.as_u16(),
                    message = %err.message,
                    details = err.details.as_deref().unwrap_or(""),
                    "Request error"
                );
                // Storage internals stay in the log.
                json!({ "code": "INTERNAL_ERROR", "error": "Internal server error." })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        let cases = [
            (AppError::validation(vec!["x".into()]), StatusCode::BAD_REQUEST),
            (AppError::not_found("id"), StatusCode::NOT_FOUND),
            (AppError::storage("DB_QUERY_FAILED", "boom"), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::config("CONFIG_LOAD_FAILED", "bad"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }
}
