use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use s2v_core::error::{ErrorClass, ErrorCode, ServiceError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Service failures keep their stable `SVCxxxx` code; the HTTP status is
/// derived from the code's [`ErrorClass`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The caller could not be identified.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Service(ServiceError::new(
            ErrorCode::InvalidRequest,
            rejection.body_text(),
        ))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Service(err) => {
                let class = err.class();
                match class {
                    ErrorClass::Internal => {
                        tracing::error!(error = %err, "Internal service error")
                    }
                    ErrorClass::BadGateway | ErrorClass::GatewayTimeout => {
                        tracing::warn!(error = %err, "Downstream failure")
                    }
                    ErrorClass::ClientError | ErrorClass::NotFound => {}
                }
                let status = StatusCode::from_u16(class.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, err.code().as_str(), err.message().to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
