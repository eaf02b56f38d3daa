use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use s2v_model::{ModelError, RpcCode, RpcStatus};

/// An RPC failure rendered as `{"code": ..., "message": ...}`.
#[derive(Debug)]
pub struct RpcError(pub RpcStatus);

impl RpcError {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self(RpcStatus::new(code, message))
    }
}

impl From<ModelError> for RpcError {
    fn from(err: ModelError) -> Self {
        Self(err.to_status())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self.0)).into_response()
    }
}
