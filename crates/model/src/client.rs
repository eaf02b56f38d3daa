//! The [`ModelService`] seam and its RPC client.
//!
//! Calls are JSON over HTTP: `POST {addr}/storyboard.StoryboardService/<Method>`.
//! A failed call answers with a non-2xx status and an [`RpcStatus`] body.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::{method, rpc_path};

/// Status codes carried by failed RPC calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcCode {
    InvalidArgument,
    ResourceExhausted,
    DeadlineExceeded,
    Unavailable,
    Internal,
}

impl RpcCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RpcCode::InvalidArgument => "INVALID_ARGUMENT",
            RpcCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            RpcCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            RpcCode::Unavailable => "UNAVAILABLE",
            RpcCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status used on the wire for this code.
    pub fn http_status(self) -> u16 {
        match self {
            RpcCode::InvalidArgument => 400,
            RpcCode::ResourceExhausted => 429,
            RpcCode::DeadlineExceeded => 504,
            RpcCode::Unavailable => 503,
            RpcCode::Internal => 500,
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body of a failed RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The server answered with a status.
    #[error("{}: {}", .0.code, .0.message)]
    Status(RpcStatus),

    /// The HTTP request itself failed (network, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A non-2xx answer without a status body.
    #[error("model service error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl ModelError {
    pub fn status(code: RpcCode, message: impl Into<String>) -> Self {
        ModelError::Status(RpcStatus::new(code, message))
    }

    /// Best classification of this error as an RPC code.
    pub fn code(&self) -> RpcCode {
        match self {
            ModelError::Status(status) => status.code,
            ModelError::Request(e) if e.is_timeout() => RpcCode::DeadlineExceeded,
            ModelError::Request(e) if e.is_connect() => RpcCode::Unavailable,
            ModelError::Request(_) | ModelError::Api { .. } => RpcCode::Internal,
        }
    }

    /// The status to answer an RPC caller with.
    pub fn to_status(&self) -> RpcStatus {
        match self {
            ModelError::Status(status) => status.clone(),
            other => RpcStatus::new(other.code(), other.to_string()),
        }
    }
}

/// Storyboard generation operations.
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn create_storyboard_task(
        &self,
        request: CreateStoryboardRequest,
    ) -> Result<CreateStoryboardReply, ModelError>;

    async fn regenerate_shot(
        &self,
        request: RegenerateShotRequest,
    ) -> Result<RegenerateShotReply, ModelError>;

    async fn render_video(&self, request: RenderVideoRequest)
        -> Result<RenderVideoReply, ModelError>;
}

/// Client for a remote storyboard RPC server.
#[derive(Clone)]
pub struct RpcModelClient {
    client: reqwest::Client,
    addr: String,
}

impl RpcModelClient {
    /// * `addr` - Base URL of the RPC server, e.g. `http://127.0.0.1:50051`.
    pub fn new(addr: &str, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, addr))
    }

    pub fn with_client(client: reqwest::Client, addr: &str) -> Self {
        Self {
            client,
            addr: addr.trim_end_matches('/').to_string(),
        }
    }

    async fn call<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        method: &str,
        request: &Req,
    ) -> Result<Resp, ModelError> {
        let response = self
            .client
            .post(format!("{}{}", self.addr, rpc_path(method)))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on success; otherwise decode the
    /// status body, falling back to the raw text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        match serde_json::from_str::<RpcStatus>(&body) {
            Ok(rpc_status) => Err(ModelError::Status(rpc_status)),
            Err(_) => Err(ModelError::Api {
                status: status.as_u16(),
                body,
            }),
        }
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ModelError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ModelService for RpcModelClient {
    async fn create_storyboard_task(
        &self,
        request: CreateStoryboardRequest,
    ) -> Result<CreateStoryboardReply, ModelError> {
        self.call(method::CREATE_STORYBOARD_TASK, &request).await
    }

    async fn regenerate_shot(
        &self,
        request: RegenerateShotRequest,
    ) -> Result<RegenerateShotReply, ModelError> {
        self.call(method::REGENERATE_SHOT, &request).await
    }

    async fn render_video(
        &self,
        request: RenderVideoRequest,
    ) -> Result<RenderVideoReply, ModelError> {
        self.call(method::RENDER_VIDEO, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&RpcStatus::new(RpcCode::ResourceExhausted, "busy")).unwrap();
        assert_eq!(json, r#"{"code":"RESOURCE_EXHAUSTED","message":"busy"}"#);
    }

    #[test]
    fn status_error_display() {
        let err = ModelError::status(RpcCode::Internal, "internal server error");
        assert_eq!(err.to_string(), "INTERNAL: internal server error");
        assert_eq!(err.code(), RpcCode::Internal);
    }

    #[test]
    fn api_error_is_internal() {
        let err = ModelError::Api {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.to_status().code, RpcCode::Internal);
    }
}
