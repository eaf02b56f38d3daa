//! Router and middleware stack shared by `main.rs` and the integration tests.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderName;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use s2v_model::{method, rpc_path, ModelService, RpcCode};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::admission::{admission_middleware, AdmissionGate};
use crate::error::RpcError;
use crate::handlers;

/// Header carrying the trace id; generated when the caller sends none.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// State available to all RPC handlers.
#[derive(Clone)]
pub struct RpcState {
    pub model: Arc<dyn ModelService>,
}

/// Build the RPC [`Router`] with all middleware layers.
///
/// Applied bottom-up:
///
/// 1. Set trace id on incoming requests
/// 2. Request logging (method, trace id, status, latency)
/// 3. Propagate trace id to the response
/// 4. Admission gate
/// 5. Request deadline (only when `timeout` is set)
/// 6. Panic recovery
pub fn build_router(state: RpcState, gate: AdmissionGate, timeout: Option<Duration>) -> Router {
    let trace_header = HeaderName::from_static(TRACE_ID_HEADER);

    Router::new()
        .route(
            &rpc_path(method::CREATE_STORYBOARD_TASK),
            post(handlers::create_storyboard_task),
        )
        .route(&rpc_path(method::REGENERATE_SHOT), post(handlers::regenerate_shot))
        .route(&rpc_path(method::RENDER_VIDEO), post(handlers::render_video))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(timeout, deadline_middleware))
        .layer(middleware::from_fn_with_state(gate, admission_middleware))
        .layer(PropagateRequestIdLayer::new(trace_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let trace_id = request
                        .headers()
                        .get(TRACE_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    tracing::info_span!("rpc", method = %request.uri().path(), trace_id = %trace_id)
                })
                .on_response(|response: &Response, latency: Duration, _span: &Span| {
                    let latency_ms = latency.as_millis() as u64;
                    if response.status().is_success() {
                        tracing::info!(status = response.status().as_u16(), latency_ms, "RPC request completed");
                    } else {
                        tracing::warn!(status = response.status().as_u16(), latency_ms, "RPC request failed");
                    }
                }),
        )
        .layer(SetRequestIdLayer::new(trace_header, MakeRequestUuid))
        .with_state(state)
}

/// Fail the request with `DEADLINE_EXCEEDED` once the deadline passes.
async fn deadline_middleware(
    State(timeout): State<Option<Duration>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(timeout) = timeout else {
        return next.run(req).await;
    };
    match tokio::time::timeout(timeout, next.run(req)).await {
        Ok(response) => response,
        Err(_) => RpcError::new(RpcCode::DeadlineExceeded, "request deadline exceeded").into_response(),
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "RPC handler panicked");
    RpcError::new(RpcCode::Internal, "internal server error").into_response()
}
