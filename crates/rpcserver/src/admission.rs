//! Concurrency admission for RPC requests.
//!
//! A request that finds no free slot after one retry is rejected with
//! `RESOURCE_EXHAUSTED` instead of queueing.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use s2v_model::RpcCode;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::RpcError;

/// Bounded set of in-flight request slots. Cloning shares the slots.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    slots: Option<Arc<Semaphore>>,
}

/// Held for the lifetime of an admitted request; dropping it frees the slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl AdmissionGate {
    /// A gate admitting at most `limit` concurrent requests.
    /// A `limit` of zero or less admits everything.
    pub fn new(limit: i64) -> Self {
        if limit <= 0 {
            return Self::disabled();
        }
        let limit = usize::try_from(limit).unwrap_or(Semaphore::MAX_PERMITS);
        Self {
            slots: Some(Arc::new(Semaphore::new(limit.min(Semaphore::MAX_PERMITS)))),
        }
    }

    pub fn disabled() -> Self {
        Self { slots: None }
    }

    /// Take a slot without waiting: one immediate attempt, then one more
    /// after yielding to the scheduler.
    pub async fn acquire(&self) -> Result<AdmissionPermit, RpcError> {
        let Some(slots) = &self.slots else {
            return Ok(AdmissionPermit { _permit: None });
        };

        if let Ok(permit) = Arc::clone(slots).try_acquire_owned() {
            return Ok(AdmissionPermit {
                _permit: Some(permit),
            });
        }

        tokio::task::yield_now().await;

        Arc::clone(slots)
            .try_acquire_owned()
            .map(|permit| AdmissionPermit {
                _permit: Some(permit),
            })
            .map_err(|_| RpcError::new(RpcCode::ResourceExhausted, "too many concurrent requests"))
    }

    /// Free slots, or `None` when the gate is disabled.
    pub fn available(&self) -> Option<usize> {
        self.slots.as_ref().map(|s| s.available_permits())
    }
}

/// Middleware holding an [`AdmissionPermit`] across the inner service.
pub async fn admission_middleware(
    State(gate): State<AdmissionGate>,
    req: Request,
    next: Next,
) -> Response {
    match gate.acquire().await {
        Ok(_permit) => next.run(req).await,
        Err(err) => {
            tracing::warn!(path = %req.uri().path(), "Rejected request: no free slot");
            err.into_response()
        }
    }
}
