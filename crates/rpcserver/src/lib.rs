//! Storyboard RPC server.
//!
//! Exposes [`ModelService`](s2v_model::ModelService) over HTTP behind a
//! per-request guard stack (outermost first): trace id, request logging,
//! admission gate, optional timeout, panic guard.

pub mod admission;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;

pub use admission::AdmissionGate;
pub use config::RpcServerConfig;
pub use router::{build_router, RpcState};
