//! Domain primitives shared by every story2video service.
//!
//! This crate has no internal dependencies: the API, the worker and the
//! RPC server all build on the types defined here.

pub mod error;
pub mod job;
pub mod sequence;
pub mod types;
