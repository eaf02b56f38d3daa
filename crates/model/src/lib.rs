//! Storyboard model RPC: wire types, the worker-side client and the
//! backend that talks to the model-serving HTTP API.

pub mod backend;
pub mod client;
pub mod types;

pub use backend::ModelServingBackend;
pub use client::{ModelError, ModelService, RpcCode, RpcModelClient, RpcStatus};
pub use types::*;

/// Service name prefixing every RPC path.
pub const SERVICE_NAME: &str = "storyboard.StoryboardService";

/// RPC method names.
pub mod method {
    pub const CREATE_STORYBOARD_TASK: &str = "CreateStoryboardTask";
    pub const REGENERATE_SHOT: &str = "RegenerateShot";
    pub const RENDER_VIDEO: &str = "RenderVideo";
}

/// Path of an RPC method, e.g. `/storyboard.StoryboardService/RenderVideo`.
pub fn rpc_path(method: &str) -> String {
    format!("/{SERVICE_NAME}/{method}")
}
