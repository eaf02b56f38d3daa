//! RPC method handlers. Each decodes a JSON request, forwards it to the
//! [`ModelService`](s2v_model::ModelService) and encodes the reply.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use s2v_model::{
    CreateStoryboardReply, CreateStoryboardRequest, RegenerateShotReply, RegenerateShotRequest,
    RenderVideoReply, RenderVideoRequest, RpcCode,
};

use crate::error::RpcError;
use crate::router::RpcState;

/// Convert a JSON body rejection into `INVALID_ARGUMENT`.
fn decode<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RpcError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| RpcError::new(RpcCode::InvalidArgument, rejection.body_text()))
}

pub async fn create_storyboard_task(
    State(state): State<RpcState>,
    payload: Result<Json<CreateStoryboardRequest>, JsonRejection>,
) -> Result<Json<CreateStoryboardReply>, RpcError> {
    let request = decode(payload)?;
    tracing::debug!(operation_id = %request.operation_id, story_id = %request.story_id, "CreateStoryboardTask");
    let reply = state.model.create_storyboard_task(request).await?;
    Ok(Json(reply))
}

pub async fn regenerate_shot(
    State(state): State<RpcState>,
    payload: Result<Json<RegenerateShotRequest>, JsonRejection>,
) -> Result<Json<RegenerateShotReply>, RpcError> {
    let request = decode(payload)?;
    tracing::debug!(operation_id = %request.operation_id, shot_id = %request.shot_id, "RegenerateShot");
    let reply = state.model.regenerate_shot(request).await?;
    Ok(Json(reply))
}

pub async fn render_video(
    State(state): State<RpcState>,
    payload: Result<Json<RenderVideoRequest>, JsonRejection>,
) -> Result<Json<RenderVideoReply>, RpcError> {
    let request = decode(payload)?;
    tracing::debug!(operation_id = %request.operation_id, story_id = %request.story_id, "RenderVideo");
    let reply = state.model.render_video(request).await?;
    Ok(Json(reply))
}
