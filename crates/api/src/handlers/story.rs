//! Handlers for the `/stories` resource.
//!
//! Every endpoint is scoped to the [`CurrentUser`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use s2v_core::types::EntityId;

use crate::error::AppResult;
use crate::middleware::user::CurrentUser;
use crate::response::DataResponse;
use crate::services::CreateStoryInput;
use crate::state::AppState;

/// POST /api/v1/stories
///
/// Create a story and queue its storyboard. Returns 202 with the
/// operation handle.
pub async fn create_story(
    user: CurrentUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateStoryInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let handle = state.stories().create(user.user_id, &input).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: handle })))
}

/// GET /api/v1/stories/{id}
pub async fn get_story(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(story_id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    let detail = state.stories().get(user.user_id, story_id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/stories/{id}/render
pub async fn render_story(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(story_id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    let handle = state.shots().render(user.user_id, story_id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: handle })))
}
