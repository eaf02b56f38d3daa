use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use s2v_core::types::EntityId;
use s2v_db::models::shot::ShotFields;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::user::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Editable shot content. Absent or empty values keep what is stored.
#[derive(Debug, Default, Deserialize)]
pub struct ShotPatch {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub narration: String,
    #[serde(default, rename = "type")]
    pub shot_type: String,
    #[serde(default)]
    pub transition: String,
    #[serde(default)]
    pub voice: String,
    #[serde(default)]
    pub bgm: String,
    #[serde(default)]
    pub image_url: String,
}

impl From<ShotPatch> for ShotFields {
    fn from(patch: ShotPatch) -> Self {
        ShotFields {
            sequence: String::new(),
            title: patch.title,
            description: patch.description,
            details: patch.details,
            narration: patch.narration,
            shot_type: patch.shot_type,
            transition: patch.transition,
            voice: patch.voice,
            bgm: patch.bgm,
            image_url: patch.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateShotInput {
    pub shot: ShotPatch,
}

/// GET /api/v1/stories/{story_id}/shots
pub async fn list_shots(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(story_id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    let shots = state.shots().list(user.user_id, story_id).await?;
    Ok(Json(DataResponse { data: shots }))
}

/// GET /api/v1/stories/{story_id}/shots/{shot_id}
pub async fn get_shot(
    user: CurrentUser,
    State(state): State<AppState>,
    Path((story_id, shot_id)): Path<(EntityId, EntityId)>,
) -> AppResult<impl IntoResponse> {
    let shot = state.shots().get(user.user_id, story_id, shot_id).await?;
    Ok(Json(DataResponse { data: shot }))
}

/// PATCH /api/v1/stories/{story_id}/shots/{shot_id}
///
/// Body: `{"shot": {"title": ..., "narration": ...}}`.
pub async fn update_shot(
    user: CurrentUser,
    State(state): State<AppState>,
    Path((story_id, shot_id)): Path<(EntityId, EntityId)>,
    payload: Result<Json<UpdateShotInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let shot = state
        .shots()
        .update(user.user_id, story_id, shot_id, input.shot.into())
        .await?;
    Ok(Json(DataResponse { data: shot }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RegenerateShotInput {
    #[serde(default)]
    pub details: Option<String>,
}

/// POST /api/v1/stories/{story_id}/shots/{shot_id}/regenerate
///
/// The body is optional; without `details` the stored details are reused.
pub async fn regenerate_shot(
    user: CurrentUser,
    State(state): State<AppState>,
    Path((story_id, shot_id)): Path<(EntityId, EntityId)>,
    payload: Result<Option<Json<RegenerateShotInput>>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let input = payload?.map(|Json(input)| input).unwrap_or_default();
    let handle = state
        .shots()
        .regenerate(user.user_id, story_id, shot_id, input.details.as_deref())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: handle })))
}
