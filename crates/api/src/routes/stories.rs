use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{shot, story};
use crate::state::AppState;

/// Routes mounted at `/stories`.
///
/// ```text
/// POST   /                                   -> create_story
/// GET    /{id}                               -> get_story
/// POST   /{id}/render                        -> render_story
/// GET    /{id}/shots                         -> list_shots
/// GET    /{id}/shots/{shot_id}               -> get_shot
/// PATCH  /{id}/shots/{shot_id}               -> update_shot
/// POST   /{id}/shots/{shot_id}/regenerate    -> regenerate_shot
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(story::create_story))
        .route("/{id}", get(story::get_story))
        .route("/{id}/render", post(story::render_story))
        .route("/{id}/shots", get(shot::list_shots))
        .route("/{id}/shots/{shot_id}", get(shot::get_shot).patch(shot::update_shot))
        .route("/{id}/shots/{shot_id}/regenerate", post(shot::regenerate_shot))
}
