use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::user::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/operations/{id}
///
/// Accepts a bare id or an `operations/<id>` name.
pub async fn get_operation(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let operation = state.operations().get(user.user_id, &name).await?;
    Ok(Json(DataResponse { data: operation }))
}
