//! Caller identity taken from the `X-User-ID` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use s2v_core::types::EntityId;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf a request runs.
///
/// ```ignore
/// async fn my_handler(user: CurrentUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: EntityId,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing X-User-ID".into()))?;

        let user_id = raw
            .parse()
            .map_err(|_| AppError::Unauthorized("invalid X-User-ID".into()))?;

        Ok(CurrentUser { user_id })
    }
}
