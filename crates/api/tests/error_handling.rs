//! `AppError` to HTTP response mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use s2v_api::error::AppError;
use s2v_core::error::{ErrorCode, ServiceError};

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn validation_error_returns_400_with_code() {
    let err = ServiceError::new(ErrorCode::InvalidStyle, "unsupported style: \"noir\"");

    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "SVC1001");
    assert_eq!(json["error"], "unsupported style: \"noir\"");
}

#[tokio::test]
async fn not_found_returns_404_with_default_message() {
    let (status, json) =
        error_to_response(ServiceError::from_code(ErrorCode::StoryNotFound).into()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "SVC1101");
    assert_eq!(json["error"], "story not found");
}

#[tokio::test]
async fn incomplete_story_returns_502() {
    let (status, json) =
        error_to_response(ServiceError::from_code(ErrorCode::ShotAssetMissing).into()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "SVC4103");
}

#[tokio::test]
async fn timeout_returns_504() {
    let (status, _) =
        error_to_response(ServiceError::from_code(ErrorCode::OperationTimeout).into()).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn internal_error_hides_the_cause() {
    let cause = std::io::Error::new(std::io::ErrorKind::Other, "password=hunter2");
    let err = ServiceError::wrap(ErrorCode::DatabaseActionFailed, "find story", cause);

    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "SVC5001");
    assert_eq!(json["error"], "find story");
}

#[tokio::test]
async fn unauthorized_returns_401() {
    let (status, json) =
        error_to_response(AppError::Unauthorized("missing X-User-ID".into())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["error"], "missing X-User-ID");
}
