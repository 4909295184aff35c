//! システムAPI Contract Tests
//!
//! GET /, GET /health

use crate::support::{create_test_app, get};
use axum::http::StatusCode;

#[tokio::test]
async fn test_welcome_is_public() {
    let t = create_test_app(false).await;
    let (status, body) = get(&t.app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Audit Management API");
}

#[tokio::test]
async fn test_health_is_public() {
    let t = create_test_app(false).await;
    let (status, body) = get(&t.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let t = create_test_app(true).await;
    let (status, _) = get(&t.app, "/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
