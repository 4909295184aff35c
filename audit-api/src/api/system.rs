//! システムAPI（ウェルカム・ヘルスチェック・現在の操作者）

use crate::common::auth::Actor;
use axum::{Extension, Json};
use serde_json::{json, Value};

/// GET /
pub async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to Audit Management API" }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// GET /current - 認証済みの操作者
pub async fn current_actor(Extension(actor): Extension<Actor>) -> Json<Actor> {
    Json(actor)
}
