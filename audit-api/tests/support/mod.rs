//! テスト用のアプリ構築とHTTPヘルパー

#![allow(dead_code)]

use audit_api::auth::JwtIdentityResolver;
use audit_api::config::AuthConfig;
use audit_api::{api, db, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// テスト用JWT署名鍵
pub const TEST_SECRET: &str = "contract-test-secret-0123456789abcdef";

/// テスト用アプリ一式
///
/// `TempDir` はDBファイルの寿命を握るため、テスト終了まで保持すること。
pub struct TestApp {
    pub app: Router,
    pub db_pool: SqlitePool,
    pub auth: AuthConfig,
    _dir: TempDir,
}

/// 一時ファイルDBでアプリを構築する
pub async fn create_test_app(auth_disabled: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("audit.db").display());
    let db_pool = db::migrations::initialize_database(&url).await.unwrap();

    let auth = AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        audience: None,
        issuer: None,
        disabled: auth_disabled,
    };
    let identity = Arc::new(JwtIdentityResolver::new(auth.clone(), db_pool.clone()));
    let state = AppState::new(db_pool.clone(), identity, auth_disabled);

    TestApp {
        app: api::create_app(state),
        db_pool,
        auth,
        _dir: dir,
    }
}

/// 認証無効化モードのアプリ（開発用の操作者が注入される）
pub async fn create_open_app() -> TestApp {
    create_test_app(true).await
}

/// リクエストを送り、ステータスとJSONボディを返す
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// 認証なしのGET
pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None, None).await
}

/// 認証なしのPOST
pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, None, Some(body)).await
}

/// 認証なしのPUT
pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", uri, None, Some(body)).await
}

/// 認証なしのDELETE
pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, None, None).await
}

/// 選択肢 Yes(1) / No(0)
pub fn yes_no() -> Value {
    json!([{"label": "Yes", "value": 1}, {"label": "No", "value": 0}])
}

/// 配点合計100の2エリア構成のツリー
pub fn valid_areas() -> Value {
    json!([
        {
            "name": "Quality",
            "weightage": 60,
            "scopes": [{
                "name": "Code",
                "questions": [{"text": "Reviews done?", "percentage": 60, "options": yes_no()}]
            }]
        },
        {
            "name": "Delivery",
            "weightage": 40,
            "scopes": [{
                "name": "Plan",
                "questions": [{"text": "On time?", "percentage": 40, "options": yes_no()}]
            }]
        }
    ])
}

/// 有効なテンプレートを作成してレスポンスを返す
pub async fn create_valid_template(app: &Router, name: &str) -> Value {
    let (status, body) = post(
        app,
        "/api/v1/templates",
        json!({"name": name, "areas": valid_areas()}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
    body
}

/// エラーボディからメッセージを取り出す
pub fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}
