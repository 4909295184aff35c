//! テンプレート更新 Contract Tests
//!
//! PUT /api/v1/templates/{id}
//!
//! ペイロードのIDで既存ノードを照合し、含まれないノードは無効化される。

use crate::support::{create_open_app, create_valid_template, error_message, get, put, yes_no};
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

/// 作成レスポンスをそのまま更新ペイロードとして使えるよう整形する
fn as_payload(detail: &Value) -> Value {
    json!({
        "name": detail["name"],
        "version": detail["version"],
        "areas": detail["areas"],
    })
}

#[tokio::test]
async fn test_update_keeps_matched_ids_and_bumps_version() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap();

    let mut payload = as_payload(&created);
    payload["areas"][0]["name"] = json!("Code Quality");
    payload["areas"][0]["weightage"] = json!(70);
    payload["areas"][1]["weightage"] = json!(30);

    let (status, updated) = put(&t.app, &format!("/api/v1/templates/{}", id), payload).await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["areas"][0]["id"], created["areas"][0]["id"]);
    assert_eq!(updated["areas"][0]["name"], "Code Quality");
    assert_eq!(updated["total_weightage"], 100);
    assert_eq!(
        updated["areas"][0]["scopes"][0]["questions"][0]["id"],
        created["areas"][0]["scopes"][0]["questions"][0]["id"]
    );
}

#[tokio::test]
async fn test_update_retires_omitted_nodes() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap();
    let dropped_area = created["areas"][1]["id"].as_str().unwrap().to_string();
    let dropped_scope = created["areas"][1]["scopes"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let mut payload = as_payload(&created);
    let mut kept = payload["areas"][0].clone();
    kept["weightage"] = json!(100);
    kept["scopes"][0]["questions"][0]["percentage"] = json!(100);
    payload["areas"] = json!([kept]);

    let (status, updated) = put(&t.app, &format!("/api/v1/templates/{}", id), payload).await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["areas"].as_array().unwrap().len(), 1);

    let (status, _) = get(&t.app, &format!("/api/v1/areas/{}", dropped_area)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&t.app, &format!("/api/v1/scopes/{}/recalculate", dropped_scope)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let retired: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_question_options WHERE isactive = 0",
    )
    .fetch_one(&t.db_pool)
    .await
    .unwrap();
    assert_eq!(retired, 2);
}

#[tokio::test]
async fn test_update_creates_nodes_without_known_ids() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap();

    let mut payload = as_payload(&created);
    payload["areas"][1]["scopes"][0]["questions"][0]["percentage"] = json!(20);
    let questions = payload["areas"][1]["scopes"][0]["questions"]
        .as_array_mut()
        .unwrap();
    questions.push(json!({"text": "Scope agreed?", "percentage": 20, "options": yes_no()}));
    questions.push(json!({
        "id": Uuid::new_v4(),
        "text": "Risks tracked?",
        "percentage": 0,
        "is_mandatory": false,
        "options": yes_no()
    }));

    let (status, updated) = put(&t.app, &format!("/api/v1/templates/{}", id), payload).await;
    assert_eq!(status, StatusCode::OK, "{}", updated);

    let scope = &updated["areas"][1]["scopes"][0];
    let questions = scope["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(scope["total_percentage"], 40);
    assert_eq!(questions[2]["is_mandatory"], false);
    assert_ne!(questions[2]["id"], Value::Null);
}

#[tokio::test]
async fn test_update_with_stale_version_is_conflict() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = put(
        &t.app,
        &format!("/api/v1/templates/{}", id),
        as_payload(&created),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = put(
        &t.app,
        &format!("/api/v1/templates/{}", id),
        as_payload(&created),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        error_message(&body),
        "Template 'Engineering' was modified concurrently (expected version 1, found 2)"
    );
}

#[tokio::test]
async fn test_update_without_version_skips_check() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap();

    for expected in 2..=3 {
        let mut payload = as_payload(&created);
        payload.as_object_mut().unwrap().remove("version");
        let (status, body) = put(&t.app, &format!("/api/v1/templates/{}", id), payload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], expected);
    }
}

#[tokio::test]
async fn test_update_rename_to_existing_name_is_conflict() {
    let t = create_open_app().await;
    create_valid_template(&t.app, "Engineering").await;
    let other = create_valid_template(&t.app, "Operations").await;

    let mut payload = as_payload(&other);
    payload["name"] = json!("ENGINEERING");
    let (status, _) = put(
        &t.app,
        &format!("/api/v1/templates/{}", other["id"].as_str().unwrap()),
        payload,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_update_changes_nothing() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap();

    let mut payload = as_payload(&created);
    payload["areas"][0]["name"] = json!("Renamed");
    payload["areas"][0]["scopes"][0]["questions"][0]["percentage"] = json!(10);

    let (status, _) = put(&t.app, &format!("/api/v1/templates/{}", id), payload).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, detail) = get(&t.app, &format!("/api/v1/templates/{}", id)).await;
    assert_eq!(detail, created);
}

#[tokio::test]
async fn test_update_unknown_template_is_404() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;

    let (status, body) = put(
        &t.app,
        &format!("/api/v1/templates/{}", Uuid::new_v4()),
        as_payload(&created),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "Template not found");
}

#[tokio::test]
async fn test_update_behind_committed_write_is_conflict() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap().to_string();

    // 別の書き込みが先にロックを取り、版を進めてからコミットする
    let mut writer = t.db_pool.begin_with("BEGIN IMMEDIATE").await.unwrap();
    let app = t.app.clone();
    let uri = format!("/api/v1/templates/{}", id);
    let payload = as_payload(&created);
    let pending = tokio::spawn(async move { put(&app, &uri, payload).await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    sqlx::query("UPDATE audit_templates SET version = version + 1 WHERE id = ?")
        .bind(&id)
        .execute(&mut *writer)
        .await
        .unwrap();
    writer.commit().await.unwrap();

    let (status, body) = pending.await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert_eq!(body["error"]["type"], "conflict_error");
    assert_eq!(
        error_message(&body),
        "Template 'Engineering' was modified concurrently (expected version 1, found 2)"
    );

    let (_, current) = get(&t.app, &format!("/api/v1/templates/{}", id)).await;
    assert_eq!(current["version"], 2);
    assert_eq!(current["areas"], created["areas"]);
}
