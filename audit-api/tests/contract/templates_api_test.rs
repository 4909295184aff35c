//! テンプレートAPI Contract Tests
//!
//! POST /api/v1/templates, GET /api/v1/templates, GET /api/v1/templates/{id},
//! POST /api/v1/templates/{id}/clone, POST /api/v1/templates/default,
//! DELETE /api/v1/templates/{id}

use crate::support::{
    create_open_app, create_valid_template, delete, error_message, get, post, valid_areas, yes_no,
};
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// POST /api/v1/templates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_returns_tree_with_totals() {
    let t = create_open_app().await;
    let body = create_valid_template(&t.app, "  Engineering  ").await;

    assert_eq!(body["name"], "Engineering");
    assert_eq!(body["version"], 1);
    assert_eq!(body["isactive"], true);
    assert_eq!(body["total_weightage"], 100);

    let areas = body["areas"].as_array().unwrap();
    assert_eq!(areas.len(), 2);
    assert_eq!(areas[0]["name"], "Quality");
    assert_eq!(areas[0]["scopes"][0]["total_percentage"], 60);
    assert_eq!(areas[1]["scopes"][0]["total_percentage"], 40);

    let options = areas[0]["scopes"][0]["questions"][0]["options"]
        .as_array()
        .unwrap();
    assert_eq!(options.len(), 2);
}

#[tokio::test]
async fn test_create_duplicate_name_is_conflict() {
    let t = create_open_app().await;
    create_valid_template(&t.app, "Engineering").await;

    let (status, body) = post(
        &t.app,
        "/api/v1/templates",
        json!({"name": "engineering ", "areas": valid_areas()}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "conflict_error");
}

#[tokio::test]
async fn test_create_rejects_percentage_total_and_persists_nothing() {
    let t = create_open_app().await;
    let mut areas = valid_areas();
    areas[1]["scopes"][0]["questions"][0]["percentage"] = json!(30);

    let (status, body) = post(
        &t.app,
        "/api/v1/templates",
        json!({"name": "Engineering", "areas": areas}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_message(&body),
        "Total weightage of all questions should be exactly 100%"
    );

    let (_, list) = get(&t.app, "/api/v1/templates").await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_rejects_empty_branches() {
    let t = create_open_app().await;

    let mut areas = valid_areas();
    areas[1]["scopes"] = json!([]);
    let (status, body) = post(&t.app, "/api/v1/templates", json!({"name": "A", "areas": areas})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_message(&body),
        "Area 'Delivery' must have at least one scope"
    );

    let mut areas = valid_areas();
    areas[0]["scopes"][0]["questions"][0]["options"] = json!([]);
    let (status, body) = post(&t.app, "/api/v1/templates", json!({"name": "B", "areas": areas})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_message(&body),
        "Question 'Reviews done?' in scope 'Code', area 'Quality' must have at least one option"
    );
}

#[tokio::test]
async fn test_create_rejects_duplicate_siblings() {
    let t = create_open_app().await;

    let mut areas = valid_areas();
    areas[1]["name"] = json!(" QUALITY");
    let (status, body) = post(&t.app, "/api/v1/templates", json!({"name": "A", "areas": areas})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_message(&body), "Duplicate area name: 'QUALITY'");

    let mut areas = valid_areas();
    areas[0]["scopes"][0]["questions"][0]["options"] =
        json!([{"label": "Yes", "value": 1}, {"label": "Sometimes", "value": 1}]);
    let (status, body) = post(&t.app, "/api/v1/templates", json!({"name": "B", "areas": areas})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_message(&body),
        "Duplicate option value 1 in question 'Reviews done?', scope 'Code'"
    );
}

#[tokio::test]
async fn test_create_rejects_out_of_range_fields() {
    let t = create_open_app().await;

    let mut areas = valid_areas();
    areas[0]["weightage"] = json!(0);
    let (status, body) = post(&t.app, "/api/v1/templates", json!({"name": "A", "areas": areas})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_message(&body),
        "Weightage of area 'Quality' must be between 1 and 100, got 0"
    );

    let mut areas = valid_areas();
    areas[0]["scopes"][0]["questions"][0]["options"][0]["value"] = json!(6);
    let (status, _) = post(&t.app, "/api/v1/templates", json!({"name": "B", "areas": areas})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(
        &t.app,
        "/api/v1/templates",
        json!({"name": "   ", "areas": valid_areas()}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_with_empty_areas_fails_total() {
    let t = create_open_app().await;
    let (status, _) = post(&t.app, "/api/v1/templates", json!({"name": "Empty"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// GET /api/v1/templates, GET /api/v1/templates/{id}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_and_get() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap();

    let (status, list) = get(&t.app, "/api/v1/templates").await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], id);
    assert_eq!(list[0]["total_weightage"], 100);
    assert_eq!(list[0]["areas"].as_array().unwrap().len(), 2);

    let (status, detail) = get(&t.app, &format!("/api/v1/templates/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail, created);
}

#[tokio::test]
async fn test_get_unknown_template_is_404() {
    let t = create_open_app().await;
    let (status, body) = get(&t.app, &format!("/api/v1/templates/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "Template not found");
    assert_eq!(body["error"]["code"], "404");
}

#[tokio::test]
async fn test_get_with_malformed_id_is_client_error() {
    let t = create_open_app().await;
    let (status, _) = get(&t.app, "/api/v1/templates/not-a-uuid").await;
    assert!(status.is_client_error());
}

// ---------------------------------------------------------------------------
// POST /api/v1/templates/{id}/clone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_clone_creates_independent_tree() {
    let t = create_open_app().await;
    let source = create_valid_template(&t.app, "Engineering").await;
    let source_id = source["id"].as_str().unwrap();

    let (status, clone) = post(
        &t.app,
        &format!("/api/v1/templates/{}/clone", source_id),
        json!({"name": "Engineering 2027", "areas": valid_areas()}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", clone);
    assert_ne!(clone["id"], source["id"]);
    assert_eq!(clone["name"], "Engineering 2027");
    assert_ne!(clone["areas"][0]["id"], source["areas"][0]["id"]);

    let (_, list) = get(&t.app, "/api/v1/templates").await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_clone_unknown_source_is_404() {
    let t = create_open_app().await;
    let (status, body) = post(
        &t.app,
        &format!("/api/v1/templates/{}/clone", Uuid::new_v4()),
        json!({"name": "Copy", "areas": valid_areas()}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "Source template not found");
}

#[tokio::test]
async fn test_clone_with_source_name_is_conflict() {
    let t = create_open_app().await;
    let source = create_valid_template(&t.app, "Engineering").await;

    let (status, _) = post(
        &t.app,
        &format!("/api/v1/templates/{}/clone", source["id"].as_str().unwrap()),
        json!({"name": "Engineering", "areas": valid_areas()}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// POST /api/v1/templates/default
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_seed_default_is_idempotent() {
    let t = create_open_app().await;

    let (status, first) = post(&t.app, "/api/v1/templates/default", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    assert_eq!(first["name"], "Default Audit Template");
    assert_eq!(first["total_weightage"], 100);
    let areas = first["areas"].as_array().unwrap();
    assert_eq!(areas.len(), 5);
    assert!(areas.iter().all(|a| a["weightage"] == 20));
    assert!(areas.iter().all(|a| a["scopes"].as_array().unwrap().is_empty()));

    let (status, second) = post(&t.app, "/api/v1/templates/default", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);

    let (_, list) = get(&t.app, "/api/v1/templates").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// DELETE /api/v1/templates/{id}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_delete_hides_template_and_frees_name() {
    let t = create_open_app().await;
    let created = create_valid_template(&t.app, "Engineering").await;
    let id = created["id"].as_str().unwrap();
    let area_id = created["areas"][0]["id"].as_str().unwrap();

    let (status, _) = delete(&t.app, &format!("/api/v1/templates/{}", id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&t.app, &format!("/api/v1/templates/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&t.app, &format!("/api/v1/areas/{}", area_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = get(&t.app, "/api/v1/templates").await;
    assert!(list.as_array().unwrap().is_empty());
    let (_, all) = get(&t.app, "/api/v1/templates?include_inactive=true").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["isactive"], false);

    create_valid_template(&t.app, "Engineering").await;

    let (status, _) = delete(&t.app, &format!("/api/v1/templates/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_options_in_create_are_unique_per_question_only() {
    let t = create_open_app().await;
    let areas = json!([{
        "name": "Quality",
        "weightage": 100,
        "scopes": [{
            "name": "Code",
            "questions": [
                {"text": "Reviews?", "percentage": 50, "options": yes_no()},
                {"text": "Tests?", "percentage": 50, "options": yes_no()}
            ]
        }]
    }]);
    let (status, body) = post(&t.app, "/api/v1/templates", json!({"name": "T", "areas": areas})).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["areas"][0]["scopes"][0]["total_percentage"], 100);
}

#[tokio::test]
async fn test_create_storage_failure_persists_nothing() {
    let t = create_open_app().await;
    sqlx::query(
        "CREATE TRIGGER fail_option_insert BEFORE INSERT ON audit_question_options
         BEGIN SELECT RAISE(ABORT, 'option storage failure'); END",
    )
    .execute(&t.db_pool)
    .await
    .unwrap();

    let (status, body) = post(
        &t.app,
        "/api/v1/templates",
        json!({"name": "Engineering", "areas": valid_areas()}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "server_error");
    assert_eq!(error_message(&body), "Database error");

    let (_, all) = get(&t.app, "/api/v1/templates?include_inactive=true").await;
    assert!(all.as_array().unwrap().is_empty());
    for table in ["audit_templates", "audit_areas", "audit_scopes", "audit_questions"] {
        let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&t.db_pool)
            .await
            .unwrap();
        assert_eq!(rows, 0, "{} kept rows after rollback", table);
    }
}
