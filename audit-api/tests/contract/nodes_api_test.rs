//! ノード単体API Contract Tests
//!
//! /api/v1/templates/{id}/areas, /api/v1/areas/{id}, /api/v1/areas/{id}/scopes,
//! /api/v1/scopes/{id}, /api/v1/scopes/{id}/questions, /api/v1/questions/{id},
//! /api/v1/questions/{id}/options, /api/v1/options/{id}

use crate::support::{create_open_app, delete, error_message, get, post, put};
use axum::{http::StatusCode, Router};
use serde_json::{json, Value};
use uuid::Uuid;

/// 既定テンプレートを投入し、最初のエリアを返す
async fn seeded_area(app: &Router) -> (String, Value) {
    let (status, template) = post(app, "/api/v1/templates/default", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let id = template["id"].as_str().unwrap().to_string();
    (id, template["areas"][0].clone())
}

async fn template_version(app: &Router, id: &str) -> i64 {
    let (_, detail) = get(app, &format!("/api/v1/templates/{}", id)).await;
    detail["version"].as_i64().unwrap()
}

#[tokio::test]
async fn test_build_scope_question_and_options() {
    let t = create_open_app().await;
    let (template_id, area) = seeded_area(&t.app).await;
    let area_id = area["id"].as_str().unwrap();

    let (status, scope) = post(
        &t.app,
        &format!("/api/v1/areas/{}/scopes", area_id),
        json!({"name": " Delivery "}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", scope);
    assert_eq!(scope["name"], "Delivery");
    assert_eq!(scope["area_id"], area_id);
    let scope_id = scope["id"].as_str().unwrap();

    let (status, question) = post(
        &t.app,
        &format!("/api/v1/scopes/{}/questions", scope_id),
        json!({
            "text": "Milestones met?",
            "percentage": 30,
            "options": [
                {"label": "Always", "value": 5},
                {"label": "Never", "value": 0}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", question);
    assert_eq!(question["is_mandatory"], true);
    let question_id = question["id"].as_str().unwrap();

    let (status, _) = post(
        &t.app,
        &format!("/api/v1/questions/{}/options", question_id),
        json!({"label": "Mostly", "value": 3}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, options) = get(&t.app, &format!("/api/v1/questions/{}/options", question_id)).await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<i64> = options
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["value"].as_i64().unwrap())
        .collect();
    assert_eq!(values, vec![0, 3, 5]);

    let (status, recalculated) =
        get(&t.app, &format!("/api/v1/scopes/{}/recalculate", scope_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recalculated["total_percentage"], 30);

    let (_, area_detail) = get(&t.app, &format!("/api/v1/areas/{}", area_id)).await;
    assert_eq!(area_detail["scopes"][0]["questions"][0]["options"].as_array().unwrap().len(), 3);

    // 投入時の1 + スコープ・設問・選択肢の3回
    assert_eq!(template_version(&t.app, &template_id).await, 4);
}

#[tokio::test]
async fn test_duplicate_siblings_use_tree_wording() {
    let t = create_open_app().await;
    let (template_id, area) = seeded_area(&t.app).await;
    let area_id = area["id"].as_str().unwrap();

    let (status, body) = post(
        &t.app,
        &format!("/api/v1/templates/{}/areas", template_id),
        json!({"name": "communication", "weightage": 10}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_message(&body), "Duplicate area name: 'communication'");

    let (_, scope) = post(
        &t.app,
        &format!("/api/v1/areas/{}/scopes", area_id),
        json!({"name": "Delivery"}),
    )
    .await;
    let (status, body) = post(
        &t.app,
        &format!("/api/v1/areas/{}/scopes", area_id),
        json!({"name": "DELIVERY"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_message(&body),
        "Duplicate scope name 'DELIVERY' in area 'Project Execution'"
    );

    let scope_id = scope["id"].as_str().unwrap();
    let (_, question) = post(
        &t.app,
        &format!("/api/v1/scopes/{}/questions", scope_id),
        json!({"text": "On time?", "percentage": 10, "options": [{"label": "Yes", "value": 1}]}),
    )
    .await;
    let question_id = question["id"].as_str().unwrap();
    let (status, body) = post(
        &t.app,
        &format!("/api/v1/questions/{}/options", question_id),
        json!({"label": "yes", "value": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_message(&body),
        "Duplicate option label 'yes' in question 'On time?', scope 'Delivery'"
    );
}

#[tokio::test]
async fn test_update_and_delete_nodes() {
    let t = create_open_app().await;
    let (template_id, area) = seeded_area(&t.app).await;
    let area_id = area["id"].as_str().unwrap();

    let (status, updated) = put(
        &t.app,
        &format!("/api/v1/areas/{}", area_id),
        json!({"weightage": 25}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["weightage"], 25);
    assert_eq!(updated["name"], "Project Execution");

    let (_, scope) = post(
        &t.app,
        &format!("/api/v1/areas/{}/scopes", area_id),
        json!({"name": "Delivery"}),
    )
    .await;
    let scope_id = scope["id"].as_str().unwrap();
    let (status, renamed) = put(
        &t.app,
        &format!("/api/v1/scopes/{}", scope_id),
        json!({"name": "Planning"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Planning");

    let (_, question) = post(
        &t.app,
        &format!("/api/v1/scopes/{}/questions", scope_id),
        json!({"text": "On time?", "percentage": 10, "options": [{"label": "Yes", "value": 1}]}),
    )
    .await;
    let question_id = question["id"].as_str().unwrap();
    let option_id = question["options"][0]["id"].as_str().unwrap();

    let (status, q) = put(
        &t.app,
        &format!("/api/v1/questions/{}", question_id),
        json!({"percentage": 40, "is_mandatory": false}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(q["percentage"], 40);
    assert_eq!(q["is_mandatory"], false);
    assert_eq!(q["text"], "On time?");

    let (status, o) = put(
        &t.app,
        &format!("/api/v1/options/{}", option_id),
        json!({"label": "Always", "value": 5}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(o["label"], "Always");

    let (status, _) = delete(&t.app, &format!("/api/v1/options/{}", option_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, options) = get(&t.app, &format!("/api/v1/questions/{}/options", question_id)).await;
    assert!(options.as_array().unwrap().is_empty());

    let (status, _) = delete(&t.app, &format!("/api/v1/questions/{}", question_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, questions) = get(&t.app, &format!("/api/v1/scopes/{}/questions", scope_id)).await;
    assert!(questions.as_array().unwrap().is_empty());

    let (status, _) = delete(&t.app, &format!("/api/v1/scopes/{}", scope_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = delete(&t.app, &format!("/api/v1/areas/{}", area_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, areas) = get(&t.app, &format!("/api/v1/templates/{}/areas", template_id)).await;
    assert_eq!(areas.as_array().unwrap().len(), 4);
    let (_, detail) = get(&t.app, &format!("/api/v1/templates/{}", template_id)).await;
    assert_eq!(detail["total_weightage"], 80);
}

#[tokio::test]
async fn test_out_of_range_fields_are_rejected() {
    let t = create_open_app().await;
    let (template_id, area) = seeded_area(&t.app).await;

    let (status, _) = post(
        &t.app,
        &format!("/api/v1/templates/{}/areas", template_id),
        json!({"name": "Extra", "weightage": 101}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, scope) = post(
        &t.app,
        &format!("/api/v1/areas/{}/scopes", area["id"].as_str().unwrap()),
        json!({"name": "Delivery"}),
    )
    .await;
    let (status, body) = post(
        &t.app,
        &format!("/api/v1/scopes/{}/questions", scope["id"].as_str().unwrap()),
        json!({"text": "On time?", "percentage": 150}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn test_unknown_nodes_are_404() {
    let t = create_open_app().await;
    let missing = Uuid::new_v4();

    let cases = [
        ("GET", format!("/api/v1/templates/{}/areas", missing), "Template not found"),
        ("GET", format!("/api/v1/areas/{}", missing), "Area not found"),
        ("GET", format!("/api/v1/areas/{}/scopes", missing), "Area not found"),
        ("GET", format!("/api/v1/scopes/{}/questions", missing), "Scope not found"),
        ("GET", format!("/api/v1/questions/{}/options", missing), "Question not found"),
        ("DELETE", format!("/api/v1/options/{}", missing), "Option not found"),
    ];
    for (method, uri, message) in cases {
        let (status, body) = crate::support::send(&t.app, method, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(error_message(&body), message);
    }
}
