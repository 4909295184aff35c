//! テンプレートAPI
//!
//! ツリー全体の作成・更新・複製と、既定テンプレートの投入

use super::error::AppError;
use crate::common::auth::Actor;
use crate::types::payload::{
    CloneTemplateRequest, CreateTemplateRequest, ListTemplatesQuery, UpdateTemplateRequest,
};
use crate::types::response::{TemplateDetail, TemplateSummary};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

/// GET /api/v1/templates - テンプレート一覧
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<Json<Vec<TemplateSummary>>, AppError> {
    let templates = state
        .templates
        .list_templates(query.include_inactive)
        .await?;
    Ok(Json(templates))
}

/// GET /api/v1/templates/{id} - テンプレート詳細
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateDetail>, AppError> {
    Ok(Json(state.templates.get_template_detail(id).await?))
}

/// POST /api/v1/templates - テンプレート作成
///
/// # Returns
/// * `201 Created` - 作成されたツリー
/// * `409 Conflict` - 有効なテンプレート名の重複
/// * `422 Unprocessable Entity` - ツリー検証・入力境界違反
pub async fn create_template(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateDetail>), AppError> {
    let detail = state.templates.create_template(&request, &actor).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /api/v1/templates/{id} - テンプレート更新（ツリー全体）
///
/// # Returns
/// * `200 OK` - 再計算されたツリー
/// * `404 Not Found` - テンプレートが存在しない
/// * `409 Conflict` - 名前の重複またはバージョン不一致
/// * `422 Unprocessable Entity` - ツリー検証・入力境界違反
pub async fn update_template(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<TemplateDetail>, AppError> {
    Ok(Json(
        state.templates.update_template(id, &request, &actor).await?,
    ))
}

/// POST /api/v1/templates/{id}/clone - テンプレート複製
pub async fn clone_template(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CloneTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateDetail>), AppError> {
    let detail = state.templates.clone_template(id, &request, &actor).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// POST /api/v1/templates/default - 既定テンプレートの投入（冪等）
pub async fn seed_default_template(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
) -> Result<Json<TemplateDetail>, AppError> {
    Ok(Json(state.templates.seed_default_template(&actor).await?))
}

/// DELETE /api/v1/templates/{id} - テンプレートを配下ごと無効化
pub async fn delete_template(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.templates.delete_template(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
