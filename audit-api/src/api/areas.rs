//! エリア・スコープAPI

use super::error::AppError;
use crate::common::auth::Actor;
use crate::types::payload::{
    CreateAreaRequest, CreateScopeRequest, UpdateAreaRequest, UpdateScopeRequest,
};
use crate::types::response::{AreaDetail, AreaResponse, ScopeDetail, ScopeResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

/// GET /api/v1/templates/{id}/areas
pub async fn list_areas(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> Result<Json<Vec<AreaDetail>>, AppError> {
    Ok(Json(state.templates.list_areas(template_id).await?))
}

/// POST /api/v1/templates/{id}/areas
pub async fn create_area(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    Json(request): Json<CreateAreaRequest>,
) -> Result<(StatusCode, Json<AreaResponse>), AppError> {
    let area = state
        .templates
        .create_area(template_id, &request, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(area)))
}

/// GET /api/v1/areas/{id}
pub async fn get_area(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AreaDetail>, AppError> {
    Ok(Json(state.templates.get_area(id).await?))
}

/// PUT /api/v1/areas/{id}
pub async fn update_area(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAreaRequest>,
) -> Result<Json<AreaResponse>, AppError> {
    Ok(Json(state.templates.update_area(id, &request, &actor).await?))
}

/// DELETE /api/v1/areas/{id}
pub async fn delete_area(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.templates.delete_area(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/areas/{id}/scopes
pub async fn list_scopes(
    State(state): State<AppState>,
    Path(area_id): Path<Uuid>,
) -> Result<Json<Vec<ScopeDetail>>, AppError> {
    Ok(Json(state.templates.list_scopes(area_id).await?))
}

/// POST /api/v1/areas/{id}/scopes
pub async fn create_scope(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(area_id): Path<Uuid>,
    Json(request): Json<CreateScopeRequest>,
) -> Result<(StatusCode, Json<ScopeResponse>), AppError> {
    let scope = state
        .templates
        .create_scope(area_id, &request, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(scope)))
}

/// PUT /api/v1/scopes/{id}
pub async fn update_scope(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateScopeRequest>,
) -> Result<Json<ScopeResponse>, AppError> {
    Ok(Json(state.templates.update_scope(id, &request, &actor).await?))
}

/// DELETE /api/v1/scopes/{id}
pub async fn delete_scope(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.templates.delete_scope(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/scopes/{id}/recalculate - 配点合計の再計算
pub async fn recalculate_scope(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScopeDetail>, AppError> {
    Ok(Json(state.templates.recalculate_scope(id).await?))
}
