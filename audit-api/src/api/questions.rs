//! 設問・選択肢API

use super::error::AppError;
use crate::common::auth::Actor;
use crate::types::payload::{
    CreateOptionRequest, CreateQuestionRequest, UpdateOptionRequest, UpdateQuestionRequest,
};
use crate::types::response::{OptionResponse, QuestionDetail};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

/// GET /api/v1/scopes/{id}/questions
pub async fn list_questions(
    State(state): State<AppState>,
    Path(scope_id): Path<Uuid>,
) -> Result<Json<Vec<QuestionDetail>>, AppError> {
    Ok(Json(state.templates.list_questions(scope_id).await?))
}

/// POST /api/v1/scopes/{id}/questions - 設問作成（選択肢を同時に作成可能）
pub async fn create_question(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(scope_id): Path<Uuid>,
    Json(request): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionDetail>), AppError> {
    let question = state
        .templates
        .create_question(scope_id, &request, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// PUT /api/v1/questions/{id}
pub async fn update_question(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQuestionRequest>,
) -> Result<Json<QuestionDetail>, AppError> {
    Ok(Json(
        state.templates.update_question(id, &request, &actor).await?,
    ))
}

/// DELETE /api/v1/questions/{id}
pub async fn delete_question(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.templates.delete_question(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/questions/{id}/options - 点数の昇順
pub async fn list_options(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> Result<Json<Vec<OptionResponse>>, AppError> {
    Ok(Json(state.templates.list_options(question_id).await?))
}

/// POST /api/v1/questions/{id}/options
pub async fn create_option(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    Json(request): Json<CreateOptionRequest>,
) -> Result<(StatusCode, Json<OptionResponse>), AppError> {
    let option = state
        .templates
        .create_option(question_id, &request, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(option)))
}

/// PUT /api/v1/options/{id}
pub async fn update_option(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOptionRequest>,
) -> Result<Json<OptionResponse>, AppError> {
    Ok(Json(state.templates.update_option(id, &request, &actor).await?))
}

/// DELETE /api/v1/options/{id}
pub async fn delete_option(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.templates.delete_option(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
