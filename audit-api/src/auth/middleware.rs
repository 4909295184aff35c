// 認証ミドルウェア実装

use crate::api::error::AppError;
use crate::common::auth::Actor;
use crate::common::error::AuditError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

/// `Authorization: Bearer <token>` からトークンを取り出す
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// 操作者認証ミドルウェア
///
/// Bearerトークンを `IdentityResolver` で操作者に解決し、
/// `Extension<Actor>` としてハンドラーに渡す。
/// 認証無効化モードでは開発用の操作者を注入する。
///
/// # Returns
/// * `Ok(Response)` - 後続ハンドラーのレスポンス
/// * `Err(AppError)` - 401（トークンなし・不正・未登録の従業員）
pub async fn actor_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.auth_disabled {
        request.extensions_mut().insert(Actor::development());
        return Ok(next.run(request).await);
    }

    let token = extract_bearer_token(request.headers()).ok_or_else(|| {
        AuditError::Authentication("Missing or malformed Authorization header".to_string())
    })?;

    let actor = state.identity.resolve(&token).await.map_err(|e| {
        tracing::warn!("Bearer token rejected: {}", e);
        e
    })?;

    tracing::debug!(actor = actor.user_id, "Request authenticated");
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}
