//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::common::error::AuditError;
use axum::{response::IntoResponse, Json};

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub AuditError);

impl<E> From<E> for AppError
where
    E: Into<AuditError>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        // クライアントには external_message() のみを返し、詳細はログに残す
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!(status = status.as_u16(), "Request rejected: {}", self.0);
        }

        (status, Json(self.0.to_error_response())).into_response()
    }
}
