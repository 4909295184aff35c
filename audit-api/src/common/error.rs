//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! `AuditError`は`status_code()`・`error_type()`・`external_message()`を提供し、
//! APIレイヤーはこれらからJSONエラーレスポンスを組み立てる。

use crate::template::validate::TreeViolation;
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// UUID parse error
    #[error("UUID parse error: {0}")]
    UuidParse(#[from] uuid::Error),

    /// Validation error (field boundary checks)
    #[error("{0}")]
    Validation(String),
}

/// 監査APIのエラー型
#[derive(Debug, Error)]
pub enum AuditError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict error (duplicate template name, stale version)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// テンプレートツリーの構造・数値制約違反
    #[error(transparent)]
    InvalidTree(#[from] TreeViolation),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// `NotFound`を生成するショートカット
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// フィールド境界チェック違反を生成するショートカット
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Common(CommonError::Validation(message.into()))
    }

    /// Returns a message that is safe to show to API clients.
    ///
    /// Client-side errors carry their detail (which node, which template), while
    /// storage and internal failures are masked. Use `to_string()` for server logs.
    pub fn external_message(&self) -> String {
        match self {
            Self::Common(CommonError::Validation(msg)) => msg.clone(),
            Self::Common(_) => "Request error".to_string(),
            Self::NotFound(msg) => msg.clone(),
            Self::Conflict(msg) => msg.clone(),
            Self::InvalidTree(violation) => violation.to_string(),
            Self::Database(_) => "Database error".to_string(),
            Self::Jwt(_) => "Invalid token".to_string(),
            Self::Authentication(msg) => msg.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Returns the error type string used in API error bodies.
    ///
    /// # Error Types
    ///
    /// - `invalid_request_error`: Bad request parameters
    /// - `validation_error`: Template tree or field constraints violated
    /// - `authentication_error`: Auth failures
    /// - `not_found_error`: Resource not found
    /// - `conflict_error`: Duplicate name or stale version
    /// - `server_error`: Internal server errors
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Common(CommonError::Validation(_)) => "validation_error",
            Self::Common(_) => "invalid_request_error",
            Self::NotFound(_) => "not_found_error",
            Self::Conflict(_) => "conflict_error",
            Self::InvalidTree(_) => "validation_error",
            Self::Database(_) => "server_error",
            Self::Jwt(_) => "authentication_error",
            Self::Authentication(_) => "authentication_error",
            Self::Internal(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Common(CommonError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Common(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidTree(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Jwt(_) => StatusCode::UNAUTHORIZED,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts this error to the API error body.
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                message: self.external_message(),
                error_type: self.error_type().to_string(),
                code: Some(self.status_code().as_u16().to_string()),
            },
        }
    }
}

/// APIエラーレスポンス
///
/// # Example
///
/// ```json
/// {
///   "error": {
///     "message": "Template not found",
///     "type": "not_found_error",
///     "code": "404"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// The error details
    pub error: ErrorDetail,
}

/// エラー詳細
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Human-readable error message
    pub message: String,
    /// Error type (e.g., "validation_error", "server_error")
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code (HTTP status as string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result alias used across the crate
pub type AuditResult<T> = Result<T, AuditError>;
