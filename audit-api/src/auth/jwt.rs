// JWT生成と検証（jsonwebtoken実装、HS256）

use crate::common::auth::Claims;
use crate::common::error::{AuditError, AuditResult};
use crate::config::AuthConfig;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// JWT有効期限（24時間）
pub const JWT_EXPIRATION_HOURS: i64 = 24;

/// JWTトークンを生成
///
/// 開発・テスト用。本番では外部IdPが発行したトークンを検証する。
///
/// # Arguments
/// * `email` - `unique_name` に載せるメールアドレス
/// * `display_name` - 表示名
/// * `config` - 署名鍵と `aud` / `iss`
///
/// # Returns
/// * `Ok(String)` - JWTトークン（3つのドット区切り部分）
/// * `Err(AuditError)` - 生成失敗
pub fn create_jwt(
    email: &str,
    display_name: Option<&str>,
    config: &AuthConfig,
) -> AuditResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::hours(JWT_EXPIRATION_HOURS))
        .ok_or_else(|| AuditError::Jwt("Failed to calculate expiration time".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: email.to_string(),
        unique_name: Some(email.to_string()),
        email: None,
        name: display_name.map(str::to_string),
        exp: expiration,
        aud: config.audience.clone(),
        iss: config.issuer.clone(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuditError::Jwt(format!("Failed to create JWT: {}", e)))
}

fn validation(config: &AuthConfig) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }
    validation
}

/// JWTトークンを検証
///
/// 署名・有効期限に加え、設定されていれば `aud` / `iss` を検査する。
///
/// # Returns
/// * `Ok(Claims)` - 検証済みクレーム
/// * `Err(AuditError::Jwt)` - 検証失敗（無効なトークン、期限切れなど）
pub fn verify_jwt(token: &str, config: &AuthConfig) -> AuditResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation(config),
    )
    .map(|data| data.claims)
    .map_err(|e| AuditError::Jwt(format!("Failed to verify JWT: {}", e)))
}
