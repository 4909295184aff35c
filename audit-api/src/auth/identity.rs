//! Bearerトークンから操作者を解決する
//!
//! トークン検証と従業員マスタとの照合をトレイトの裏に置き、
//! テストや別のIdPへの差し替えを可能にする。

use super::jwt::verify_jwt;
use crate::common::auth::Actor;
use crate::common::error::{AuditError, AuditResult};
use crate::config::AuthConfig;
use crate::db::employees;
use async_trait::async_trait;
use sqlx::SqlitePool;

/// トークンを操作者に変換する
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// トークンを検証し、在籍中の従業員として解決する
    ///
    /// # Returns
    /// * `Ok(Actor)` - 解決された操作者
    /// * `Err(AuditError::Jwt | AuditError::Authentication)` - 401相当
    async fn resolve(&self, token: &str) -> AuditResult<Actor>;
}

/// HS256 JWT + 従業員テーブルによるリゾルバー
pub struct JwtIdentityResolver {
    config: AuthConfig,
    pool: SqlitePool,
}

impl JwtIdentityResolver {
    /// リゾルバーを作成
    pub fn new(config: AuthConfig, pool: SqlitePool) -> Self {
        Self { config, pool }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, token: &str) -> AuditResult<Actor> {
        let claims = verify_jwt(token, &self.config)?;
        let email = claims.email_address().ok_or_else(|| {
            AuditError::Authentication("Token does not carry an email address".to_string())
        })?;

        let employee = employees::find_active_by_email(&self.pool, email)
            .await?
            .ok_or_else(|| {
                tracing::warn!(email = %email, "Token subject is not an active employee");
                AuditError::Authentication("User is not a registered employee".to_string())
            })?;

        Ok(Actor::from(&employee))
    }
}
