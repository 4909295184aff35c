//! 起動時の初期従業員登録
//!
//! 従業員マスタは外部で管理されるが、空のデータベースでも
//! 最初の操作者がトークンで認証できるよう、環境変数から1名を登録する。

use crate::common::auth::Employee;
use crate::common::error::{AuditError, AuditResult};
use crate::db::employees;

/// 環境変数から初期従業員を登録
///
/// # Environment Variables
/// * `AUDIT_ADMIN_EMAIL` - メールアドレス（未設定なら何もしない）
/// * `AUDIT_ADMIN_NAME` - 氏名（省略時: "Administrator"）
///
/// # Returns
/// * `Ok(Some(Employee))` - 登録済み、または今回登録した従業員
/// * `Ok(None)` - `AUDIT_ADMIN_EMAIL` が未設定
/// * `Err(AuditError)` - 登録失敗
pub async fn ensure_bootstrap_employee(pool: &sqlx::SqlitePool) -> AuditResult<Option<Employee>> {
    let email = match std::env::var("AUDIT_ADMIN_EMAIL") {
        Ok(e) if !e.trim().is_empty() => e.trim().to_string(),
        _ => {
            tracing::debug!("AUDIT_ADMIN_EMAIL not set, skipping bootstrap employee");
            return Ok(None);
        }
    };
    let name = std::env::var("AUDIT_ADMIN_NAME")
        .ok()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Administrator".to_string());

    if let Some(existing) = employees::find_active_by_email(pool, &email).await? {
        tracing::debug!("Bootstrap employee {} already exists", email);
        return Ok(Some(existing));
    }

    match employees::create(pool, &name, &email).await {
        Ok(employee) => {
            tracing::info!("Created bootstrap employee: email={}", email);
            Ok(Some(employee))
        }
        Err(AuditError::Conflict(_)) => {
            // 退職扱いの同一アドレスが残っている
            tracing::warn!(
                "Bootstrap employee {} exists but is inactive, skipping creation",
                email
            );
            Ok(None)
        }
        Err(e) => {
            tracing::error!("Failed to create bootstrap employee: {}", e);
            Err(e)
        }
    }
}
