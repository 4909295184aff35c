//! 従業員の検索・登録
//!
//! 従業員マスタ自体の管理は範囲外で、操作者の解決と初期ユーザー作成にのみ使う。

use super::{db_error, format_timestamp, parse_timestamp};
use crate::common::auth::Employee;
use crate::common::error::{AuditError, AuditResult};
use chrono::Utc;
use sqlx::SqlitePool;

/// 従業員を登録
///
/// # Arguments
/// * `pool` - データベース接続プール
/// * `name` - 氏名
/// * `email` - メールアドレス（大文字小文字を区別せず一意）
///
/// # Returns
/// * `Ok(Employee)` - 登録された従業員
/// * `Err(AuditError)` - 登録失敗（メールアドレス重複など）
pub async fn create(pool: &SqlitePool, name: &str, email: &str) -> AuditResult<Employee> {
    let created_at = Utc::now();

    let result = sqlx::query(
        "INSERT INTO employees (name, email, isactive, created_at) VALUES (?, ?, 1, ?)",
    )
    .bind(name)
    .bind(email)
    .bind(format_timestamp(created_at))
    .execute(pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AuditError::Conflict(format!("Employee '{}' already exists", email))
        } else {
            AuditError::Database(format!("Failed to create employee: {}", e))
        }
    })?;

    Ok(Employee {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        email: email.to_string(),
        isactive: true,
        created_at,
    })
}

/// メールアドレスで在籍中の従業員を検索
///
/// # Returns
/// * `Ok(Some(Employee))` - 見つかった
/// * `Ok(None)` - 未登録または退職済み
/// * `Err(AuditError)` - 検索失敗
pub async fn find_active_by_email(pool: &SqlitePool, email: &str) -> AuditResult<Option<Employee>> {
    let row = sqlx::query_as::<_, EmployeeRow>(
        "SELECT id, name, email, isactive, created_at FROM employees
         WHERE email = ? COLLATE NOCASE AND isactive = 1",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await
    .map_err(db_error("Failed to find employee"))?;

    row.map(EmployeeRow::into_employee).transpose()
}

/// 従業員を無効化（退職扱い）
pub async fn deactivate(pool: &SqlitePool, id: i64) -> AuditResult<()> {
    sqlx::query("UPDATE employees SET isactive = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(db_error("Failed to deactivate employee"))?;
    Ok(())
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: i64,
    name: String,
    email: String,
    isactive: i64,
    created_at: String,
}

impl EmployeeRow {
    fn into_employee(self) -> AuditResult<Employee> {
        Ok(Employee {
            id: self.id,
            name: self.name,
            email: self.email,
            isactive: self.isactive != 0,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
