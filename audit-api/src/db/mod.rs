//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化。
//! UUIDはTEXT、日時は固定幅のRFC3339 TEXT（辞書順 = 時刻順）で保持する。

use crate::common::error::{AuditError, AuditResult};
use crate::types::tree::AuditStamp;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// データベースマイグレーション
pub mod migrations;

/// 従業員（操作者解決）
pub mod employees;

/// テンプレート行
pub mod templates;

/// エリア以下のツリー読み込み・書き込み
pub mod tree;

/// 日時を保存用文字列に変換
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 保存済み日時文字列を解析
pub(crate) fn parse_timestamp(value: &str) -> AuditResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AuditError::Database(format!("Invalid timestamp '{}': {}", value, e)))
}

/// 保存済みUUID文字列を解析
pub(crate) fn parse_uuid(value: &str) -> AuditResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| AuditError::Database(format!("Invalid UUID '{}': {}", value, e)))
}

/// 行の監査列からスタンプを復元
pub(crate) fn parse_stamp(
    created_by: Option<i64>,
    created_at: &str,
    updated_by: Option<i64>,
    updated_at: &str,
) -> AuditResult<AuditStamp> {
    Ok(AuditStamp {
        created_by,
        created_at: parse_timestamp(created_at)?,
        updated_by,
        updated_at: parse_timestamp(updated_at)?,
    })
}

/// sqlxエラーを文脈付きのデータベースエラーに変換
pub(crate) fn db_error(context: &str) -> impl Fn(sqlx::Error) -> AuditError + '_ {
    move |e| AuditError::Database(format!("{}: {}", context, e))
}

/// SQLiteのロック競合（SQLITE_BUSY / SQLITE_LOCKED とその拡張コード）か
pub(crate) fn is_lock_contention(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| matches!(code.as_ref(), "5" | "261" | "517" | "773" | "6" | "262"))
}

/// 他の書き込みと競合したことを示すConflict
///
/// # Arguments
/// * `name` - 対象テンプレート名（ノード単体の書き込みでは不明なので `None`）
pub(crate) fn concurrent_write(name: Option<&str>) -> AuditError {
    match name {
        Some(name) => AuditError::Conflict(format!(
            "Template '{}' was modified concurrently (another write is in progress)",
            name.trim()
        )),
        None => AuditError::Conflict(
            "Template was modified concurrently (another write is in progress)".to_string(),
        ),
    }
}

/// 書き込みトランザクション用のエラー変換
///
/// ロック待ちがタイムアウトした場合は409、それ以外は文脈付きのデータベースエラーにする。
pub(crate) fn write_error<'a>(
    context: &'a str,
    name: Option<&'a str>,
) -> impl Fn(sqlx::Error) -> AuditError + 'a {
    move |e| {
        if is_lock_contention(&e) {
            tracing::warn!("{}: write lock not acquired: {}", context, e);
            concurrent_write(name)
        } else {
            AuditError::Database(format!("{}: {}", context, e))
        }
    }
}
