//! テンプレート行のCRUD
//!
//! 書き込みはすべて呼び出し側のトランザクション内（`&mut SqliteConnection`）で行う。

use super::{
    concurrent_write, db_error, format_timestamp, is_lock_contention, parse_stamp, parse_uuid,
};
use crate::common::error::{AuditError, AuditResult};
use crate::types::tree::{Area, Template};
use sqlx::SqliteConnection;
use uuid::Uuid;

const TEMPLATE_COLUMNS: &str =
    "id, name, isactive, version, created_by, created_at, updated_by, updated_at";

fn name_conflict(name: &str) -> AuditError {
    AuditError::Conflict(format!("Template with name '{}' already exists", name))
}

fn map_write_error<'a>(
    name: &'a str,
    context: &'static str,
) -> impl Fn(sqlx::Error) -> AuditError + 'a {
    move |e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            name_conflict(name)
        } else if is_lock_contention(&e) {
            concurrent_write(Some(name))
        } else {
            AuditError::Database(format!("{}: {}", context, e))
        }
    }
}

/// テンプレートを作成
///
/// # Arguments
/// * `conn` - トランザクション内の接続
/// * `template` - 作成するテンプレート
///
/// # Returns
/// * `Ok(())` - 作成成功
/// * `Err(AuditError::Conflict)` - 有効なテンプレート名の重複
pub async fn insert(conn: &mut SqliteConnection, template: &Template) -> AuditResult<()> {
    sqlx::query(
        "INSERT INTO audit_templates (id, name, isactive, version, created_by, created_at, updated_by, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(template.id.to_string())
    .bind(&template.name)
    .bind(template.isactive as i64)
    .bind(template.version)
    .bind(template.stamp.created_by)
    .bind(format_timestamp(template.stamp.created_at))
    .bind(template.stamp.updated_by)
    .bind(format_timestamp(template.stamp.updated_at))
    .execute(&mut *conn)
    .await
    .map_err(map_write_error(&template.name, "Failed to create template"))?;
    Ok(())
}

/// バージョンを照合してテンプレートを更新し、バージョンを1つ進める
///
/// # Arguments
/// * `conn` - トランザクション内の接続
/// * `template` - 更新後の内容（`version` は読み込み時の値）
///
/// # Returns
/// * `Ok(i64)` - 更新後のバージョン
/// * `Err(AuditError::Conflict)` - 名前の重複、または読み込み後に他の更新がコミットされた
pub async fn update_versioned(conn: &mut SqliteConnection, template: &Template) -> AuditResult<i64> {
    let result = sqlx::query(
        "UPDATE audit_templates
         SET name = ?, isactive = ?, version = version + 1, updated_by = ?, updated_at = ?
         WHERE id = ? AND version = ?",
    )
    .bind(&template.name)
    .bind(template.isactive as i64)
    .bind(template.stamp.updated_by)
    .bind(format_timestamp(template.stamp.updated_at))
    .bind(template.id.to_string())
    .bind(template.version)
    .execute(&mut *conn)
    .await
    .map_err(map_write_error(&template.name, "Failed to update template"))?;

    if result.rows_affected() == 0 {
        return Err(AuditError::Conflict(format!(
            "Template '{}' was modified concurrently",
            template.name
        )));
    }
    Ok(template.version + 1)
}

/// 配下ノードの単体変更を記録するため、所有テンプレートのバージョンを進める
pub async fn bump_version(
    conn: &mut SqliteConnection,
    id: Uuid,
    updated_by: Option<i64>,
    updated_at: chrono::DateTime<chrono::Utc>,
) -> AuditResult<()> {
    sqlx::query(
        "UPDATE audit_templates SET version = version + 1, updated_by = ?, updated_at = ? WHERE id = ?",
    )
    .bind(updated_by)
    .bind(format_timestamp(updated_at))
    .bind(id.to_string())
    .execute(&mut *conn)
    .await
    .map_err(db_error("Failed to bump template version"))?;
    Ok(())
}

/// 有効なテンプレートをIDで取得
pub async fn find_active(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<Option<Template>> {
    let sql = format!(
        "SELECT {} FROM audit_templates WHERE id = ? AND isactive = 1",
        TEMPLATE_COLUMNS
    );
    let row = sqlx::query_as::<_, TemplateRow>(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("Failed to find template"))?;

    row.map(TemplateRow::into_template).transpose()
}

/// 有効なテンプレートを名前で検索（前後空白・大文字小文字を無視）
///
/// 比較は有効なテンプレート名の一意インデックスと同じ `lower(trim(name))` で行う。
///
/// # Returns
/// * `Ok(Some(Template))` - 同名の有効なテンプレート
/// * `Ok(None)` - 該当なし
pub async fn find_active_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> AuditResult<Option<Template>> {
    let sql = format!(
        "SELECT {} FROM audit_templates WHERE isactive = 1 AND lower(trim(name)) = lower(trim(?))",
        TEMPLATE_COLUMNS
    );
    let row = sqlx::query_as::<_, TemplateRow>(&sql)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("Failed to find template by name"))?;

    row.map(TemplateRow::into_template).transpose()
}

/// 名前が他の有効なテンプレートと衝突しないことを確認
///
/// # Arguments
/// * `except` - 比較から除外するテンプレート（更新対象自身）
pub async fn ensure_name_available(
    conn: &mut SqliteConnection,
    name: &str,
    except: Option<Uuid>,
) -> AuditResult<()> {
    match find_active_by_name(conn, name).await? {
        Some(existing) if Some(existing.id) != except => Err(name_conflict(name.trim())),
        _ => Ok(()),
    }
}

/// テンプレート一覧（作成日時の新しい順）
pub async fn list(conn: &mut SqliteConnection, include_inactive: bool) -> AuditResult<Vec<Template>> {
    let filter = if include_inactive {
        ""
    } else {
        "WHERE isactive = 1"
    };
    let sql = format!(
        "SELECT {} FROM audit_templates {} ORDER BY created_at DESC, rowid DESC",
        TEMPLATE_COLUMNS, filter
    );
    let rows = sqlx::query_as::<_, TemplateRow>(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to list templates"))?;

    rows.into_iter().map(TemplateRow::into_template).collect()
}

/// 一覧表示用に、`list` と同じ条件で選ばれるテンプレートの有効なエリアを作成順で取得
pub async fn list_active_areas(
    conn: &mut SqliteConnection,
    include_inactive: bool,
) -> AuditResult<Vec<Area>> {
    let filter = if include_inactive {
        ""
    } else {
        "AND t.isactive = 1"
    };
    let sql = format!(
        "SELECT {} FROM audit_areas a
         JOIN audit_templates t ON t.id = a.template_id
         WHERE a.isactive = 1 {}
         ORDER BY a.created_at, a.rowid",
        super::tree::AREA_COLUMNS,
        filter
    );
    let rows = sqlx::query_as::<_, super::tree::AreaRow>(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to list areas"))?;

    rows.into_iter().map(super::tree::AreaRow::into_area).collect()
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: String,
    name: String,
    isactive: i64,
    version: i64,
    created_by: Option<i64>,
    created_at: String,
    updated_by: Option<i64>,
    updated_at: String,
}

impl TemplateRow {
    fn into_template(self) -> AuditResult<Template> {
        Ok(Template {
            id: parse_uuid(&self.id)?,
            name: self.name,
            isactive: self.isactive != 0,
            version: self.version,
            stamp: parse_stamp(
                self.created_by,
                &self.created_at,
                self.updated_by,
                &self.updated_at,
            )?,
        })
    }
}
