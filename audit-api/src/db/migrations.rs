//! データベース初期化とマイグレーション実行

use crate::common::error::{AuditError, AuditResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// 書き込みロックの待ち時間（超えると409として返す）
pub const WRITE_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLiteデータベース接続プールを作成してマイグレーションを実行
///
/// ファイルDBの場合は親ディレクトリとファイルを必要に応じて作成する。
/// 読み込みが書き込みトランザクションを待たないようWALモードで開く。
///
/// # Arguments
/// * `database_url` - データベースURL（例: "sqlite:data/audit.db"）
///
/// # Returns
/// * `Ok(SqlitePool)` - 初期化済みデータベースプール
/// * `Err(AuditError)` - 初期化失敗
pub async fn initialize_database(database_url: &str) -> AuditResult<SqlitePool> {
    ensure_parent_dir(database_url)?;

    let connect_options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AuditError::Database(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(WRITE_LOCK_TIMEOUT);

    let pool = SqlitePool::connect_with(connect_options)
        .await
        .map_err(|e| AuditError::Database(format!("Failed to connect to database: {}", e)))?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// マイグレーションを実行（sqlx::migrate!マクロを使用）
///
/// # Arguments
/// * `pool` - データベース接続プール
///
/// # Returns
/// * `Ok(())` - マイグレーション成功
/// * `Err(AuditError)` - マイグレーション失敗
pub async fn run_migrations(pool: &SqlitePool) -> AuditResult<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AuditError::Database(format!("Failed to run migrations: {}", e)))?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

// SQLiteファイルはディレクトリが存在しないと作成できないため、先に作成しておく
fn ensure_parent_dir(database_url: &str) -> AuditResult<()> {
    let Some(path) = database_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    // `sqlite::memory:` のような特殊指定はスキップ
    if path.starts_with(':') {
        return Ok(());
    }
    let normalized = path.trim_start_matches("//");
    let path_without_params = normalized.split('?').next().unwrap_or(normalized);
    if let Some(parent) = std::path::Path::new(path_without_params).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuditError::Database(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
