//! ロギング初期化ユーティリティ
//!
//! 標準出力へのfmtレイヤーに加え、`AUDIT_LOG_DIR` が設定されていれば
//! 日次ローテーションのファイル出力を追加する。

use crate::config::get_env_with_fallback_or;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ファイル出力のフラッシュを保証するガード（プロセス終了まで保持）
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const LOG_FILE_PREFIX: &str = "audit-api.log";

/// ログレベルのフィルタを構築
///
/// `AUDIT_LOG_LEVEL`（旧: `LOG_LEVEL`）を `EnvFilter` の書式で解釈し、
/// 不正な値なら `info` に戻す。
pub fn build_filter() -> EnvFilter {
    let level = get_env_with_fallback_or("AUDIT_LOG_LEVEL", "LOG_LEVEL", "info");
    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// グローバルなtracingサブスクライバーを初期化
///
/// # Returns
/// * `Ok(())` - 初期化成功
/// * `Err` - 既にサブスクライバーが設定されている
pub fn init() -> anyhow::Result<()> {
    let stdout_layer = fmt::layer().with_target(true);

    let file_layer = match std::env::var("AUDIT_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir.trim(), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().with_ansi(false).with_writer(writer))
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(build_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
