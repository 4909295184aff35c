//! 監査管理API Server
//!
//! 監査テンプレート（エリア → スコープ → 設問 → 採点選択肢）の定義と、
//! ID照合によるツリー編集を提供する。

#![warn(missing_docs)]

/// 共通型定義（エラー・認証モデル）
pub mod common;

/// ツリーのノード型・リクエスト・レスポンス
pub mod types;

/// テンプレートツリーの検証・マージ・サービス
pub mod template;

/// データベースアクセス
pub mod db;

/// 認証（JWT・操作者解決）
pub mod auth;

/// REST APIハンドラー
pub mod api;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// ロギング初期化ユーティリティ
pub mod logging;

/// CLIインターフェース
pub mod cli;

/// axumサーバー起動・シャットダウン
pub mod server;

use auth::IdentityResolver;
use std::sync::Arc;
use template::TemplateService;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// データベース接続プール
    pub db_pool: sqlx::SqlitePool,
    /// テンプレートツリーサービス
    pub templates: TemplateService,
    /// Bearerトークンの解決
    pub identity: Arc<dyn IdentityResolver>,
    /// 認証無効化モード（開発用の操作者を注入する）
    pub auth_disabled: bool,
}

impl AppState {
    /// プールとリゾルバーから状態を組み立てる
    pub fn new(
        db_pool: sqlx::SqlitePool,
        identity: Arc<dyn IdentityResolver>,
        auth_disabled: bool,
    ) -> Self {
        Self {
            templates: TemplateService::new(db_pool.clone()),
            db_pool,
            identity,
            auth_disabled,
        }
    }
}
