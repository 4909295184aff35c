//! 型定義

/// テンプレートツリーのノードとアリーナ
pub mod tree;

/// リクエストペイロード
pub mod payload;

/// レスポンス
pub mod response;
