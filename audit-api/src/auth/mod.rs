// 認証モジュール

/// JWT生成・検証（jsonwebtoken）
pub mod jwt;

/// トークンから操作者を解決するリゾルバー
pub mod identity;

/// 認証ミドルウェア（Bearer JWT → 操作者）
pub mod middleware;

/// 起動時の初期従業員登録
pub mod bootstrap;

pub use identity::{IdentityResolver, JwtIdentityResolver};
