//! 認証関連のデータモデル

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JWTクレーム
///
/// メールアドレスは `unique_name`（ディレクトリ系IdPの慣例）か `email` のどちらかで受け取る。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject（発行元でのユーザー識別子）
    pub sub: String,
    /// ディレクトリ系IdPが付与するメールアドレス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    /// メールアドレス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// 表示名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 有効期限（UNIXタイムスタンプ）
    pub exp: usize,
    /// 発行対象（audience）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// 発行者（issuer）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// 従業員照合に使うメールアドレス
    pub fn email_address(&self) -> Option<&str> {
        self.unique_name
            .as_deref()
            .or(self.email.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// 認証済みの操作者
///
/// すべての変更操作で `created_by` / `updated_by` に記録される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// 従業員ID
    pub user_id: i64,
    /// メールアドレス
    pub email: String,
    /// 表示名
    pub display_name: String,
}

impl Actor {
    /// 認証無効化モードで注入する開発用の操作者
    pub fn development() -> Self {
        Self {
            user_id: 0,
            email: "dev@localhost".to_string(),
            display_name: "Development User".to_string(),
        }
    }
}

/// 従業員（操作者解決用の最小モデル）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// 従業員ID
    pub id: i64,
    /// 氏名
    pub name: String,
    /// メールアドレス
    pub email: String,
    /// 在籍中か
    pub isactive: bool,
    /// 登録日時
    pub created_at: DateTime<Utc>,
}

impl From<&Employee> for Actor {
    fn from(employee: &Employee) -> Self {
        Self {
            user_id: employee.id,
            email: employee.email.clone(),
            display_name: employee.name.clone(),
        }
    }
}
