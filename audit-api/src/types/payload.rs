//! リクエストペイロード型
//!
//! ツリー入力の各ノードは既存ノードを指す `id` を任意で持つ。
//! `id` が無い、または永続化済みの兄弟に一致しないノードは新規作成として扱われる。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_true() -> bool {
    true
}

/// エリア入力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaInput {
    /// 既存エリアID
    #[serde(default)]
    pub id: Option<Uuid>,
    /// エリア名
    pub name: String,
    /// 重み（1-100）
    pub weightage: i32,
    /// スコープ
    #[serde(default)]
    pub scopes: Vec<ScopeInput>,
}

/// スコープ入力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeInput {
    /// 既存スコープID
    #[serde(default)]
    pub id: Option<Uuid>,
    /// スコープ名
    pub name: String,
    /// 設問
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

/// 設問入力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInput {
    /// 既存設問ID
    #[serde(default)]
    pub id: Option<Uuid>,
    /// 設問文
    pub text: String,
    /// 配点（0-100）
    pub percentage: i32,
    /// 回答必須か（省略時true）
    #[serde(default = "default_true")]
    pub is_mandatory: bool,
    /// 選択肢
    #[serde(default)]
    pub options: Vec<OptionInput>,
}

/// 選択肢入力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionInput {
    /// 既存選択肢ID
    #[serde(default)]
    pub id: Option<Uuid>,
    /// ラベル
    pub label: String,
    /// 点数（0-5）
    pub value: i32,
}

/// テンプレート作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    /// テンプレート名
    pub name: String,
    /// エリアツリー
    #[serde(default)]
    pub areas: Vec<AreaInput>,
}

/// テンプレート更新リクエスト
///
/// `areas` はツリー全体を表し、含まれない既存ノードは無効化される。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTemplateRequest {
    /// テンプレート名
    pub name: String,
    /// エリアツリー
    #[serde(default)]
    pub areas: Vec<AreaInput>,
    /// 読み込み時のバージョン（指定時のみ競合検出）
    #[serde(default)]
    pub version: Option<i64>,
}

/// テンプレート複製リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneTemplateRequest {
    /// 新しいテンプレート名
    pub name: String,
    /// エリアツリー
    #[serde(default)]
    pub areas: Vec<AreaInput>,
}

/// テンプレート一覧のクエリ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTemplatesQuery {
    /// 無効化済みテンプレートも含めるか
    #[serde(default)]
    pub include_inactive: bool,
}

/// エリア作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAreaRequest {
    /// エリア名
    pub name: String,
    /// 重み
    pub weightage: i32,
}

/// エリア更新リクエスト
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAreaRequest {
    /// エリア名
    #[serde(default)]
    pub name: Option<String>,
    /// 重み
    #[serde(default)]
    pub weightage: Option<i32>,
}

/// スコープ作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScopeRequest {
    /// スコープ名
    pub name: String,
}

/// スコープ更新リクエスト
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScopeRequest {
    /// スコープ名
    #[serde(default)]
    pub name: Option<String>,
}

/// 設問作成リクエスト（選択肢を同時に作成可能）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestionRequest {
    /// 設問文
    pub text: String,
    /// 配点
    pub percentage: i32,
    /// 回答必須か
    #[serde(default = "default_true")]
    pub is_mandatory: bool,
    /// 選択肢
    #[serde(default)]
    pub options: Vec<CreateOptionRequest>,
}

/// 設問更新リクエスト
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateQuestionRequest {
    /// 設問文
    #[serde(default)]
    pub text: Option<String>,
    /// 配点
    #[serde(default)]
    pub percentage: Option<i32>,
    /// 回答必須か
    #[serde(default)]
    pub is_mandatory: Option<bool>,
}

/// 選択肢作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOptionRequest {
    /// ラベル
    pub label: String,
    /// 点数
    pub value: i32,
}

/// 選択肢更新リクエスト
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOptionRequest {
    /// ラベル
    #[serde(default)]
    pub label: Option<String>,
    /// 点数
    #[serde(default)]
    pub value: Option<i32>,
}
