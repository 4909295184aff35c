//! レスポンス型
//!
//! 合計値（`total_weightage` / `total_percentage`）は保存せず、
//! 有効な子ノードから読み出し時に計算する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 選択肢
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionResponse {
    /// 選択肢ID
    pub id: Uuid,
    /// 所属設問ID
    pub question_id: Uuid,
    /// ラベル
    pub label: String,
    /// 点数
    pub value: i32,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

/// 設問（選択肢付き）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetail {
    /// 設問ID
    pub id: Uuid,
    /// 所属スコープID
    pub scope_id: Uuid,
    /// 設問文
    pub text: String,
    /// 配点
    pub percentage: i32,
    /// 回答必須か
    pub is_mandatory: bool,
    /// 選択肢
    pub options: Vec<OptionResponse>,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

/// スコープ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeResponse {
    /// スコープID
    pub id: Uuid,
    /// 所属エリアID
    pub area_id: Uuid,
    /// スコープ名
    pub name: String,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

/// スコープ（設問付き）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeDetail {
    /// スコープID
    pub id: Uuid,
    /// 所属エリアID
    pub area_id: Uuid,
    /// スコープ名
    pub name: String,
    /// 設問
    pub questions: Vec<QuestionDetail>,
    /// 有効な設問の配点合計
    pub total_percentage: i32,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

/// エリア
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaResponse {
    /// エリアID
    pub id: Uuid,
    /// 所属テンプレートID
    pub template_id: Uuid,
    /// エリア名
    pub name: String,
    /// 重み
    pub weightage: i32,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

/// エリア（スコープ付き）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDetail {
    /// エリアID
    pub id: Uuid,
    /// 所属テンプレートID
    pub template_id: Uuid,
    /// エリア名
    pub name: String,
    /// 重み
    pub weightage: i32,
    /// スコープ
    pub scopes: Vec<ScopeDetail>,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

/// テンプレート一覧の1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    /// テンプレートID
    pub id: Uuid,
    /// テンプレート名
    pub name: String,
    /// 有効フラグ
    pub isactive: bool,
    /// バージョン
    pub version: i64,
    /// 有効なエリア
    pub areas: Vec<AreaResponse>,
    /// 有効なエリアの重み合計
    pub total_weightage: i32,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

/// テンプレート詳細（ツリー全体）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDetail {
    /// テンプレートID
    pub id: Uuid,
    /// テンプレート名
    pub name: String,
    /// 有効フラグ
    pub isactive: bool,
    /// バージョン
    pub version: i64,
    /// エリア
    pub areas: Vec<AreaDetail>,
    /// 有効なエリアの重み合計
    pub total_weightage: i32,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}
