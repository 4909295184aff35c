//! テンプレートツリーの検証
//!
//! 永続化前にペイロード全体（既存ツリーとのマージ前）を検査する純粋関数群。
//! 検査順: 空ノード → エリア名 → スコープ名 → 設問文 → 選択肢ラベル → 選択肢の点数 → 配点合計。
//! 最初の違反で停止し、違反ノードを名前で特定するエラーを返す。

use crate::common::error::{AuditError, AuditResult};
use crate::types::payload::AreaInput;
use std::collections::HashSet;
use std::hash::Hash;
use std::ops::RangeInclusive;
use thiserror::Error;

/// 名前・設問文・ラベルの最大長
pub const TEXT_MAX_LEN: usize = 255;
/// エリアの重みの範囲
pub const WEIGHTAGE_RANGE: RangeInclusive<i32> = 1..=100;
/// 設問の配点の範囲
pub const PERCENTAGE_RANGE: RangeInclusive<i32> = 0..=100;
/// 選択肢の点数の範囲
pub const OPTION_VALUE_RANGE: RangeInclusive<i32> = 0..=5;
/// テンプレート内の有効な設問の配点合計
pub const REQUIRED_PERCENTAGE_TOTAL: i64 = 100;

/// ツリー構造・数値制約の違反
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeViolation {
    /// スコープを持たないエリア
    #[error("Area '{area}' must have at least one scope")]
    EmptyArea {
        /// エリア名
        area: String,
    },

    /// 設問を持たないスコープ
    #[error("Scope '{scope}' in area '{area}' must have at least one question")]
    EmptyScope {
        /// エリア名
        area: String,
        /// スコープ名
        scope: String,
    },

    /// 選択肢を持たない設問
    #[error("Question '{question}' in scope '{scope}', area '{area}' must have at least one option")]
    EmptyQuestion {
        /// エリア名
        area: String,
        /// スコープ名
        scope: String,
        /// 設問文
        question: String,
    },

    /// テンプレート内でエリア名が重複
    #[error("Duplicate area name: '{name}'")]
    DuplicateAreaName {
        /// 重複したエリア名
        name: String,
    },

    /// エリア内でスコープ名が重複
    #[error("Duplicate scope name '{scope}' in area '{area}'")]
    DuplicateScopeName {
        /// エリア名
        area: String,
        /// 重複したスコープ名
        scope: String,
    },

    /// スコープ内で設問文が重複
    #[error("Duplicate question text '{question}' in scope '{scope}', area '{area}'")]
    DuplicateQuestionText {
        /// エリア名
        area: String,
        /// スコープ名
        scope: String,
        /// 重複した設問文
        question: String,
    },

    /// 設問内で選択肢ラベルが重複
    #[error("Duplicate option label '{label}' in question '{question}', scope '{scope}'")]
    DuplicateOptionLabel {
        /// スコープ名
        scope: String,
        /// 設問文
        question: String,
        /// 重複したラベル
        label: String,
    },

    /// 設問内で選択肢の点数が重複
    #[error("Duplicate option value {value} in question '{question}', scope '{scope}'")]
    DuplicateOptionValue {
        /// スコープ名
        scope: String,
        /// 設問文
        question: String,
        /// 重複した点数
        value: i32,
    },

    /// 設問の配点合計が100ではない
    #[error("Total weightage of all questions should be exactly 100%")]
    PercentageTotal {
        /// 実際の合計
        total: i64,
    },
}

/// 名前比較用のキー（前後空白を除去し小文字化）
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// 既存の兄弟ノード名に候補が含まれるか
pub fn collides<'a>(existing: impl IntoIterator<Item = &'a str>, candidate: &str) -> bool {
    let key = normalize_key(candidate);
    existing.into_iter().any(|name| normalize_key(name) == key)
}

fn first_duplicate<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Option<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items.into_iter().find(|item| !seen.insert(key(item)))
}

/// すべての検証を順に実行
pub fn validate_tree(areas: &[AreaInput]) -> Result<(), TreeViolation> {
    validate_non_empty(areas)?;
    validate_unique_area_names(areas)?;
    validate_unique_scope_names(areas)?;
    validate_unique_question_texts(areas)?;
    validate_unique_option_labels(areas)?;
    validate_unique_option_values(areas)?;
    validate_percentage_total(areas)
}

/// エリア・スコープ・設問がそれぞれ1つ以上の子を持つこと
pub fn validate_non_empty(areas: &[AreaInput]) -> Result<(), TreeViolation> {
    for area in areas {
        if area.scopes.is_empty() {
            return Err(TreeViolation::EmptyArea {
                area: area.name.clone(),
            });
        }
        for scope in &area.scopes {
            if scope.questions.is_empty() {
                return Err(TreeViolation::EmptyScope {
                    area: area.name.clone(),
                    scope: scope.name.clone(),
                });
            }
            for question in &scope.questions {
                if question.options.is_empty() {
                    return Err(TreeViolation::EmptyQuestion {
                        area: area.name.clone(),
                        scope: scope.name.clone(),
                        question: question.text.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// テンプレート内のエリア名が一意であること
pub fn validate_unique_area_names(areas: &[AreaInput]) -> Result<(), TreeViolation> {
    match first_duplicate(areas, |area| normalize_key(&area.name)) {
        Some(area) => Err(TreeViolation::DuplicateAreaName {
            name: area.name.trim().to_string(),
        }),
        None => Ok(()),
    }
}

/// エリア内のスコープ名が一意であること
pub fn validate_unique_scope_names(areas: &[AreaInput]) -> Result<(), TreeViolation> {
    for area in areas {
        if let Some(scope) = first_duplicate(&area.scopes, |scope| normalize_key(&scope.name)) {
            return Err(TreeViolation::DuplicateScopeName {
                area: area.name.clone(),
                scope: scope.name.trim().to_string(),
            });
        }
    }
    Ok(())
}

/// スコープ内の設問文が一意であること
pub fn validate_unique_question_texts(areas: &[AreaInput]) -> Result<(), TreeViolation> {
    for area in areas {
        for scope in &area.scopes {
            if let Some(question) = first_duplicate(&scope.questions, |q| normalize_key(&q.text)) {
                return Err(TreeViolation::DuplicateQuestionText {
                    area: area.name.clone(),
                    scope: scope.name.clone(),
                    question: question.text.trim().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// 設問内の選択肢ラベルが一意であること
pub fn validate_unique_option_labels(areas: &[AreaInput]) -> Result<(), TreeViolation> {
    for scope in areas.iter().flat_map(|area| &area.scopes) {
        for question in &scope.questions {
            if let Some(option) = first_duplicate(&question.options, |o| normalize_key(&o.label)) {
                return Err(TreeViolation::DuplicateOptionLabel {
                    scope: scope.name.clone(),
                    question: question.text.clone(),
                    label: option.label.trim().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// 設問内の選択肢の点数が一意であること
pub fn validate_unique_option_values(areas: &[AreaInput]) -> Result<(), TreeViolation> {
    for scope in areas.iter().flat_map(|area| &area.scopes) {
        for question in &scope.questions {
            if let Some(option) = first_duplicate(&question.options, |o| o.value) {
                return Err(TreeViolation::DuplicateOptionValue {
                    scope: scope.name.clone(),
                    question: question.text.clone(),
                    value: option.value,
                });
            }
        }
    }
    Ok(())
}

/// テンプレート全体の設問配点合計がちょうど100であること
///
/// 設問を持たないスコープは0として扱う（空スコープは別の検証で検出される）。
pub fn validate_percentage_total(areas: &[AreaInput]) -> Result<(), TreeViolation> {
    let total: i64 = areas
        .iter()
        .flat_map(|area| &area.scopes)
        .flat_map(|scope| &scope.questions)
        .map(|question| i64::from(question.percentage))
        .sum();

    if total == REQUIRED_PERCENTAGE_TOTAL {
        Ok(())
    } else {
        Err(TreeViolation::PercentageTotal { total })
    }
}

/// 名前・設問文・ラベルの長さ検査（前後空白除去後に1-255文字）
pub fn check_text(field: &str, value: &str) -> AuditResult<()> {
    let len = value.trim().chars().count();
    if len == 0 || len > TEXT_MAX_LEN {
        return Err(AuditError::invalid(format!(
            "{} must be between 1 and {} characters",
            field, TEXT_MAX_LEN
        )));
    }
    Ok(())
}

/// 整数フィールドの範囲検査
pub fn check_range(field: &str, value: i32, range: &RangeInclusive<i32>) -> AuditResult<()> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(AuditError::invalid(format!(
        "{} must be between {} and {}, got {}",
        field,
        range.start(),
        range.end(),
        value
    )))
}

/// ペイロード全体の入力境界チェック
///
/// ツリー検証より前に実行し、範囲外の値を422として拒否する。
pub fn check_field_bounds(template_name: &str, areas: &[AreaInput]) -> AuditResult<()> {
    check_text("Template name", template_name)?;
    for area in areas {
        check_text("Area name", &area.name)?;
        check_range(
            &format!("Weightage of area '{}'", area.name),
            area.weightage,
            &WEIGHTAGE_RANGE,
        )?;
        for scope in &area.scopes {
            check_text("Scope name", &scope.name)?;
            for question in &scope.questions {
                check_text("Question text", &question.text)?;
                check_range(
                    &format!("Percentage of question '{}'", question.text),
                    question.percentage,
                    &PERCENTAGE_RANGE,
                )?;
                for option in &question.options {
                    check_text("Option label", &option.label)?;
                    check_range(
                        &format!("Value of option '{}'", option.label),
                        option.value,
                        &OPTION_VALUE_RANGE,
                    )?;
                }
            }
        }
    }
    Ok(())
}
