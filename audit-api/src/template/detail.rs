//! アリーナからレスポンス型への変換
//!
//! 有効なノードのみを作成順で出力し、合計値はその場で計算する。

use crate::types::response::{
    AreaDetail, AreaResponse, OptionResponse, QuestionDetail, ScopeDetail, ScopeResponse,
    TemplateDetail, TemplateSummary,
};
use crate::types::tree::{Area, Question, QuestionOption, Scope, Template, TemplateTree, TreeNodes};

/// 選択肢
pub fn option_response(option: &QuestionOption) -> OptionResponse {
    OptionResponse {
        id: option.id,
        question_id: option.question_id,
        label: option.label.clone(),
        value: option.value,
        created_at: option.stamp.created_at,
        updated_at: option.stamp.updated_at,
    }
}

/// 設問と有効な選択肢
pub fn question_detail(nodes: &TreeNodes, question: &Question) -> QuestionDetail {
    QuestionDetail {
        id: question.id,
        scope_id: question.scope_id,
        text: question.text.clone(),
        percentage: question.percentage,
        is_mandatory: question.is_mandatory,
        options: nodes
            .options
            .children(question.id)
            .map(option_response)
            .collect(),
        created_at: question.stamp.created_at,
        updated_at: question.stamp.updated_at,
    }
}

/// スコープ
pub fn scope_response(scope: &Scope) -> ScopeResponse {
    ScopeResponse {
        id: scope.id,
        area_id: scope.area_id,
        name: scope.name.clone(),
        created_at: scope.stamp.created_at,
        updated_at: scope.stamp.updated_at,
    }
}

/// スコープと有効な設問（配点合計付き）
pub fn scope_detail(nodes: &TreeNodes, scope: &Scope) -> ScopeDetail {
    let questions: Vec<QuestionDetail> = nodes
        .questions
        .children(scope.id)
        .map(|question| question_detail(nodes, question))
        .collect();
    let total_percentage = questions.iter().map(|q| q.percentage).sum();

    ScopeDetail {
        id: scope.id,
        area_id: scope.area_id,
        name: scope.name.clone(),
        questions,
        total_percentage,
        created_at: scope.stamp.created_at,
        updated_at: scope.stamp.updated_at,
    }
}

/// エリア
pub fn area_response(area: &Area) -> AreaResponse {
    AreaResponse {
        id: area.id,
        template_id: area.template_id,
        name: area.name.clone(),
        weightage: area.weightage,
        created_at: area.stamp.created_at,
        updated_at: area.stamp.updated_at,
    }
}

/// エリアと有効なスコープ
pub fn area_detail(nodes: &TreeNodes, area: &Area) -> AreaDetail {
    AreaDetail {
        id: area.id,
        template_id: area.template_id,
        name: area.name.clone(),
        weightage: area.weightage,
        scopes: nodes
            .scopes
            .children(area.id)
            .map(|scope| scope_detail(nodes, scope))
            .collect(),
        created_at: area.stamp.created_at,
        updated_at: area.stamp.updated_at,
    }
}

/// テンプレート詳細（重み合計付き）
pub fn template_detail(tree: &TemplateTree) -> TemplateDetail {
    let template = &tree.template;
    let areas: Vec<AreaDetail> = tree
        .nodes
        .areas
        .children(template.id)
        .map(|area| area_detail(&tree.nodes, area))
        .collect();
    let total_weightage = areas.iter().map(|a| a.weightage).sum();

    TemplateDetail {
        id: template.id,
        name: template.name.clone(),
        isactive: template.isactive,
        version: template.version,
        areas,
        total_weightage,
        created_at: template.stamp.created_at,
        updated_at: template.stamp.updated_at,
    }
}

/// テンプレート一覧の1件
///
/// `areas` には有効なエリアのみを渡す。
pub fn template_summary(template: &Template, areas: &[Area]) -> TemplateSummary {
    let areas: Vec<AreaResponse> = areas
        .iter()
        .filter(|area| area.isactive && area.template_id == template.id)
        .map(area_response)
        .collect();
    let total_weightage = areas.iter().map(|a| a.weightage).sum();

    TemplateSummary {
        id: template.id,
        name: template.name.clone(),
        isactive: template.isactive,
        version: template.version,
        areas,
        total_weightage,
        created_at: template.stamp.created_at,
        updated_at: template.stamp.updated_at,
    }
}
