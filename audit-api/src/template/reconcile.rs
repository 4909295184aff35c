//! ID照合によるツリーマージ
//!
//! 4階層（エリア・スコープ・設問・選択肢）に同じアルゴリズムを適用する。
//!
//! 1. ペイロードに含まれない既存ノードを配下ごと無効化する
//! 2. ペイロードをその順に処理し、既存IDに一致すれば上書き、それ以外は新規作成する
//! 3. 一致したノードは自身の有効な子を、新規ノードは空集合を次階層の既存集合として再帰する
//!
//! 照合はIDのみで行い、名前や位置は使わない。

use crate::types::payload::{AreaInput, OptionInput, QuestionInput, ScopeInput};
use crate::types::tree::{
    Arena, Area, Question, QuestionOption, Scope, StampContext, TemplateTree, TreeNode, TreeNodes,
};
use std::collections::HashSet;
use uuid::Uuid;

/// 既存ノードを指すIDを任意で持つ入力
pub trait NodeInput {
    /// 既存ノードID
    fn node_id(&self) -> Option<Uuid>;
}

impl NodeInput for AreaInput {
    fn node_id(&self) -> Option<Uuid> {
        self.id
    }
}

impl NodeInput for ScopeInput {
    fn node_id(&self) -> Option<Uuid> {
        self.id
    }
}

impl NodeInput for QuestionInput {
    fn node_id(&self) -> Option<Uuid> {
        self.id
    }
}

impl NodeInput for OptionInput {
    fn node_id(&self) -> Option<Uuid> {
        self.id
    }
}

/// マージ結果の件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// 新規作成したノード数
    pub created: usize,
    /// 上書きしたノード数
    pub updated: usize,
    /// 無効化したサブツリー数（配下は数えない）
    pub retired: usize,
}

/// 1階層分のノード操作
pub trait MergeLevel {
    /// 永続化ノード型
    type Node: TreeNode;
    /// ペイロード型
    type Input: NodeInput;

    /// ログ用の階層名
    const NAME: &'static str;

    /// この階層のアリーナ
    fn arena(nodes: &mut TreeNodes) -> &mut Arena<Self::Node>;

    /// ノードと配下を無効化
    fn retire(nodes: &mut TreeNodes, id: Uuid, ctx: &StampContext);

    /// 可変フィールドを入力で上書き
    fn apply(node: &mut Self::Node, input: &Self::Input);

    /// 入力から新規ノードを生成
    fn create(id: Uuid, parent_id: Uuid, input: &Self::Input, ctx: &StampContext) -> Self::Node;

    /// 子階層へ再帰
    fn descend(
        nodes: &mut TreeNodes,
        id: Uuid,
        matched: bool,
        input: &Self::Input,
        ctx: &StampContext,
        report: &mut MergeReport,
    );
}

/// 1つの親の下で既存の子とペイロードをマージする
///
/// # Arguments
/// * `nodes` - 作業中のツリー
/// * `parent_id` - 親ノードID
/// * `persisted` - 親の既存の有効な子ID（新規の親なら空）
/// * `payload` - この親の子として送られた入力
/// * `ctx` - 操作者と時刻
/// * `report` - 件数の集計先
pub fn reconcile<L: MergeLevel>(
    nodes: &mut TreeNodes,
    parent_id: Uuid,
    persisted: Vec<Uuid>,
    payload: &[L::Input],
    ctx: &StampContext,
    report: &mut MergeReport,
) {
    let payload_ids: HashSet<Uuid> = payload.iter().filter_map(|input| input.node_id()).collect();

    let mut unclaimed = HashSet::with_capacity(persisted.len());
    for id in persisted {
        if payload_ids.contains(&id) {
            unclaimed.insert(id);
        } else {
            L::retire(nodes, id, ctx);
            report.retired += 1;
        }
    }

    for input in payload {
        // 同じIDが2回現れた場合、2回目以降は新規扱い
        let matched = input.node_id().filter(|id| unclaimed.remove(id));
        let id = match matched {
            Some(id) => {
                if let Some(node) = L::arena(nodes).touch(id) {
                    L::apply(node, input);
                    ctx.apply(node.stamp_mut());
                }
                report.updated += 1;
                id
            }
            None => {
                if let Some(unknown) = input.node_id() {
                    tracing::debug!(
                        "{} id {} does not match an active sibling under {}, creating a new {}",
                        L::NAME,
                        unknown,
                        parent_id,
                        L::NAME
                    );
                }
                let id = Uuid::new_v4();
                let node = L::create(id, parent_id, input, ctx);
                L::arena(nodes).insert_new(node);
                report.created += 1;
                id
            }
        };
        L::descend(nodes, id, matched.is_some(), input, ctx, report);
    }
}

/// テンプレート直下のエリア群から4階層すべてをマージする
///
/// 新規テンプレート（配下が空）に対して呼べば、そのまま上から順の挿入になる。
pub fn merge_template_tree(
    tree: &mut TemplateTree,
    areas: &[AreaInput],
    ctx: &StampContext,
) -> MergeReport {
    let mut report = MergeReport::default();
    let template_id = tree.template.id;
    let persisted = tree.nodes.areas.active_child_ids(template_id);
    reconcile::<AreaLevel>(&mut tree.nodes, template_id, persisted, areas, ctx, &mut report);
    report
}

fn children_of<N: TreeNode>(arena: &Arena<N>, id: Uuid, matched: bool) -> Vec<Uuid> {
    if matched {
        arena.active_child_ids(id)
    } else {
        Vec::new()
    }
}

/// エリア階層
pub struct AreaLevel;

impl MergeLevel for AreaLevel {
    type Node = Area;
    type Input = AreaInput;
    const NAME: &'static str = "area";

    fn arena(nodes: &mut TreeNodes) -> &mut Arena<Area> {
        &mut nodes.areas
    }

    fn retire(nodes: &mut TreeNodes, id: Uuid, ctx: &StampContext) {
        nodes.retire_area(id, ctx);
    }

    fn apply(node: &mut Area, input: &AreaInput) {
        node.name = input.name.trim().to_string();
        node.weightage = input.weightage;
    }

    fn create(id: Uuid, parent_id: Uuid, input: &AreaInput, ctx: &StampContext) -> Area {
        Area {
            id,
            template_id: parent_id,
            name: input.name.trim().to_string(),
            weightage: input.weightage,
            isactive: true,
            stamp: ctx.fresh(),
        }
    }

    fn descend(
        nodes: &mut TreeNodes,
        id: Uuid,
        matched: bool,
        input: &AreaInput,
        ctx: &StampContext,
        report: &mut MergeReport,
    ) {
        let persisted = children_of(&nodes.scopes, id, matched);
        reconcile::<ScopeLevel>(nodes, id, persisted, &input.scopes, ctx, report);
    }
}

/// スコープ階層
pub struct ScopeLevel;

impl MergeLevel for ScopeLevel {
    type Node = Scope;
    type Input = ScopeInput;
    const NAME: &'static str = "scope";

    fn arena(nodes: &mut TreeNodes) -> &mut Arena<Scope> {
        &mut nodes.scopes
    }

    fn retire(nodes: &mut TreeNodes, id: Uuid, ctx: &StampContext) {
        nodes.retire_scope(id, ctx);
    }

    fn apply(node: &mut Scope, input: &ScopeInput) {
        node.name = input.name.trim().to_string();
    }

    fn create(id: Uuid, parent_id: Uuid, input: &ScopeInput, ctx: &StampContext) -> Scope {
        Scope {
            id,
            area_id: parent_id,
            name: input.name.trim().to_string(),
            isactive: true,
            stamp: ctx.fresh(),
        }
    }

    fn descend(
        nodes: &mut TreeNodes,
        id: Uuid,
        matched: bool,
        input: &ScopeInput,
        ctx: &StampContext,
        report: &mut MergeReport,
    ) {
        let persisted = children_of(&nodes.questions, id, matched);
        reconcile::<QuestionLevel>(nodes, id, persisted, &input.questions, ctx, report);
    }
}

/// 設問階層
pub struct QuestionLevel;

impl MergeLevel for QuestionLevel {
    type Node = Question;
    type Input = QuestionInput;
    const NAME: &'static str = "question";

    fn arena(nodes: &mut TreeNodes) -> &mut Arena<Question> {
        &mut nodes.questions
    }

    fn retire(nodes: &mut TreeNodes, id: Uuid, ctx: &StampContext) {
        nodes.retire_question(id, ctx);
    }

    fn apply(node: &mut Question, input: &QuestionInput) {
        node.text = input.text.trim().to_string();
        node.percentage = input.percentage;
        node.is_mandatory = input.is_mandatory;
    }

    fn create(id: Uuid, parent_id: Uuid, input: &QuestionInput, ctx: &StampContext) -> Question {
        Question {
            id,
            scope_id: parent_id,
            text: input.text.trim().to_string(),
            percentage: input.percentage,
            is_mandatory: input.is_mandatory,
            isactive: true,
            stamp: ctx.fresh(),
        }
    }

    fn descend(
        nodes: &mut TreeNodes,
        id: Uuid,
        matched: bool,
        input: &QuestionInput,
        ctx: &StampContext,
        report: &mut MergeReport,
    ) {
        let persisted = children_of(&nodes.options, id, matched);
        reconcile::<OptionLevel>(nodes, id, persisted, &input.options, ctx, report);
    }
}

/// 選択肢階層（葉）
pub struct OptionLevel;

impl MergeLevel for OptionLevel {
    type Node = QuestionOption;
    type Input = OptionInput;
    const NAME: &'static str = "option";

    fn arena(nodes: &mut TreeNodes) -> &mut Arena<QuestionOption> {
        &mut nodes.options
    }

    fn retire(nodes: &mut TreeNodes, id: Uuid, ctx: &StampContext) {
        nodes.retire_option(id, ctx);
    }

    fn apply(node: &mut QuestionOption, input: &OptionInput) {
        node.label = input.label.trim().to_string();
        node.value = input.value;
    }

    fn create(
        id: Uuid,
        parent_id: Uuid,
        input: &OptionInput,
        ctx: &StampContext,
    ) -> QuestionOption {
        QuestionOption {
            id,
            question_id: parent_id,
            label: input.label.trim().to_string(),
            value: input.value,
            isactive: true,
            stamp: ctx.fresh(),
        }
    }

    fn descend(
        _nodes: &mut TreeNodes,
        _id: Uuid,
        _matched: bool,
        _input: &OptionInput,
        _ctx: &StampContext,
        _report: &mut MergeReport,
    ) {
    }
}
