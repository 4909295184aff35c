//! テンプレートツリーのノード型とアリーナ
//!
//! 親子参照は持たず、各ノードは親IDのみを保持する。
//! 子の列挙はアリーナ上で親IDを手がかりに都度行う。

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// 作成者・更新者の記録（全ノード共通）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditStamp {
    /// 作成者の従業員ID
    pub created_by: Option<i64>,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 最終更新者の従業員ID
    pub updated_by: Option<i64>,
    /// 最終更新日時
    pub updated_at: DateTime<Utc>,
}

/// 1回の書き込み操作に共通する操作者と時刻
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampContext {
    /// 操作者の従業員ID
    pub actor_id: Option<i64>,
    /// 操作時刻
    pub at: DateTime<Utc>,
}

impl StampContext {
    /// 現在時刻で操作コンテキストを作成
    pub fn now(actor_id: Option<i64>) -> Self {
        Self {
            actor_id,
            at: Utc::now(),
        }
    }

    /// 新規ノード用のスタンプ
    pub fn fresh(&self) -> AuditStamp {
        AuditStamp {
            created_by: self.actor_id,
            created_at: self.at,
            updated_by: self.actor_id,
            updated_at: self.at,
        }
    }

    /// 既存スタンプに更新者・更新時刻を記録
    pub fn apply(&self, stamp: &mut AuditStamp) {
        stamp.updated_by = self.actor_id;
        stamp.updated_at = self.at;
    }
}

/// 監査テンプレート（ツリーのルート）
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// テンプレートID
    pub id: Uuid,
    /// テンプレート名
    pub name: String,
    /// 有効フラグ
    pub isactive: bool,
    /// 楽観ロック用バージョン
    pub version: i64,
    /// 作成・更新記録
    pub stamp: AuditStamp,
}

/// 評価エリア
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    /// エリアID
    pub id: Uuid,
    /// 所属テンプレートID
    pub template_id: Uuid,
    /// エリア名
    pub name: String,
    /// 重み（1-100）
    pub weightage: i32,
    /// 有効フラグ
    pub isactive: bool,
    /// 作成・更新記録
    pub stamp: AuditStamp,
}

/// スコープ
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    /// スコープID
    pub id: Uuid,
    /// 所属エリアID
    pub area_id: Uuid,
    /// スコープ名
    pub name: String,
    /// 有効フラグ
    pub isactive: bool,
    /// 作成・更新記録
    pub stamp: AuditStamp,
}

/// 設問
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// 設問ID
    pub id: Uuid,
    /// 所属スコープID
    pub scope_id: Uuid,
    /// 設問文
    pub text: String,
    /// テンプレート全体に対する配点（0-100）
    pub percentage: i32,
    /// 回答必須か
    pub is_mandatory: bool,
    /// 有効フラグ
    pub isactive: bool,
    /// 作成・更新記録
    pub stamp: AuditStamp,
}

/// 採点選択肢
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionOption {
    /// 選択肢ID
    pub id: Uuid,
    /// 所属設問ID
    pub question_id: Uuid,
    /// 表示ラベル
    pub label: String,
    /// 点数（0-5）
    pub value: i32,
    /// 有効フラグ
    pub isactive: bool,
    /// 作成・更新記録
    pub stamp: AuditStamp,
}

/// アリーナに格納できるツリーノード
pub trait TreeNode {
    /// ノードID
    fn id(&self) -> Uuid;
    /// 親ノードID
    fn parent_id(&self) -> Uuid;
    /// 有効か
    fn is_active(&self) -> bool;
    /// 有効フラグを設定
    fn set_active(&mut self, active: bool);
    /// 作成・更新記録への可変参照
    fn stamp_mut(&mut self) -> &mut AuditStamp;
}

macro_rules! impl_tree_node {
    ($node:ty, $parent:ident) => {
        impl TreeNode for $node {
            fn id(&self) -> Uuid {
                self.id
            }
            fn parent_id(&self) -> Uuid {
                self.$parent
            }
            fn is_active(&self) -> bool {
                self.isactive
            }
            fn set_active(&mut self, active: bool) {
                self.isactive = active;
            }
            fn stamp_mut(&mut self) -> &mut AuditStamp {
                &mut self.stamp
            }
        }
    };
}

impl_tree_node!(Area, template_id);
impl_tree_node!(Scope, area_id);
impl_tree_node!(Question, scope_id);
impl_tree_node!(QuestionOption, question_id);

/// 1階層分のノードをIDで索引するアリーナ
///
/// ロード順（作成順）を保持し、変更されたノードと新規ノードを記録する。
/// 永続化層はこの記録に従って INSERT / UPDATE を発行する。
#[derive(Debug, Clone)]
pub struct Arena<N> {
    nodes: HashMap<Uuid, N>,
    order: Vec<Uuid>,
    inserted: HashSet<Uuid>,
    dirty: HashSet<Uuid>,
}

impl<N> Default for Arena<N> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            inserted: HashSet::new(),
            dirty: HashSet::new(),
        }
    }
}

impl<N: TreeNode> Arena<N> {
    /// 空のアリーナ
    pub fn new() -> Self {
        Self::default()
    }

    /// 永続化済みノードからアリーナを構築（変更記録なし）
    pub fn from_persisted(nodes: impl IntoIterator<Item = N>) -> Self {
        let mut arena = Self::new();
        for node in nodes {
            let id = node.id();
            if arena.nodes.insert(id, node).is_none() {
                arena.order.push(id);
            }
        }
        arena
    }

    /// IDでノードを取得
    pub fn get(&self, id: Uuid) -> Option<&N> {
        self.nodes.get(&id)
    }

    /// ノード数（無効化済みを含む）
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// ノードが1つもないか
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 新規ノードを追加し、INSERT対象として記録
    pub fn insert_new(&mut self, node: N) {
        let id = node.id();
        if self.nodes.insert(id, node).is_none() {
            self.order.push(id);
        }
        self.inserted.insert(id);
    }

    /// 変更用にノードを取得し、UPDATE対象として記録
    pub fn touch(&mut self, id: Uuid) -> Option<&mut N> {
        let node = self.nodes.get_mut(&id)?;
        self.dirty.insert(id);
        Some(node)
    }

    /// 作成順のノード列
    pub fn iter(&self) -> impl Iterator<Item = &N> {
        self.order.iter().filter_map(move |id| self.nodes.get(id))
    }

    /// 親に属する有効な子ノード（作成順）
    pub fn children(&self, parent_id: Uuid) -> impl Iterator<Item = &N> {
        self.iter()
            .filter(move |node| node.is_active() && node.parent_id() == parent_id)
    }

    /// 親に属する有効な子ノードのID
    pub fn active_child_ids(&self, parent_id: Uuid) -> Vec<Uuid> {
        self.children(parent_id).map(|node| node.id()).collect()
    }

    /// INSERT待ちのノード（作成順）
    pub fn pending_inserts(&self) -> impl Iterator<Item = &N> {
        self.iter()
            .filter(move |node| self.inserted.contains(&node.id()))
    }

    /// UPDATE待ちのノード（新規ノードを除く）
    pub fn pending_updates(&self) -> impl Iterator<Item = &N> {
        self.iter().filter(move |node| {
            let id = node.id();
            self.dirty.contains(&id) && !self.inserted.contains(&id)
        })
    }

    /// 変更記録を破棄（永続化完了後）
    pub fn clear_pending(&mut self) {
        self.inserted.clear();
        self.dirty.clear();
    }

    /// ノードを無効化する。既に無効なら何もしない
    ///
    /// # Returns
    /// * `true` - 無効化した
    /// * `false` - 存在しないか既に無効
    pub fn deactivate(&mut self, id: Uuid, ctx: &StampContext) -> bool {
        if !self.get(id).is_some_and(|node| node.is_active()) {
            return false;
        }
        match self.touch(id) {
            Some(node) => {
                node.set_active(false);
                ctx.apply(node.stamp_mut());
                true
            }
            None => false,
        }
    }
}

/// エリア以下4階層分のアリーナ
#[derive(Debug, Clone, Default)]
pub struct TreeNodes {
    /// エリア
    pub areas: Arena<Area>,
    /// スコープ
    pub scopes: Arena<Scope>,
    /// 設問
    pub questions: Arena<Question>,
    /// 選択肢
    pub options: Arena<QuestionOption>,
}

impl TreeNodes {
    /// エリアとその配下をすべて無効化
    pub fn retire_area(&mut self, id: Uuid, ctx: &StampContext) {
        if self.areas.deactivate(id, ctx) {
            for scope_id in self.scopes.active_child_ids(id) {
                self.retire_scope(scope_id, ctx);
            }
        }
    }

    /// スコープとその配下をすべて無効化
    pub fn retire_scope(&mut self, id: Uuid, ctx: &StampContext) {
        if self.scopes.deactivate(id, ctx) {
            for question_id in self.questions.active_child_ids(id) {
                self.retire_question(question_id, ctx);
            }
        }
    }

    /// 設問とその選択肢をすべて無効化
    pub fn retire_question(&mut self, id: Uuid, ctx: &StampContext) {
        if self.questions.deactivate(id, ctx) {
            for option_id in self.options.active_child_ids(id) {
                self.retire_option(option_id, ctx);
            }
        }
    }

    /// 選択肢を無効化
    pub fn retire_option(&mut self, id: Uuid, ctx: &StampContext) {
        self.options.deactivate(id, ctx);
    }

    /// 変更記録を破棄
    pub fn clear_pending(&mut self) {
        self.areas.clear_pending();
        self.scopes.clear_pending();
        self.questions.clear_pending();
        self.options.clear_pending();
    }
}

/// テンプレートと有効な配下ツリー
#[derive(Debug, Clone)]
pub struct TemplateTree {
    /// ルート
    pub template: Template,
    /// 配下ノード
    pub nodes: TreeNodes,
}

impl TemplateTree {
    /// 配下を持たない新規テンプレート
    pub fn new(template: Template) -> Self {
        Self {
            template,
            nodes: TreeNodes::default(),
        }
    }

    /// テンプレートと配下をすべて無効化
    pub fn retire(&mut self, ctx: &StampContext) {
        if self.template.isactive {
            self.template.isactive = false;
            ctx.apply(&mut self.template.stamp);
        }
        for area_id in self.nodes.areas.active_child_ids(self.template.id) {
            self.nodes.retire_area(area_id, ctx);
        }
    }
}
