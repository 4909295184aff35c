//! テンプレートツリーサービス
//!
//! 作成・更新・複製・既定テンプレート投入・詳細取得を提供する。
//! 書き込みはすべて1トランザクションで行い、途中で失敗すれば何も残らない。
//!
//! 更新の流れ: 入力境界チェック → ツリー読み込み → 名前重複チェック → ツリー検証
//! → 4階層のID照合マージ → 階層順フラッシュ → コミット

/// ツリー検証
pub mod validate;

/// ID照合マージ
pub mod reconcile;

/// レスポンス型への変換
pub mod detail;

/// ノード単体のCRUD
pub mod nodes;

use crate::common::auth::Actor;
use crate::common::error::{AuditError, AuditResult};
use crate::db::{db_error, templates, tree, write_error};
use crate::types::payload::{
    AreaInput, CloneTemplateRequest, CreateTemplateRequest, UpdateTemplateRequest,
};
use crate::types::response::{TemplateDetail, TemplateSummary};
use crate::types::tree::{StampContext, Template, TemplateTree};
use detail::{template_detail, template_summary};
use reconcile::merge_template_tree;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use uuid::Uuid;
use validate::{check_field_bounds, validate_tree};

/// 既定テンプレート名
pub const DEFAULT_TEMPLATE_NAME: &str = "Default Audit Template";

/// 既定テンプレートのエリア（重みは各20）
pub const DEFAULT_AREAS: [&str; 5] = [
    "Project Execution",
    "Engineering Excellence",
    "Communication",
    "People Management",
    "Learning & Innovation",
];

const DEFAULT_AREA_WEIGHTAGE: i32 = 20;

/// 有効なテンプレートと配下の有効なノードを読み込む
///
/// # Returns
/// * `Ok(Some(TemplateTree))` - 変更記録のないツリー
/// * `Ok(None)` - 存在しないか無効化済み
pub async fn load_tree(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<Option<TemplateTree>> {
    let Some(template) = templates::find_active(&mut *conn, id).await? else {
        return Ok(None);
    };
    let nodes = tree::load_nodes(&mut *conn, tree::NodeRef::Template(id)).await?;
    Ok(Some(TemplateTree { template, nodes }))
}

/// テンプレートツリーの操作
#[derive(Clone)]
pub struct TemplateService {
    pool: SqlitePool,
}

impl TemplateService {
    /// サービスを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// データベース接続プール
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// テンプレートをツリーごと作成
    ///
    /// # Returns
    /// * `Ok(TemplateDetail)` - 作成されたツリー（合計値付き）
    /// * `Err(AuditError::Conflict)` - 有効なテンプレート名の重複
    /// * `Err(AuditError::InvalidTree)` - ツリー検証違反（何も保存されない）
    pub async fn create_template(
        &self,
        request: &CreateTemplateRequest,
        actor: &Actor,
    ) -> AuditResult<TemplateDetail> {
        let id = self
            .insert_tree(&request.name, &request.areas, actor, true)
            .await?;
        tracing::info!(template_id = %id, actor = actor.user_id, "Template created");
        self.get_template_detail(id).await
    }

    /// 既存テンプレートを元に新しいテンプレートを作成
    ///
    /// 元テンプレートは存在確認のみに使い、内容はペイロードから作る。
    pub async fn clone_template(
        &self,
        source_id: Uuid,
        request: &CloneTemplateRequest,
        actor: &Actor,
    ) -> AuditResult<TemplateDetail> {
        {
            let mut conn = self.acquire().await?;
            if templates::find_active(&mut conn, source_id).await?.is_none() {
                return Err(AuditError::not_found("Source template not found"));
            }
        }

        let id = self
            .insert_tree(&request.name, &request.areas, actor, true)
            .await?;
        tracing::info!(
            template_id = %id,
            source_id = %source_id,
            actor = actor.user_id,
            "Template cloned"
        );
        self.get_template_detail(id).await
    }

    /// テンプレートをツリーごと更新
    ///
    /// ペイロードに含まれない既存ノードは配下ごと無効化される。
    /// `version` が指定されていれば保存中のバージョンと照合する。
    pub async fn update_template(
        &self,
        id: Uuid,
        request: &UpdateTemplateRequest,
        actor: &Actor,
    ) -> AuditResult<TemplateDetail> {
        check_field_bounds(&request.name, &request.areas)?;

        let mut tx = self.begin_write(Some(&request.name)).await?;

        let mut tree = load_tree(&mut tx, id)
            .await?
            .ok_or_else(|| AuditError::not_found("Template not found"))?;

        if let Some(expected) = request.version {
            if expected != tree.template.version {
                return Err(AuditError::Conflict(format!(
                    "Template '{}' was modified concurrently (expected version {}, found {})",
                    tree.template.name, expected, tree.template.version
                )));
            }
        }

        let name = request.name.trim();
        if name != tree.template.name {
            templates::ensure_name_available(&mut tx, name, Some(id)).await?;
        }
        validate_tree(&request.areas)?;

        let ctx = StampContext::now(Some(actor.user_id));
        tree.template.name = name.to_string();
        ctx.apply(&mut tree.template.stamp);
        let report = merge_template_tree(&mut tree, &request.areas, &ctx);

        let version = templates::update_versioned(&mut tx, &tree.template).await?;
        tree::flush_nodes(&mut tx, &tree.nodes).await?;
        Self::commit_write(tx, Some(&request.name)).await?;

        tracing::info!(
            template_id = %id,
            version,
            created = report.created,
            updated = report.updated,
            retired = report.retired,
            actor = actor.user_id,
            "Template updated"
        );
        self.get_template_detail(id).await
    }

    /// 既定テンプレートを投入（冪等）
    ///
    /// 同名の有効なテンプレートがあればそれを返す。
    /// 新規作成時はエリアのみを持つため、ツリー検証は行わない。
    pub async fn seed_default_template(&self, actor: &Actor) -> AuditResult<TemplateDetail> {
        {
            let mut conn = self.acquire().await?;
            if let Some(existing) =
                templates::find_active_by_name(&mut conn, DEFAULT_TEMPLATE_NAME).await?
            {
                tracing::debug!(template_id = %existing.id, "Default template already exists");
                return self.get_template_detail(existing.id).await;
            }
        }

        let areas: Vec<AreaInput> = DEFAULT_AREAS
            .iter()
            .map(|name| AreaInput {
                id: None,
                name: name.to_string(),
                weightage: DEFAULT_AREA_WEIGHTAGE,
                scopes: Vec::new(),
            })
            .collect();

        match self
            .insert_tree(DEFAULT_TEMPLATE_NAME, &areas, actor, false)
            .await
        {
            Ok(id) => {
                tracing::info!(template_id = %id, "Default template seeded");
                self.get_template_detail(id).await
            }
            // 並行した投入が先にコミットした（まだコミット前なら409のまま返す）
            Err(AuditError::Conflict(message)) => {
                let existing = {
                    let mut conn = self.acquire().await?;
                    templates::find_active_by_name(&mut conn, DEFAULT_TEMPLATE_NAME).await?
                };
                match existing {
                    Some(existing) => self.get_template_detail(existing.id).await,
                    None => Err(AuditError::Conflict(message)),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// テンプレート詳細（有効なノードのみ、合計値付き）
    pub async fn get_template_detail(&self, id: Uuid) -> AuditResult<TemplateDetail> {
        let mut conn = self.acquire().await?;
        let tree = load_tree(&mut conn, id)
            .await?
            .ok_or_else(|| AuditError::not_found("Template not found"))?;
        Ok(template_detail(&tree))
    }

    /// テンプレート一覧（新しい順）
    pub async fn list_templates(&self, include_inactive: bool) -> AuditResult<Vec<TemplateSummary>> {
        let mut conn = self.acquire().await?;
        let list = templates::list(&mut conn, include_inactive).await?;
        let areas = templates::list_active_areas(&mut conn, include_inactive).await?;
        Ok(list
            .iter()
            .map(|template| template_summary(template, &areas))
            .collect())
    }

    /// テンプレートを配下ごと無効化
    pub async fn delete_template(&self, id: Uuid, actor: &Actor) -> AuditResult<()> {
        let mut tx = self.begin_write(None).await?;

        let mut tree = load_tree(&mut tx, id)
            .await?
            .ok_or_else(|| AuditError::not_found("Template not found"))?;

        let ctx = StampContext::now(Some(actor.user_id));
        tree.retire(&ctx);
        templates::update_versioned(&mut tx, &tree.template).await?;
        let written = tree::flush_nodes(&mut tx, &tree.nodes).await?;
        Self::commit_write(tx, Some(&tree.template.name)).await?;

        tracing::info!(
            template_id = %id,
            nodes = written,
            actor = actor.user_id,
            "Template deleted"
        );
        Ok(())
    }

    async fn acquire(&self) -> AuditResult<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))
    }

    /// 書き込みトランザクションを開始（開始時点で書き込みロックを取得する）
    ///
    /// 読み込みから書き込みまでの間に他の書き込みが割り込まないよう `BEGIN IMMEDIATE` を使う。
    /// ロック待ちがタイムアウトした場合は409を返す。
    async fn begin_write(&self, name: Option<&str>) -> AuditResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(write_error("Failed to begin transaction", name))
    }

    async fn commit_write(tx: Transaction<'static, Sqlite>, name: Option<&str>) -> AuditResult<()> {
        tx.commit()
            .await
            .map_err(write_error("Failed to commit transaction", name))
    }

    /// 新しいテンプレートとツリーを1トランザクションで挿入
    async fn insert_tree(
        &self,
        name: &str,
        areas: &[AreaInput],
        actor: &Actor,
        validate: bool,
    ) -> AuditResult<Uuid> {
        check_field_bounds(name, areas)?;

        let mut tx = self.begin_write(Some(name)).await?;

        templates::ensure_name_available(&mut tx, name, None).await?;
        if validate {
            validate_tree(areas)?;
        }

        let ctx = StampContext::now(Some(actor.user_id));
        let template = Template {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            isactive: true,
            version: 1,
            stamp: ctx.fresh(),
        };
        templates::insert(&mut tx, &template).await?;

        let mut tree = TemplateTree::new(template);
        let report = merge_template_tree(&mut tree, areas, &ctx);
        tree::flush_nodes(&mut tx, &tree.nodes).await?;
        Self::commit_write(tx, Some(name)).await?;

        tracing::debug!(
            template_id = %tree.template.id,
            created = report.created,
            "Template tree inserted"
        );
        Ok(tree.template.id)
    }
}
