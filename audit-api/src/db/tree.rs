//! エリア以下のツリーの読み込みと書き込み
//!
//! 読み込みは起点ノード（テンプレート・エリア・スコープ・設問・選択肢）から下の
//! 有効なノードを階層ごとに1クエリで取得し、アリーナに格納する。
//! 祖先のいずれかが無効なノードは到達不能として読み込まない。
//!
//! 書き込みはアリーナの変更記録に従い、エリア → スコープ → 設問 → 選択肢の順に
//! 階層ごとにフラッシュする（親行が必ず子行より先に存在する）。

use super::{db_error, format_timestamp, parse_stamp, parse_uuid};
use crate::common::error::AuditResult;
use crate::types::tree::{Arena, Area, Question, QuestionOption, Scope, TreeNode, TreeNodes};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection};
use uuid::Uuid;

pub(crate) const AREA_COLUMNS: &str = "a.id, a.template_id, a.name, a.weightage, a.isactive, \
     a.created_by, a.created_at, a.updated_by, a.updated_at";
const SCOPE_COLUMNS: &str =
    "s.id, s.area_id, s.name, s.isactive, s.created_by, s.created_at, s.updated_by, s.updated_at";
const QUESTION_COLUMNS: &str = "q.id, q.scope_id, q.text, q.percentage, q.is_mandatory, \
     q.isactive, q.created_by, q.created_at, q.updated_by, q.updated_at";
const OPTION_COLUMNS: &str = "o.id, o.question_id, o.label, o.value, o.isactive, \
     o.created_by, o.created_at, o.updated_by, o.updated_at";

/// 読み込みの起点となるノード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    /// テンプレート配下すべて
    Template(Uuid),
    /// エリアとその配下
    Area(Uuid),
    /// スコープとその配下
    Scope(Uuid),
    /// 設問とその選択肢
    Question(Uuid),
    /// 選択肢のみ
    QuestionOption(Uuid),
}

impl NodeRef {
    fn id(&self) -> Uuid {
        match *self {
            Self::Template(id)
            | Self::Area(id)
            | Self::Scope(id)
            | Self::Question(id)
            | Self::QuestionOption(id) => id,
        }
    }

    fn depth(&self) -> u8 {
        match self {
            Self::Template(_) => 0,
            Self::Area(_) => 1,
            Self::Scope(_) => 2,
            Self::Question(_) => 3,
            Self::QuestionOption(_) => 4,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Template(_) => "a.template_id",
            Self::Area(_) => "a.id",
            Self::Scope(_) => "s.id",
            Self::Question(_) => "q.id",
            Self::QuestionOption(_) => "o.id",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Area,
    Scope,
    Question,
    QuestionOption,
}

impl Level {
    fn depth(self) -> u8 {
        match self {
            Self::Area => 1,
            Self::Scope => 2,
            Self::Question => 3,
            Self::QuestionOption => 4,
        }
    }

    fn alias(self) -> &'static str {
        match self {
            Self::Area => "a",
            Self::Scope => "s",
            Self::Question => "q",
            Self::QuestionOption => "o",
        }
    }

    fn columns(self) -> &'static str {
        match self {
            Self::Area => AREA_COLUMNS,
            Self::Scope => SCOPE_COLUMNS,
            Self::Question => QUESTION_COLUMNS,
            Self::QuestionOption => OPTION_COLUMNS,
        }
    }

    // 祖先エリアまで結合し、経路上のすべてが有効なノードのみを対象にする
    fn from_clause(self) -> &'static str {
        match self {
            Self::Area => "FROM audit_areas a WHERE a.isactive = 1",
            Self::Scope => {
                "FROM audit_scopes s
                 JOIN audit_areas a ON a.id = s.area_id
                 WHERE s.isactive = 1 AND a.isactive = 1"
            }
            Self::Question => {
                "FROM audit_questions q
                 JOIN audit_scopes s ON s.id = q.scope_id
                 JOIN audit_areas a ON a.id = s.area_id
                 WHERE q.isactive = 1 AND s.isactive = 1 AND a.isactive = 1"
            }
            Self::QuestionOption => {
                "FROM audit_question_options o
                 JOIN audit_questions q ON q.id = o.question_id
                 JOIN audit_scopes s ON s.id = q.scope_id
                 JOIN audit_areas a ON a.id = s.area_id
                 WHERE o.isactive = 1 AND q.isactive = 1 AND s.isactive = 1 AND a.isactive = 1"
            }
        }
    }

    fn select(self, root: &NodeRef, order_by: Option<&str>) -> String {
        let alias = self.alias();
        let order = match order_by {
            Some(order) => order.to_string(),
            None => format!("{0}.created_at, {0}.rowid", alias),
        };
        format!(
            "SELECT {} {} AND {} = ? ORDER BY {}",
            self.columns(),
            self.from_clause(),
            root.column(),
            order
        )
    }
}

async fn fetch_level<R>(
    conn: &mut SqliteConnection,
    level: Level,
    root: &NodeRef,
    order_by: Option<&str>,
) -> AuditResult<Vec<R>>
where
    R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = level.select(root, order_by);
    sqlx::query_as::<_, R>(&sql)
        .bind(root.id().to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to load template tree"))
}

/// 起点から下の有効なノードをすべて読み込む
///
/// # Arguments
/// * `conn` - 接続（トランザクション内でも可）
/// * `root` - 起点ノード
///
/// # Returns
/// * `Ok(TreeNodes)` - 起点より上の階層は空のアリーナ
pub async fn load_nodes(conn: &mut SqliteConnection, root: NodeRef) -> AuditResult<TreeNodes> {
    let mut nodes = TreeNodes::default();
    let depth = root.depth();

    if depth <= Level::Area.depth() {
        let rows: Vec<AreaRow> = fetch_level(conn, Level::Area, &root, None).await?;
        nodes.areas = Arena::from_persisted(collect(rows, AreaRow::into_area)?);
    }
    if depth <= Level::Scope.depth() {
        let rows: Vec<ScopeRow> = fetch_level(conn, Level::Scope, &root, None).await?;
        nodes.scopes = Arena::from_persisted(collect(rows, ScopeRow::into_scope)?);
    }
    if depth <= Level::Question.depth() {
        let rows: Vec<QuestionRow> = fetch_level(conn, Level::Question, &root, None).await?;
        nodes.questions = Arena::from_persisted(collect(rows, QuestionRow::into_question)?);
    }
    let rows: Vec<OptionRow> = fetch_level(conn, Level::QuestionOption, &root, None).await?;
    nodes.options = Arena::from_persisted(collect(rows, OptionRow::into_option)?);

    Ok(nodes)
}

fn collect<R, N>(rows: Vec<R>, convert: fn(R) -> AuditResult<N>) -> AuditResult<Vec<N>> {
    rows.into_iter().map(convert).collect()
}

/// 到達可能な有効エリアをIDで取得
pub async fn find_area(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<Option<Area>> {
    let rows: Vec<AreaRow> = fetch_level(conn, Level::Area, &NodeRef::Area(id), None).await?;
    rows.into_iter().next().map(AreaRow::into_area).transpose()
}

/// 到達可能な有効スコープをIDで取得
pub async fn find_scope(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<Option<Scope>> {
    let rows: Vec<ScopeRow> = fetch_level(conn, Level::Scope, &NodeRef::Scope(id), None).await?;
    rows.into_iter().next().map(ScopeRow::into_scope).transpose()
}

/// 到達可能な有効設問をIDで取得
pub async fn find_question(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<Option<Question>> {
    let rows: Vec<QuestionRow> =
        fetch_level(conn, Level::Question, &NodeRef::Question(id), None).await?;
    rows.into_iter().next().map(QuestionRow::into_question).transpose()
}

/// 到達可能な有効選択肢をIDで取得
pub async fn find_option(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> AuditResult<Option<QuestionOption>> {
    let rows: Vec<OptionRow> = fetch_level(
        conn,
        Level::QuestionOption,
        &NodeRef::QuestionOption(id),
        None,
    )
    .await?;
    rows.into_iter().next().map(OptionRow::into_option).transpose()
}

/// 設問の有効な選択肢（点数の昇順）
pub async fn list_options_by_value(
    conn: &mut SqliteConnection,
    question_id: Uuid,
) -> AuditResult<Vec<QuestionOption>> {
    let rows: Vec<OptionRow> = fetch_level(
        conn,
        Level::QuestionOption,
        &NodeRef::Question(question_id),
        Some("o.value, o.rowid"),
    )
    .await?;
    collect(rows, OptionRow::into_option)
}

/// ノードの所有テンプレートIDを取得
pub async fn owning_template_id(
    conn: &mut SqliteConnection,
    node: NodeRef,
) -> AuditResult<Option<Uuid>> {
    let level = match node {
        NodeRef::Template(id) => return Ok(Some(id)),
        NodeRef::Area(_) => Level::Area,
        NodeRef::Scope(_) => Level::Scope,
        NodeRef::Question(_) => Level::Question,
        NodeRef::QuestionOption(_) => Level::QuestionOption,
    };
    let sql = format!(
        "SELECT a.template_id {} AND {} = ?",
        level.from_clause(),
        node.column()
    );
    let template_id: Option<String> = sqlx::query_scalar(&sql)
        .bind(node.id().to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("Failed to resolve owning template"))?;

    template_id.as_deref().map(parse_uuid).transpose()
}

/// アリーナに記録された変更を書き込むノード
#[async_trait]
pub trait StoredNode: TreeNode + Send + Sync {
    /// 行を追加
    async fn insert(&self, conn: &mut SqliteConnection) -> AuditResult<()>;
    /// 可変列・有効フラグ・更新記録を書き戻す
    async fn update(&self, conn: &mut SqliteConnection) -> AuditResult<()>;
}

async fn flush_level<N: StoredNode>(
    conn: &mut SqliteConnection,
    arena: &Arena<N>,
) -> AuditResult<usize> {
    let mut written = 0;
    for node in arena.pending_inserts() {
        node.insert(&mut *conn).await?;
        written += 1;
    }
    for node in arena.pending_updates() {
        node.update(&mut *conn).await?;
        written += 1;
    }
    Ok(written)
}

/// 変更記録のあるノードを階層順に書き込む
///
/// # Returns
/// * `Ok(usize)` - 書き込んだ行数
pub async fn flush_nodes(conn: &mut SqliteConnection, nodes: &TreeNodes) -> AuditResult<usize> {
    let mut written = flush_level(conn, &nodes.areas).await?;
    written += flush_level(conn, &nodes.scopes).await?;
    written += flush_level(conn, &nodes.questions).await?;
    written += flush_level(conn, &nodes.options).await?;
    Ok(written)
}

#[async_trait]
impl StoredNode for Area {
    async fn insert(&self, conn: &mut SqliteConnection) -> AuditResult<()> {
        sqlx::query(
            "INSERT INTO audit_areas (id, template_id, name, weightage, isactive, created_by, created_at, updated_by, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(self.template_id.to_string())
        .bind(&self.name)
        .bind(self.weightage)
        .bind(self.isactive as i64)
        .bind(self.stamp.created_by)
        .bind(format_timestamp(self.stamp.created_at))
        .bind(self.stamp.updated_by)
        .bind(format_timestamp(self.stamp.updated_at))
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to insert area"))?;
        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> AuditResult<()> {
        sqlx::query(
            "UPDATE audit_areas SET name = ?, weightage = ?, isactive = ?, updated_by = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&self.name)
        .bind(self.weightage)
        .bind(self.isactive as i64)
        .bind(self.stamp.updated_by)
        .bind(format_timestamp(self.stamp.updated_at))
        .bind(self.id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to update area"))?;
        Ok(())
    }
}

#[async_trait]
impl StoredNode for Scope {
    async fn insert(&self, conn: &mut SqliteConnection) -> AuditResult<()> {
        sqlx::query(
            "INSERT INTO audit_scopes (id, area_id, name, isactive, created_by, created_at, updated_by, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(self.area_id.to_string())
        .bind(&self.name)
        .bind(self.isactive as i64)
        .bind(self.stamp.created_by)
        .bind(format_timestamp(self.stamp.created_at))
        .bind(self.stamp.updated_by)
        .bind(format_timestamp(self.stamp.updated_at))
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to insert scope"))?;
        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> AuditResult<()> {
        sqlx::query(
            "UPDATE audit_scopes SET name = ?, isactive = ?, updated_by = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&self.name)
        .bind(self.isactive as i64)
        .bind(self.stamp.updated_by)
        .bind(format_timestamp(self.stamp.updated_at))
        .bind(self.id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to update scope"))?;
        Ok(())
    }
}

#[async_trait]
impl StoredNode for Question {
    async fn insert(&self, conn: &mut SqliteConnection) -> AuditResult<()> {
        sqlx::query(
            "INSERT INTO audit_questions (id, scope_id, text, percentage, is_mandatory, isactive, created_by, created_at, updated_by, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(self.scope_id.to_string())
        .bind(&self.text)
        .bind(self.percentage)
        .bind(self.is_mandatory as i64)
        .bind(self.isactive as i64)
        .bind(self.stamp.created_by)
        .bind(format_timestamp(self.stamp.created_at))
        .bind(self.stamp.updated_by)
        .bind(format_timestamp(self.stamp.updated_at))
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to insert question"))?;
        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> AuditResult<()> {
        sqlx::query(
            "UPDATE audit_questions
             SET text = ?, percentage = ?, is_mandatory = ?, isactive = ?, updated_by = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&self.text)
        .bind(self.percentage)
        .bind(self.is_mandatory as i64)
        .bind(self.isactive as i64)
        .bind(self.stamp.updated_by)
        .bind(format_timestamp(self.stamp.updated_at))
        .bind(self.id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to update question"))?;
        Ok(())
    }
}

#[async_trait]
impl StoredNode for QuestionOption {
    async fn insert(&self, conn: &mut SqliteConnection) -> AuditResult<()> {
        sqlx::query(
            "INSERT INTO audit_question_options (id, question_id, label, value, isactive, created_by, created_at, updated_by, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(self.question_id.to_string())
        .bind(&self.label)
        .bind(self.value)
        .bind(self.isactive as i64)
        .bind(self.stamp.created_by)
        .bind(format_timestamp(self.stamp.created_at))
        .bind(self.stamp.updated_by)
        .bind(format_timestamp(self.stamp.updated_at))
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to insert option"))?;
        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> AuditResult<()> {
        sqlx::query(
            "UPDATE audit_question_options SET label = ?, value = ?, isactive = ?, updated_by = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&self.label)
        .bind(self.value)
        .bind(self.isactive as i64)
        .bind(self.stamp.updated_by)
        .bind(format_timestamp(self.stamp.updated_at))
        .bind(self.id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to update option"))?;
        Ok(())
    }
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
pub(crate) struct AreaRow {
    id: String,
    template_id: String,
    name: String,
    weightage: i32,
    isactive: i64,
    created_by: Option<i64>,
    created_at: String,
    updated_by: Option<i64>,
    updated_at: String,
}

impl AreaRow {
    pub(crate) fn into_area(self) -> AuditResult<Area> {
        Ok(Area {
            id: parse_uuid(&self.id)?,
            template_id: parse_uuid(&self.template_id)?,
            name: self.name,
            weightage: self.weightage,
            isactive: self.isactive != 0,
            stamp: parse_stamp(
                self.created_by,
                &self.created_at,
                self.updated_by,
                &self.updated_at,
            )?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScopeRow {
    id: String,
    area_id: String,
    name: String,
    isactive: i64,
    created_by: Option<i64>,
    created_at: String,
    updated_by: Option<i64>,
    updated_at: String,
}

impl ScopeRow {
    fn into_scope(self) -> AuditResult<Scope> {
        Ok(Scope {
            id: parse_uuid(&self.id)?,
            area_id: parse_uuid(&self.area_id)?,
            name: self.name,
            isactive: self.isactive != 0,
            stamp: parse_stamp(
                self.created_by,
                &self.created_at,
                self.updated_by,
                &self.updated_at,
            )?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: String,
    scope_id: String,
    text: String,
    percentage: i32,
    is_mandatory: i64,
    isactive: i64,
    created_by: Option<i64>,
    created_at: String,
    updated_by: Option<i64>,
    updated_at: String,
}

impl QuestionRow {
    fn into_question(self) -> AuditResult<Question> {
        Ok(Question {
            id: parse_uuid(&self.id)?,
            scope_id: parse_uuid(&self.scope_id)?,
            text: self.text,
            percentage: self.percentage,
            is_mandatory: self.is_mandatory != 0,
            isactive: self.isactive != 0,
            stamp: parse_stamp(
                self.created_by,
                &self.created_at,
                self.updated_by,
                &self.updated_at,
            )?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    id: String,
    question_id: String,
    label: String,
    value: i32,
    isactive: i64,
    created_by: Option<i64>,
    created_at: String,
    updated_by: Option<i64>,
    updated_at: String,
}

impl OptionRow {
    fn into_option(self) -> AuditResult<QuestionOption> {
        Ok(QuestionOption {
            id: parse_uuid(&self.id)?,
            question_id: parse_uuid(&self.question_id)?,
            label: self.label,
            value: self.value,
            isactive: self.isactive != 0,
            stamp: parse_stamp(
                self.created_by,
                &self.created_at,
                self.updated_by,
                &self.updated_at,
            )?,
        })
    }
}
