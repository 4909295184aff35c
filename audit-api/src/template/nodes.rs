//! エリア・スコープ・設問・選択肢の単体操作
//!
//! ツリー全体のマージとは別に、1ノードずつ追加・変更・削除する。
//! 兄弟間の重複はツリー検証と同じ文言で拒否するが、空ノードや配点合計の検査は行わない
//! （テンプレートを少しずつ組み立てる途中の状態を許すため）。
//! いずれの書き込みも所有テンプレートのバージョンを進める。

use super::detail::{
    area_detail, area_response, option_response, question_detail, scope_detail, scope_response,
};
use super::validate::{
    check_range, check_text, collides, TreeViolation, OPTION_VALUE_RANGE, PERCENTAGE_RANGE,
    WEIGHTAGE_RANGE,
};
use super::TemplateService;
use crate::common::auth::Actor;
use crate::common::error::{AuditError, AuditResult};
use crate::db::tree::{self as store, NodeRef};
use crate::db::{db_error, templates};
use crate::types::payload::{
    CreateAreaRequest, CreateOptionRequest, CreateQuestionRequest, CreateScopeRequest,
    UpdateAreaRequest, UpdateOptionRequest, UpdateQuestionRequest, UpdateScopeRequest,
};
use crate::types::response::{
    AreaDetail, AreaResponse, OptionResponse, QuestionDetail, ScopeDetail, ScopeResponse,
};
use crate::types::tree::{Area, Question, QuestionOption, Scope, StampContext, TreeNodes};
use sqlx::SqliteConnection;
use uuid::Uuid;

async fn area_or_404(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<Area> {
    store::find_area(conn, id)
        .await?
        .ok_or_else(|| AuditError::not_found("Area not found"))
}

async fn scope_or_404(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<Scope> {
    store::find_scope(conn, id)
        .await?
        .ok_or_else(|| AuditError::not_found("Scope not found"))
}

async fn question_or_404(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<Question> {
    store::find_question(conn, id)
        .await?
        .ok_or_else(|| AuditError::not_found("Question not found"))
}

async fn option_or_404(conn: &mut SqliteConnection, id: Uuid) -> AuditResult<QuestionOption> {
    store::find_option(conn, id)
        .await?
        .ok_or_else(|| AuditError::not_found("Option not found"))
}

/// 所有テンプレートのバージョンを進める
async fn touch_template(
    conn: &mut SqliteConnection,
    node: NodeRef,
    ctx: &StampContext,
) -> AuditResult<()> {
    let template_id = store::owning_template_id(&mut *conn, node)
        .await?
        .ok_or_else(|| AuditError::Internal(format!("Orphaned node {:?}", node)))?;
    templates::bump_version(conn, template_id, ctx.actor_id, ctx.at).await
}

/// 変更をフラッシュし、所有テンプレートのバージョンを進める
async fn persist(
    conn: &mut SqliteConnection,
    nodes: &TreeNodes,
    owner: NodeRef,
    ctx: &StampContext,
) -> AuditResult<()> {
    store::flush_nodes(&mut *conn, nodes).await?;
    touch_template(conn, owner, ctx).await
}

fn sibling_names<'a, I>(siblings: I, except: Option<Uuid>) -> Vec<&'a str>
where
    I: Iterator<Item = (Uuid, &'a str)>,
{
    siblings
        .filter(|(id, _)| Some(*id) != except)
        .map(|(_, name)| name)
        .collect()
}

fn check_unique_area(
    nodes: &TreeNodes,
    template_id: Uuid,
    name: &str,
    except: Option<Uuid>,
) -> AuditResult<()> {
    let existing = sibling_names(
        nodes
            .areas
            .children(template_id)
            .map(|a| (a.id, a.name.as_str())),
        except,
    );
    if collides(existing, name) {
        return Err(TreeViolation::DuplicateAreaName {
            name: name.trim().to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_unique_scope(
    nodes: &TreeNodes,
    area: &Area,
    name: &str,
    except: Option<Uuid>,
) -> AuditResult<()> {
    let existing = sibling_names(
        nodes
            .scopes
            .children(area.id)
            .map(|s| (s.id, s.name.as_str())),
        except,
    );
    if collides(existing, name) {
        return Err(TreeViolation::DuplicateScopeName {
            area: area.name.clone(),
            scope: name.trim().to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_unique_question(
    nodes: &TreeNodes,
    area: &Area,
    scope: &Scope,
    text: &str,
    except: Option<Uuid>,
) -> AuditResult<()> {
    let existing = sibling_names(
        nodes
            .questions
            .children(scope.id)
            .map(|q| (q.id, q.text.as_str())),
        except,
    );
    if collides(existing, text) {
        return Err(TreeViolation::DuplicateQuestionText {
            area: area.name.clone(),
            scope: scope.name.clone(),
            question: text.trim().to_string(),
        }
        .into());
    }
    Ok(())
}

/// 選択肢のラベル・点数が兄弟と重複しないことを確認
fn check_unique_option(
    siblings: &[(Uuid, String, i32)],
    scope: &Scope,
    question: &Question,
    label: &str,
    value: i32,
    except: Option<Uuid>,
) -> AuditResult<()> {
    let others: Vec<_> = siblings
        .iter()
        .filter(|(id, _, _)| Some(*id) != except)
        .collect();
    if collides(others.iter().map(|(_, l, _)| l.as_str()), label) {
        return Err(TreeViolation::DuplicateOptionLabel {
            scope: scope.name.clone(),
            question: question.text.clone(),
            label: label.trim().to_string(),
        }
        .into());
    }
    if others.iter().any(|(_, _, v)| *v == value) {
        return Err(TreeViolation::DuplicateOptionValue {
            scope: scope.name.clone(),
            question: question.text.clone(),
            value,
        }
        .into());
    }
    Ok(())
}

fn check_option_fields(label: &str, value: i32) -> AuditResult<()> {
    check_text("Option label", label)?;
    check_range(
        &format!("Value of option '{}'", label.trim()),
        value,
        &OPTION_VALUE_RANGE,
    )
}

fn option_siblings(nodes: &TreeNodes, question_id: Uuid) -> Vec<(Uuid, String, i32)> {
    nodes
        .options
        .children(question_id)
        .map(|o| (o.id, o.label.clone(), o.value))
        .collect()
}

impl TemplateService {
    async fn begin(&self) -> AuditResult<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.pool()
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))
    }

    // ---- エリア ----

    /// テンプレートの有効なエリア（配下付き）
    pub async fn list_areas(&self, template_id: Uuid) -> AuditResult<Vec<AreaDetail>> {
        let mut tx = self.begin().await?;
        if templates::find_active(&mut tx, template_id).await?.is_none() {
            return Err(AuditError::not_found("Template not found"));
        }
        let nodes = store::load_nodes(&mut tx, NodeRef::Template(template_id)).await?;
        Ok(nodes
            .areas
            .children(template_id)
            .map(|area| area_detail(&nodes, area))
            .collect())
    }

    /// エリアを追加
    pub async fn create_area(
        &self,
        template_id: Uuid,
        request: &CreateAreaRequest,
        actor: &Actor,
    ) -> AuditResult<AreaResponse> {
        check_text("Area name", &request.name)?;
        check_range("Weightage", request.weightage, &WEIGHTAGE_RANGE)?;

        let mut tx = self.begin_write(None).await?;
        if templates::find_active(&mut tx, template_id).await?.is_none() {
            return Err(AuditError::not_found("Template not found"));
        }
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Template(template_id)).await?;
        check_unique_area(&nodes, template_id, &request.name, None)?;

        let ctx = StampContext::now(Some(actor.user_id));
        let area = Area {
            id: Uuid::new_v4(),
            template_id,
            name: request.name.trim().to_string(),
            weightage: request.weightage,
            isactive: true,
            stamp: ctx.fresh(),
        };
        let response = area_response(&area);
        nodes.areas.insert_new(area);
        persist(&mut tx, &nodes, NodeRef::Template(template_id), &ctx).await?;
        Self::commit_write(tx, None).await?;

        tracing::info!(area_id = %response.id, template_id = %template_id, "Area created");
        Ok(response)
    }

    /// エリア詳細
    pub async fn get_area(&self, id: Uuid) -> AuditResult<AreaDetail> {
        let mut tx = self.begin().await?;
        let area = area_or_404(&mut tx, id).await?;
        let nodes = store::load_nodes(&mut tx, NodeRef::Area(id)).await?;
        Ok(area_detail(&nodes, &area))
    }

    /// エリアの名前・重みを変更
    pub async fn update_area(
        &self,
        id: Uuid,
        request: &UpdateAreaRequest,
        actor: &Actor,
    ) -> AuditResult<AreaResponse> {
        if let Some(name) = &request.name {
            check_text("Area name", name)?;
        }
        if let Some(weightage) = request.weightage {
            check_range("Weightage", weightage, &WEIGHTAGE_RANGE)?;
        }

        let mut tx = self.begin_write(None).await?;
        let area = area_or_404(&mut tx, id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Template(area.template_id)).await?;
        if let Some(name) = &request.name {
            check_unique_area(&nodes, area.template_id, name, Some(id))?;
        }

        let ctx = StampContext::now(Some(actor.user_id));
        let node = nodes
            .areas
            .touch(id)
            .ok_or_else(|| AuditError::not_found("Area not found"))?;
        if let Some(name) = &request.name {
            node.name = name.trim().to_string();
        }
        if let Some(weightage) = request.weightage {
            node.weightage = weightage;
        }
        ctx.apply(&mut node.stamp);
        let response = area_response(node);

        persist(&mut tx, &nodes, NodeRef::Area(id), &ctx).await?;
        Self::commit_write(tx, None).await?;
        Ok(response)
    }

    /// エリアを配下ごと無効化
    pub async fn delete_area(&self, id: Uuid, actor: &Actor) -> AuditResult<()> {
        let mut tx = self.begin_write(None).await?;
        area_or_404(&mut tx, id).await?;
        // 無効化後は解決できないため先に所有テンプレートを確定させる
        let owner = store::owning_template_id(&mut tx, NodeRef::Area(id)).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Area(id)).await?;

        let ctx = StampContext::now(Some(actor.user_id));
        nodes.retire_area(id, &ctx);
        store::flush_nodes(&mut tx, &nodes).await?;
        if let Some(template_id) = owner {
            templates::bump_version(&mut tx, template_id, ctx.actor_id, ctx.at).await?;
        }
        Self::commit_write(tx, None).await?;

        tracing::info!(area_id = %id, "Area deleted");
        Ok(())
    }

    // ---- スコープ ----

    /// エリアの有効なスコープ（設問付き）
    pub async fn list_scopes(&self, area_id: Uuid) -> AuditResult<Vec<ScopeDetail>> {
        let mut tx = self.begin().await?;
        area_or_404(&mut tx, area_id).await?;
        let nodes = store::load_nodes(&mut tx, NodeRef::Area(area_id)).await?;
        Ok(nodes
            .scopes
            .children(area_id)
            .map(|scope| scope_detail(&nodes, scope))
            .collect())
    }

    /// スコープを追加
    pub async fn create_scope(
        &self,
        area_id: Uuid,
        request: &CreateScopeRequest,
        actor: &Actor,
    ) -> AuditResult<ScopeResponse> {
        check_text("Scope name", &request.name)?;

        let mut tx = self.begin_write(None).await?;
        let area = area_or_404(&mut tx, area_id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Area(area_id)).await?;
        check_unique_scope(&nodes, &area, &request.name, None)?;

        let ctx = StampContext::now(Some(actor.user_id));
        let scope = Scope {
            id: Uuid::new_v4(),
            area_id,
            name: request.name.trim().to_string(),
            isactive: true,
            stamp: ctx.fresh(),
        };
        let response = scope_response(&scope);
        nodes.scopes.insert_new(scope);
        persist(&mut tx, &nodes, NodeRef::Area(area_id), &ctx).await?;
        Self::commit_write(tx, None).await?;

        tracing::info!(scope_id = %response.id, area_id = %area_id, "Scope created");
        Ok(response)
    }

    /// スコープ名を変更
    pub async fn update_scope(
        &self,
        id: Uuid,
        request: &UpdateScopeRequest,
        actor: &Actor,
    ) -> AuditResult<ScopeResponse> {
        if let Some(name) = &request.name {
            check_text("Scope name", name)?;
        }

        let mut tx = self.begin_write(None).await?;
        let scope = scope_or_404(&mut tx, id).await?;
        let area = area_or_404(&mut tx, scope.area_id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Area(area.id)).await?;
        if let Some(name) = &request.name {
            check_unique_scope(&nodes, &area, name, Some(id))?;
        }

        let ctx = StampContext::now(Some(actor.user_id));
        let node = nodes
            .scopes
            .touch(id)
            .ok_or_else(|| AuditError::not_found("Scope not found"))?;
        if let Some(name) = &request.name {
            node.name = name.trim().to_string();
        }
        ctx.apply(&mut node.stamp);
        let response = scope_response(node);

        persist(&mut tx, &nodes, NodeRef::Scope(id), &ctx).await?;
        Self::commit_write(tx, None).await?;
        Ok(response)
    }

    /// スコープを配下ごと無効化
    pub async fn delete_scope(&self, id: Uuid, actor: &Actor) -> AuditResult<()> {
        let mut tx = self.begin_write(None).await?;
        let scope = scope_or_404(&mut tx, id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Scope(id)).await?;

        let ctx = StampContext::now(Some(actor.user_id));
        nodes.retire_scope(id, &ctx);
        persist(&mut tx, &nodes, NodeRef::Area(scope.area_id), &ctx).await?;
        Self::commit_write(tx, None).await?;

        tracing::info!(scope_id = %id, "Scope deleted");
        Ok(())
    }

    /// 有効な設問から配点合計を計算し直したスコープ詳細
    pub async fn recalculate_scope(&self, id: Uuid) -> AuditResult<ScopeDetail> {
        let mut tx = self.begin().await?;
        let scope = scope_or_404(&mut tx, id).await?;
        let nodes = store::load_nodes(&mut tx, NodeRef::Scope(id)).await?;
        let detail = scope_detail(&nodes, &scope);
        tracing::debug!(
            scope_id = %id,
            total_percentage = detail.total_percentage,
            "Scope total recalculated"
        );
        Ok(detail)
    }

    // ---- 設問 ----

    /// スコープの有効な設問（選択肢付き）
    pub async fn list_questions(&self, scope_id: Uuid) -> AuditResult<Vec<QuestionDetail>> {
        let mut tx = self.begin().await?;
        scope_or_404(&mut tx, scope_id).await?;
        let nodes = store::load_nodes(&mut tx, NodeRef::Scope(scope_id)).await?;
        Ok(nodes
            .questions
            .children(scope_id)
            .map(|question| question_detail(&nodes, question))
            .collect())
    }

    /// 設問を追加（選択肢も同時に作成）
    pub async fn create_question(
        &self,
        scope_id: Uuid,
        request: &CreateQuestionRequest,
        actor: &Actor,
    ) -> AuditResult<QuestionDetail> {
        check_text("Question text", &request.text)?;
        check_range("Percentage", request.percentage, &PERCENTAGE_RANGE)?;
        for option in &request.options {
            check_option_fields(&option.label, option.value)?;
        }

        let mut tx = self.begin_write(None).await?;
        let scope = scope_or_404(&mut tx, scope_id).await?;
        let area = area_or_404(&mut tx, scope.area_id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Scope(scope_id)).await?;
        check_unique_question(&nodes, &area, &scope, &request.text, None)?;

        let ctx = StampContext::now(Some(actor.user_id));
        let question = Question {
            id: Uuid::new_v4(),
            scope_id,
            text: request.text.trim().to_string(),
            percentage: request.percentage,
            is_mandatory: request.is_mandatory,
            isactive: true,
            stamp: ctx.fresh(),
        };
        let question_id = question.id;

        let mut siblings = Vec::new();
        for option in &request.options {
            check_unique_option(&siblings, &scope, &question, &option.label, option.value, None)?;
            siblings.push((Uuid::new_v4(), option.label.trim().to_string(), option.value));
        }
        nodes.questions.insert_new(question);
        for (id, label, value) in siblings {
            nodes.options.insert_new(QuestionOption {
                id,
                question_id,
                label,
                value,
                isactive: true,
                stamp: ctx.fresh(),
            });
        }

        persist(&mut tx, &nodes, NodeRef::Scope(scope_id), &ctx).await?;
        Self::commit_write(tx, None).await?;

        tracing::info!(question_id = %question_id, scope_id = %scope_id, "Question created");
        let question = nodes
            .questions
            .get(question_id)
            .ok_or_else(|| AuditError::Internal("Created question missing".to_string()))?;
        Ok(question_detail(&nodes, question))
    }

    /// 設問を変更
    pub async fn update_question(
        &self,
        id: Uuid,
        request: &UpdateQuestionRequest,
        actor: &Actor,
    ) -> AuditResult<QuestionDetail> {
        if let Some(text) = &request.text {
            check_text("Question text", text)?;
        }
        if let Some(percentage) = request.percentage {
            check_range("Percentage", percentage, &PERCENTAGE_RANGE)?;
        }

        let mut tx = self.begin_write(None).await?;
        let question = question_or_404(&mut tx, id).await?;
        let scope = scope_or_404(&mut tx, question.scope_id).await?;
        let area = area_or_404(&mut tx, scope.area_id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Scope(scope.id)).await?;
        if let Some(text) = &request.text {
            check_unique_question(&nodes, &area, &scope, text, Some(id))?;
        }

        let ctx = StampContext::now(Some(actor.user_id));
        let node = nodes
            .questions
            .touch(id)
            .ok_or_else(|| AuditError::not_found("Question not found"))?;
        if let Some(text) = &request.text {
            node.text = text.trim().to_string();
        }
        if let Some(percentage) = request.percentage {
            node.percentage = percentage;
        }
        if let Some(is_mandatory) = request.is_mandatory {
            node.is_mandatory = is_mandatory;
        }
        ctx.apply(&mut node.stamp);

        persist(&mut tx, &nodes, NodeRef::Question(id), &ctx).await?;
        Self::commit_write(tx, None).await?;

        let node = nodes
            .questions
            .get(id)
            .ok_or_else(|| AuditError::not_found("Question not found"))?;
        Ok(question_detail(&nodes, node))
    }

    /// 設問を選択肢ごと無効化
    pub async fn delete_question(&self, id: Uuid, actor: &Actor) -> AuditResult<()> {
        let mut tx = self.begin_write(None).await?;
        let question = question_or_404(&mut tx, id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Question(id)).await?;

        let ctx = StampContext::now(Some(actor.user_id));
        nodes.retire_question(id, &ctx);
        persist(&mut tx, &nodes, NodeRef::Scope(question.scope_id), &ctx).await?;
        Self::commit_write(tx, None).await?;

        tracing::info!(question_id = %id, "Question deleted");
        Ok(())
    }

    // ---- 選択肢 ----

    /// 設問の有効な選択肢（点数の昇順）
    pub async fn list_options(&self, question_id: Uuid) -> AuditResult<Vec<OptionResponse>> {
        let mut tx = self.begin().await?;
        question_or_404(&mut tx, question_id).await?;
        let options = store::list_options_by_value(&mut tx, question_id).await?;
        Ok(options.iter().map(option_response).collect())
    }

    /// 選択肢を追加
    pub async fn create_option(
        &self,
        question_id: Uuid,
        request: &CreateOptionRequest,
        actor: &Actor,
    ) -> AuditResult<OptionResponse> {
        check_option_fields(&request.label, request.value)?;

        let mut tx = self.begin_write(None).await?;
        let question = question_or_404(&mut tx, question_id).await?;
        let scope = scope_or_404(&mut tx, question.scope_id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Question(question_id)).await?;
        check_unique_option(
            &option_siblings(&nodes, question_id),
            &scope,
            &question,
            &request.label,
            request.value,
            None,
        )?;

        let ctx = StampContext::now(Some(actor.user_id));
        let option = QuestionOption {
            id: Uuid::new_v4(),
            question_id,
            label: request.label.trim().to_string(),
            value: request.value,
            isactive: true,
            stamp: ctx.fresh(),
        };
        let response = option_response(&option);
        nodes.options.insert_new(option);
        persist(&mut tx, &nodes, NodeRef::Question(question_id), &ctx).await?;
        Self::commit_write(tx, None).await?;

        tracing::info!(option_id = %response.id, question_id = %question_id, "Option created");
        Ok(response)
    }

    /// 選択肢のラベル・点数を変更
    pub async fn update_option(
        &self,
        id: Uuid,
        request: &UpdateOptionRequest,
        actor: &Actor,
    ) -> AuditResult<OptionResponse> {
        let mut tx = self.begin_write(None).await?;
        let current = option_or_404(&mut tx, id).await?;
        let label = request.label.as_deref().unwrap_or(&current.label);
        let value = request.value.unwrap_or(current.value);
        check_option_fields(label, value)?;

        let question = question_or_404(&mut tx, current.question_id).await?;
        let scope = scope_or_404(&mut tx, question.scope_id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::Question(question.id)).await?;
        check_unique_option(
            &option_siblings(&nodes, question.id),
            &scope,
            &question,
            label,
            value,
            Some(id),
        )?;

        let ctx = StampContext::now(Some(actor.user_id));
        let node = nodes
            .options
            .touch(id)
            .ok_or_else(|| AuditError::not_found("Option not found"))?;
        node.label = label.trim().to_string();
        node.value = value;
        ctx.apply(&mut node.stamp);
        let response = option_response(node);

        persist(&mut tx, &nodes, NodeRef::QuestionOption(id), &ctx).await?;
        Self::commit_write(tx, None).await?;
        Ok(response)
    }

    /// 選択肢を無効化
    pub async fn delete_option(&self, id: Uuid, actor: &Actor) -> AuditResult<()> {
        let mut tx = self.begin_write(None).await?;
        let option = option_or_404(&mut tx, id).await?;
        let mut nodes = store::load_nodes(&mut tx, NodeRef::QuestionOption(id)).await?;

        let ctx = StampContext::now(Some(actor.user_id));
        nodes.retire_option(id, &ctx);
        persist(&mut tx, &nodes, NodeRef::Question(option.question_id), &ctx).await?;
        Self::commit_write(tx, None).await?;

        tracing::info!(option_id = %id, "Option deleted");
        Ok(())
    }
}
