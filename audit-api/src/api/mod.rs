//! REST APIハンドラー
//!
//! `/` と `/health` 以外はすべて操作者認証を必要とする。

/// エラーレスポンス
pub mod error;

/// テンプレート（ツリー全体）
pub mod templates;

/// エリア・スコープ
pub mod areas;

/// 設問・選択肢
pub mod questions;

/// ウェルカム・ヘルスチェック・現在の操作者
pub mod system;

use crate::auth::middleware::actor_auth_middleware;
use crate::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// `/api/v1` 配下のルート
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route("/templates/default", post(templates::seed_default_template))
        .route(
            "/templates/{id}",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/{id}/clone", post(templates::clone_template))
        .route(
            "/templates/{id}/areas",
            get(areas::list_areas).post(areas::create_area),
        )
        .route(
            "/areas/{id}",
            get(areas::get_area)
                .put(areas::update_area)
                .delete(areas::delete_area),
        )
        .route(
            "/areas/{id}/scopes",
            get(areas::list_scopes).post(areas::create_scope),
        )
        .route(
            "/scopes/{id}",
            put(areas::update_scope).delete(areas::delete_scope),
        )
        .route("/scopes/{id}/recalculate", get(areas::recalculate_scope))
        .route(
            "/scopes/{id}/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/questions/{id}",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route(
            "/questions/{id}/options",
            get(questions::list_options).post(questions::create_option),
        )
        .route(
            "/options/{id}",
            put(questions::update_option).delete(questions::delete_option),
        )
}

/// アプリケーション全体のルーターを構築
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/api/v1", api_v1_routes())
        .route("/current", get(system::current_actor))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            actor_auth_middleware,
        ));

    Router::new()
        .route("/", get(system::welcome))
        .route("/health", get(system::health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
