//! 数据库连接监控服务
//!
//! 提供外部数据库连接的生命周期管理，包括：
//! - 连接的启动、停止与配置更新
//! - 按连接配置的间隔定时健康检查，记录最近一次结果
//! - 临时诊断查询与结果格式化

pub mod checker;
pub mod driver;
pub mod executor;
pub mod handlers;
pub mod manager;
pub mod registry;
pub mod routes;
pub mod scheduler;
pub mod service;
pub mod state;

use axum::{routing::get, Json, Router};
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "连接监控服务 API",
        version = "0.1.0",
        description = "数据库连接生命周期与定时健康检查微服务"
    ),
    paths(
        handlers::start_connection,
        handlers::stop_connection,
        handlers::list_connections,
        handlers::update_connection,
        handlers::test_connection,
        handlers::last_result,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectionConfig,
        handlers::HealthResponse,
    )),
    tags(
        (name = "connections", description = "连接管理端点"),
        (name = "health", description = "健康检查端点")
    )
)]
pub struct ApiDoc;

/// 创建应用路由
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
