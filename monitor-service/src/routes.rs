//! 路由模块

use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers;
use crate::state::AppState;

/// 创建连接监控路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/connections",
            get(handlers::list_connections).patch(handlers::update_connection),
        )
        .route("/api/connections/start", post(handlers::start_connection))
        .route("/api/connections/test", post(handlers::test_connection))
        .route("/api/connections/{name}/stop", post(handlers::stop_connection))
        .route("/api/connections/{name}/results", get(handlers::last_result))
        .route("/api/health", get(handlers::health_check))
}
