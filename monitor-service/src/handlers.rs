//! Handler模块

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::AppError;
use common::models::connection::ConnectionConfig;
use common::response::ApiResponse;
use crate::service::{MonitorService, MonitorServiceTrait, StatusMessage};
use crate::state::AppState;

const SERVICE_NAME: &str = "monitor-service";

fn status_response(status: StatusMessage) -> Json<ApiResponse<String>> {
    Json(ApiResponse::outcome(
        status.text,
        status.failure.as_ref(),
        SERVICE_NAME,
    ))
}

/// 启动连接并执行首次测试
#[utoipa::path(
    post,
    path = "/api/connections/start",
    tag = "connections",
    request_body = ConnectionConfig,
    responses(
        (status = 200, description = "启动状态文本", body = ApiResponse<String>),
        (status = 400, description = "请求参数校验失败")
    )
)]
pub async fn start_connection(
    State(state): State<AppState>,
    Json(req): Json<ConnectionConfig>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    req.validate()?;
    let service = MonitorService::new(state.manager);
    Ok(status_response(service.start(req).await))
}

/// 停止连接
#[utoipa::path(
    post,
    path = "/api/connections/{name}/stop",
    tag = "connections",
    params(
        ("name" = String, Path, description = "连接名称")
    ),
    responses(
        (status = 200, description = "停止状态文本", body = ApiResponse<String>)
    )
)]
pub async fn stop_connection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ApiResponse<String>> {
    let service = MonitorService::new(state.manager);
    status_response(service.stop(&name).await)
}

/// 列出所有连接配置
#[utoipa::path(
    get,
    path = "/api/connections",
    tag = "connections",
    responses(
        (status = 200, description = "连接配置列表", body = ApiResponse<Vec<ConnectionConfig>>)
    )
)]
pub async fn list_connections(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<ConnectionConfig>>> {
    let service = MonitorService::new(state.manager);
    let data = service.list().await;
    Json(ApiResponse::ok_with_service(data, SERVICE_NAME))
}

/// 更新连接配置
#[utoipa::path(
    patch,
    path = "/api/connections",
    tag = "connections",
    request_body = ConnectionConfig,
    responses(
        (status = 200, description = "更新后的连接配置", body = ApiResponse<ConnectionConfig>),
        (status = 400, description = "请求参数校验失败")
    )
)]
pub async fn update_connection(
    State(state): State<AppState>,
    Json(req): Json<ConnectionConfig>,
) -> Result<Json<ApiResponse<ConnectionConfig>>, AppError> {
    req.validate()?;
    let service = MonitorService::new(state.manager);
    let data = service.update(req).await;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 临时测试连接（不登记）
#[utoipa::path(
    post,
    path = "/api/connections/test",
    tag = "connections",
    request_body = ConnectionConfig,
    responses(
        (status = 200, description = "测试结果文本", body = ApiResponse<String>),
        (status = 400, description = "请求参数校验失败")
    )
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Json(req): Json<ConnectionConfig>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    req.validate()?;
    let service = MonitorService::new(state.manager);
    Ok(status_response(service.test(req).await))
}

/// 获取最近一次测试结果
#[utoipa::path(
    get,
    path = "/api/connections/{name}/results",
    tag = "connections",
    params(
        ("name" = String, Path, description = "连接名称")
    ),
    responses(
        (status = 200, description = "最近一次测试结果", body = ApiResponse<String>)
    )
)]
pub async fn last_result(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ApiResponse<String>> {
    let service = MonitorService::new(state.manager);
    status_response(service.last_result(&name).await)
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        connections: state.manager.live_count().await,
        schedules: state.manager.scheduled_count().await,
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 活跃连接数
    pub connections: usize,
    /// 定时测试任务数
    pub schedules: usize,
}
