//! 数据库连接监控服务入口

use anyhow::Context;
use common::config::AppConfig;
use monitor_service::create_router;
use monitor_service::state::AppState;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "monitor-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置（含 .env）
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 创建应用状态，启动定时补偿任务
    let shutdown = CancellationToken::new();
    let state = AppState::new(config.clone(), shutdown.clone());
    let manager = state.manager.clone();
    let reconciler = manager.spawn_reconciler();

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_addr();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务启动失败")?;

    // 停止定时任务并关闭所有连接
    manager.shutdown().await;
    reconciler.await.context("定时补偿任务异常退出")?;
    info!(service = SERVICE_NAME, "服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "无法监听关闭信号");
        std::future::pending::<()>().await;
    }
    info!("收到关闭信号");
}
