//! 连接监控服务模块
//!
//! 把管理器返回的类型化结果转换为对外的状态文本。

use std::sync::Arc;

use async_trait::async_trait;
use common::errors::AppError;
use common::models::connection::ConnectionConfig;

use crate::manager::ConnectionManager;

/// 状态文本，失败时附带结构化错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub failure: Option<AppError>,
}

impl StatusMessage {
    fn ok(text: String) -> Self {
        Self { text, failure: None }
    }

    fn failed(text: String, err: AppError) -> Self {
        Self {
            text,
            failure: Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// 连接监控服务 Trait
#[async_trait]
pub trait MonitorServiceTrait: Send + Sync {
    /// 启动连接
    async fn start(&self, config: ConnectionConfig) -> StatusMessage;

    /// 停止连接
    async fn stop(&self, name: &str) -> StatusMessage;

    /// 列出所有连接配置
    async fn list(&self) -> Vec<ConnectionConfig>;

    /// 更新连接配置
    async fn update(&self, config: ConnectionConfig) -> ConnectionConfig;

    /// 临时测试连接
    async fn test(&self, config: ConnectionConfig) -> StatusMessage;

    /// 最近一次测试结果
    async fn last_result(&self, name: &str) -> StatusMessage;
}

/// 连接监控服务
pub struct MonitorService {
    manager: Arc<ConnectionManager>,
}

impl MonitorService {
    /// 创建新的监控服务实例
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl MonitorServiceTrait for MonitorService {
    async fn start(&self, config: ConnectionConfig) -> StatusMessage {
        let name = config.name.clone();
        match self.manager.start(config).await {
            Ok(initial) => StatusMessage::ok(format!(
                "Connection started successfully: {}\nInitial test result: {}",
                name, initial
            )),
            Err(err) => {
                tracing::error!(name = %name, error = %err, "启动连接失败");
                StatusMessage::failed(format!("Failed to start connection: {}", err), err)
            }
        }
    }

    async fn stop(&self, name: &str) -> StatusMessage {
        match self.manager.stop(name).await {
            Ok(()) => StatusMessage::ok(format!("Connection stopped successfully: {}", name)),
            Err(err @ AppError::NotFound(_)) => StatusMessage::failed(err.to_string(), err),
            Err(err) => {
                tracing::error!(name, error = %err, "停止连接失败");
                StatusMessage::failed(format!("Failed to stop connection: {}", err), err)
            }
        }
    }

    async fn list(&self) -> Vec<ConnectionConfig> {
        self.manager.list().await
    }

    async fn update(&self, config: ConnectionConfig) -> ConnectionConfig {
        self.manager.update(config).await
    }

    async fn test(&self, config: ConnectionConfig) -> StatusMessage {
        let outcome = self.manager.test(&config).await;
        let text = outcome.to_string();
        match outcome.error() {
            None => StatusMessage::ok(text),
            Some(err) => StatusMessage::failed(text, err.clone()),
        }
    }

    async fn last_result(&self, name: &str) -> StatusMessage {
        match self.manager.last_result(name).await {
            Some(result) => StatusMessage::ok(result.to_string()),
            None => StatusMessage::failed(
                format!("No test results available for {}", name),
                AppError::NotFound(name.to_string()),
            ),
        }
    }
}
