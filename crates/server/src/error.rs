use thiserror::Error;

use crate::config::ConfigError;
use crate::services::IdentifierError;

/// 统一的应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 消息队列错误
    #[error("Broker error: {0}")]
    Broker(#[from] broker::BrokerError),

    /// Feed 抓取或解析错误
    #[error("Feed error: {0}")]
    Feed(#[from] feed::FeedError),

    /// JSON 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 无法为条目生成唯一标识
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 便捷类型别名
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// 创建内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}
