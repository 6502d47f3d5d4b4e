//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{NarrationError, RepositoryError};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: Uuid,
    },

    /// 请求的时间段没有可用音频
    #[error("Audio unavailable: {0}")]
    AudioUnavailable(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource_type, id }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 是否为“无可用数据”类错误（播放路径应降级为 not-found 响应）
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AudioUnavailable(_))
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        Self::RepositoryError(err.to_string())
    }
}

impl From<NarrationError> for ApplicationError {
    fn from(err: NarrationError) -> Self {
        match err {
            NarrationError::ChunkNotFound { .. } => Self::AudioUnavailable(err.to_string()),
            NarrationError::InvalidTimestamp(_) => Self::ValidationError(err.to_string()),
            NarrationError::RepositoryError(msg) => Self::RepositoryError(msg),
        }
    }
}
