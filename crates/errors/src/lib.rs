//! lager-errors - 统一错误处理
//!
//! 基础设施层（仓储、配置、启动）共用的错误类型

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    /// 是否为瞬时错误（可重试）
    ///
    /// 数据库忙、网络抖动等错误重试后可能成功；校验、冲突类错误重试无意义。
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(msg) | Self::ExternalService(msg) => {
                let msg = msg.to_lowercase();
                TRANSIENT_PATTERNS.iter().any(|p| msg.contains(p))
            }
            _ => false,
        }
    }

    /// 错误类别短名（用于日志与 metrics 标签）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
            Self::Database(_) => "database",
            Self::ExternalService(_) => "external_service",
        }
    }
}

/// 瞬时错误特征
const TRANSIENT_PATTERNS: &[&str] = &[
    "database is locked",
    "busy",
    "timed out",
    "timeout",
    "connection refused",
    "connection reset",
    "temporarily unavailable",
    "503",
    "429",
];

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = AppError::not_found("material 42");
        assert_eq!(err.to_string(), "Not found: material 42");
    }

    #[test]
    fn test_transient_detection() {
        assert!(AppError::database("database is locked").is_transient());
        assert!(AppError::external_service("HTTP 503 Service Unavailable").is_transient());
        assert!(!AppError::database("UNIQUE constraint failed").is_transient());
        assert!(!AppError::validation("timeout").is_transient());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(AppError::conflict("x").kind(), "conflict");
        assert_eq!(AppError::internal("x").kind(), "internal");
    }
}
