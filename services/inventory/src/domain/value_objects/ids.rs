//! 强类型 ID 定义
//!
//! ID 对领域是不透明的字符串：本地新建时为 UUIDv7 文本，
//! 外部存储（如文档库自动生成的 ID）按原样保留。

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// ID 格式错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("id must not be blank")]
    Empty,
    #[error("id must not contain '/'")]
    Slash,
}

fn validate_id(s: &str) -> Result<String, IdError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    // 文档路径的分隔符
    if s.contains('/') {
        return Err(IdError::Slash);
    }
    Ok(s.to_string())
}

/// 物料 ID
///
/// 创建时分配，之后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
#[display("{_0}")]
pub struct MaterialId(String);

impl MaterialId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MaterialId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_id(s).map(Self)
    }
}

impl TryFrom<String> for MaterialId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MaterialId> for String {
    fn from(id: MaterialId) -> Self {
        id.0
    }
}

impl Default for MaterialId {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志条目 ID
///
/// 用于持久化时的幂等追加。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
#[display("{_0}")]
pub struct LogEntryId(String);

impl LogEntryId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// 外部日志缺少 ID 时按物料和序号生成，重复加载结果一致
    pub fn derived(material: &MaterialId, seq: usize) -> Self {
        Self(format!("{}-{}", material, seq))
    }
}

impl FromStr for LogEntryId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_id(s).map(Self)
    }
}

impl TryFrom<String> for LogEntryId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LogEntryId> for String {
    fn from(id: LogEntryId) -> Self {
        id.0
    }
}

impl Default for LogEntryId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_uuid_text() {
        let id = MaterialId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_opaque_ids_are_kept_verbatim() {
        let id: MaterialId = "Xk3fQ9aZb2LmN0pR7sTu".parse().unwrap();
        assert_eq!(id.to_string(), "Xk3fQ9aZb2LmN0pR7sTu");
        assert_eq!("  ".parse::<MaterialId>(), Err(IdError::Empty));
        assert_eq!("a/b".parse::<MaterialId>(), Err(IdError::Slash));
    }

    #[test]
    fn test_derived_log_ids_are_stable() {
        let material: MaterialId = "doc1".parse().unwrap();
        assert_eq!(LogEntryId::derived(&material, 2), LogEntryId::derived(&material, 2));
        assert_eq!(LogEntryId::derived(&material, 2).to_string(), "doc1-2");
    }
}
