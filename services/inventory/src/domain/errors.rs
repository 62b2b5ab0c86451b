//! 领域错误
//!
//! 面向操作员的提示性错误，均可重试，不会中断扫码流程

use thiserror::Error;

use crate::domain::value_objects::SerialNumberError;

/// 扫码错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("no material found for code '{0}'")]
    NotFound(String),

    #[error("{label} (SN {serial}) is already in stock")]
    AlreadyInStock { label: String, serial: String },

    #[error("{label} (SN {serial}) is not in stock, held by {holder}")]
    NotInStock {
        label: String,
        serial: String,
        holder: String,
    },
}

impl ScanError {
    /// metrics 标签
    pub fn outcome(&self) -> &'static str {
        match self {
            ScanError::NotFound(_) => "not_found",
            ScanError::AlreadyInStock { .. } => "already_in_stock",
            ScanError::NotInStock { .. } => "not_in_stock",
        }
    }
}

/// 撤销错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    #[error("no material found for code '{0}'")]
    NotFound(String),

    #[error("material {0} has no history to undo")]
    NoHistory(String),

    #[error("the last action on material {0} cannot be undone")]
    NotUndoable(String),
}

impl UndoError {
    pub fn outcome(&self) -> &'static str {
        match self {
            UndoError::NotFound(_) => "not_found",
            UndoError::NoHistory(_) => "no_history",
            UndoError::NotUndoable(_) => "not_undoable",
        }
    }
}

/// 物料维护错误（新增、编辑、删除、位置修正）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterialError {
    #[error("no material found for '{0}'")]
    NotFound(String),

    #[error("serial number {0} is already assigned")]
    DuplicateSerial(String),

    #[error("invalid material: {0}")]
    Validation(String),
}

impl From<SerialNumberError> for MaterialError {
    fn from(err: SerialNumberError) -> Self {
        MaterialError::Validation(err.to_string())
    }
}
