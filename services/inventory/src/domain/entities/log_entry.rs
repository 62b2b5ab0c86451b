//! 物料日志条目

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::enums::ActionKind;
use crate::domain::value_objects::LogEntryId;

/// 日志条目
///
/// 只追加，不修改。`description` 只供人阅读，业务判断使用 [`LastAction`]。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub description: String,
}

impl LogEntry {
    pub fn new(actor: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: LogEntryId::new(),
            timestamp: Utc::now(),
            actor: actor.into(),
            description: description.into(),
        }
    }
}

/// 最近一次动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastAction {
    pub kind: ActionKind,
    pub actor: String,
    /// 入库前的持有人，撤销入库时恢复
    pub previous_holder: Option<String>,
}

impl LastAction {
    pub fn new(kind: ActionKind, actor: impl Into<String>) -> Self {
        Self {
            kind,
            actor: actor.into(),
            previous_holder: None,
        }
    }

    pub fn with_previous_holder(mut self, holder: Option<String>) -> Self {
        self.previous_holder = holder;
        self
    }
}
