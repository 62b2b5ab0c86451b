//! 物料实体

use serde::{Deserialize, Serialize};

use crate::domain::entities::{LastAction, LogEntry};
use crate::domain::enums::ActionKind;
use crate::domain::errors::{MaterialError, UndoError};
use crate::domain::value_objects::{MaterialId, SerialNumber};

/// 在库物料的位置
pub const STOCK_POSITION: &str = "Lager";

/// 未设置操作人时使用的名称
pub const SYSTEM_ACTOR: &str = "System";

/// 物料
///
/// 一件可扫码的实物（工具、设备）。状态约束:
/// - `in_stock = true` 时 `position` 为 "Lager" 或空
/// - `in_stock = false` 时 `position` 为持有人
///
/// `event_log` 只追加，删除物料时整体移除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    /// 物料 ID
    id: MaterialId,
    /// 序列号（扫码键）
    serial_number: Option<SerialNumber>,
    /// 名称（Bezeichnung）
    label: String,
    /// 是否在库
    in_stock: bool,
    /// 备注
    note: Option<String>,
    /// 位置或持有人
    position: Option<String>,
    /// 事件日志
    event_log: Vec<LogEntry>,
    /// 最近一次动作，撤销依据
    last_action: Option<LastAction>,
}

/// 手工编辑的字段变更
///
/// `None` 表示不修改该字段。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialChanges {
    pub label: Option<String>,
    pub serial_number: Option<SerialNumber>,
    /// 空白字符串表示清除备注
    pub note: Option<String>,
    pub position: Option<String>,
    pub in_stock: Option<bool>,
}

impl Material {
    /// 创建新物料，初始在库
    pub fn new(label: impl Into<String>, serial_number: Option<SerialNumber>) -> Self {
        Self {
            id: MaterialId::new(),
            serial_number,
            label: label.into(),
            in_stock: true,
            note: None,
            position: Some(STOCK_POSITION.to_string()),
            event_log: Vec::new(),
            last_action: None,
        }
    }

    /// 从各部分构建物料（用于从数据库加载）
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: MaterialId,
        serial_number: Option<SerialNumber>,
        label: String,
        in_stock: bool,
        note: Option<String>,
        position: Option<String>,
        event_log: Vec<LogEntry>,
        last_action: Option<LastAction>,
    ) -> Self {
        Self {
            id,
            serial_number,
            label,
            in_stock,
            note,
            position,
            event_log,
            last_action,
        }
    }

    // ========== Getters ==========

    pub fn id(&self) -> &MaterialId {
        &self.id
    }

    pub fn serial_number(&self) -> Option<&SerialNumber> {
        self.serial_number.as_ref()
    }

    /// 序列号文本，未设置时为空串
    pub fn serial_str(&self) -> &str {
        self.serial_number.as_ref().map(SerialNumber::as_str).unwrap_or("")
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn in_stock(&self) -> bool {
        self.in_stock
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn position(&self) -> Option<&str> {
        self.position.as_deref()
    }

    /// 当前持有人（仅出库状态）
    pub fn holder(&self) -> Option<&str> {
        if self.in_stock {
            None
        } else {
            self.position.as_deref()
        }
    }

    pub fn event_log(&self) -> &[LogEntry] {
        &self.event_log
    }

    pub fn last_action(&self) -> Option<&LastAction> {
        self.last_action.as_ref()
    }

    // ========== Builder ==========

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// 设为出库状态（用于导入和测试数据）
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.in_stock = false;
        self.position = Some(holder.into());
        self
    }

    // ========== 状态迁移 ==========

    /// 入库
    pub fn check_in(&mut self, actor: &str) {
        let previous_holder = self.position.take();
        self.in_stock = true;
        self.position = Some(STOCK_POSITION.to_string());
        self.event_log.push(LogEntry::new(
            actor,
            format!("received via scan from {actor}"),
        ));
        self.last_action =
            Some(LastAction::new(ActionKind::CheckIn, actor).with_previous_holder(previous_holder));
    }

    /// 出库给 `actor`
    pub fn check_out(&mut self, actor: &str) {
        self.in_stock = false;
        self.position = Some(actor.to_string());
        self.event_log
            .push(LogEntry::new(actor, format!("issued via scan to {actor}")));
        self.last_action = Some(LastAction::new(ActionKind::CheckOut, actor));
    }

    /// 撤销最近一次扫码迁移，返回被撤销的动作类型
    ///
    /// 只看 `last_action`，单级撤销。入库前没有记录持有人时不可撤销，
    /// 出库状态必须有持有人。
    pub fn undo(&mut self, actor: &str) -> Result<ActionKind, UndoError> {
        if self.event_log.is_empty() {
            return Err(UndoError::NoHistory(self.display_key()));
        }

        let last = match &self.last_action {
            Some(last) if last.kind.is_undoable() => last.clone(),
            _ => return Err(UndoError::NotUndoable(self.display_key())),
        };

        let description = match last.kind {
            ActionKind::CheckOut => {
                self.in_stock = true;
                self.position = Some(STOCK_POSITION.to_string());
                "check-out undone – returned to stock".to_string()
            }
            _ => {
                let Some(holder) = last.previous_holder.filter(|h| !h.trim().is_empty()) else {
                    return Err(UndoError::NotUndoable(self.display_key()));
                };
                let description = format!("check-in undone – returned to {holder}");
                self.in_stock = false;
                self.position = Some(holder);
                description
            }
        };

        self.event_log.push(LogEntry::new(actor, description));
        self.last_action = Some(LastAction::new(ActionKind::Undo, actor));
        Ok(last.kind)
    }

    /// 直接修正位置，不写日志、不改在库状态
    pub fn set_position(&mut self, position: Option<String>) {
        self.position = position.filter(|p| !p.trim().is_empty());
    }

    /// 手工编辑，返回实际变更的字段名
    ///
    /// 有变更时追加一条 "edited: ..." 日志，并使下一次撤销不可用。
    pub fn apply_changes(
        &mut self,
        changes: MaterialChanges,
        actor: &str,
    ) -> Result<Vec<&'static str>, MaterialError> {
        let label = match changes.label {
            Some(label) if label.trim().is_empty() => {
                return Err(MaterialError::Validation("label must not be blank".into()));
            }
            other => other.map(|l| l.trim().to_string()),
        };
        let position = changes
            .position
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        let holder = match changes.in_stock {
            Some(false) => Some(
                position
                    .clone()
                    .or_else(|| self.holder().map(str::to_string))
                    .ok_or_else(|| {
                        MaterialError::Validation("a checked-out material needs a holder".into())
                    })?,
            ),
            _ => None,
        };

        let mut changed = Vec::new();

        if let Some(label) = label
            && label != self.label
        {
            self.label = label;
            changed.push("label");
        }

        if let Some(serial) = changes.serial_number
            && self.serial_number.as_ref() != Some(&serial)
        {
            self.serial_number = Some(serial);
            changed.push("serial");
        }

        if let Some(note) = changes.note {
            let note = Some(note.trim().to_string()).filter(|n| !n.is_empty());
            if note != self.note {
                self.note = note;
                changed.push("note");
            }
        }

        match (changes.in_stock, holder) {
            (Some(true), _) => {
                if !self.in_stock || self.position.as_deref() != Some(STOCK_POSITION) {
                    changed.push("in_stock");
                }
                self.in_stock = true;
                self.position = Some(STOCK_POSITION.to_string());
            }
            (Some(false), Some(holder)) => {
                if self.in_stock {
                    changed.push("in_stock");
                }
                if self.position.as_deref() != Some(holder.as_str()) {
                    changed.push("position");
                }
                self.in_stock = false;
                self.position = Some(holder);
            }
            _ => {
                if let Some(position) = position
                    && self.position.as_deref() != Some(position.as_str())
                {
                    self.position = Some(position);
                    changed.push("position");
                }
            }
        }

        if !changed.is_empty() {
            self.event_log
                .push(LogEntry::new(actor, format!("edited: {}", changed.join(", "))));
            self.last_action = Some(LastAction::new(ActionKind::Edit, actor));
        }

        Ok(changed)
    }

    /// 提示信息中使用的标识：优先序列号，否则名称
    fn display_key(&self) -> String {
        match &self.serial_number {
            Some(serial) => serial.to_string(),
            None => self.label.clone(),
        }
    }
}
