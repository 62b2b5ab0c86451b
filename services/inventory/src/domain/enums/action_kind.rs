//! 最近一次动作类型

use serde::{Deserialize, Serialize};

/// 物料最近一次动作类型
///
/// 撤销只看这个字段，不解析日志文本。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// 扫码入库
    CheckIn,
    /// 扫码出库
    CheckOut,
    /// 手工编辑
    Edit,
    /// 撤销
    Undo,
}

impl ActionKind {
    /// 持久化编码
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CheckIn => "check_in",
            ActionKind::CheckOut => "check_out",
            ActionKind::Edit => "edit",
            ActionKind::Undo => "undo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "check_in" => Some(ActionKind::CheckIn),
            "check_out" => Some(ActionKind::CheckOut),
            "edit" => Some(ActionKind::Edit),
            "undo" => Some(ActionKind::Undo),
            _ => None,
        }
    }

    /// 是否可撤销
    pub fn is_undoable(&self) -> bool {
        matches!(self, ActionKind::CheckIn | ActionKind::CheckOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_codes_parse_back() {
        for kind in [ActionKind::CheckIn, ActionKind::CheckOut, ActionKind::Edit, ActionKind::Undo] {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActionKind::parse("issued"), None);
    }

    #[test]
    fn test_only_scans_are_undoable() {
        assert!(ActionKind::CheckIn.is_undoable());
        assert!(ActionKind::CheckOut.is_undoable());
        assert!(!ActionKind::Edit.is_undoable());
        assert!(!ActionKind::Undo.is_undoable());
    }
}
