//! 物料维护命令

use crate::domain::entities::MaterialChanges;
use crate::domain::errors::MaterialError;
use crate::domain::value_objects::SerialNumber;

/// 新增物料命令
#[derive(Debug, Clone, Default)]
pub struct AddMaterialCommand {
    pub serial_number: Option<String>,
    pub label: String,
    pub note: Option<String>,
}

impl AddMaterialCommand {
    pub fn new(serial_number: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            serial_number: Some(serial_number.into()),
            label: label.into(),
            note: None,
        }
    }

    pub fn validate(&self) -> Result<Option<SerialNumber>, MaterialError> {
        if self.label.trim().is_empty() {
            return Err(MaterialError::Validation("label must not be blank".into()));
        }
        Ok(SerialNumber::parse_optional(self.serial_number.as_deref())?)
    }
}

/// 编辑物料命令
///
/// `code` 为完整序列号，其余字段 `None` 表示不修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditMaterialCommand {
    pub code: String,
    pub label: Option<String>,
    pub serial_number: Option<String>,
    pub note: Option<String>,
    pub position: Option<String>,
    pub in_stock: Option<bool>,
}

impl EditMaterialCommand {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn into_changes(self) -> Result<MaterialChanges, MaterialError> {
        let serial_number = match self.serial_number {
            Some(serial) => Some(SerialNumber::new(serial)?),
            None => None,
        };
        Ok(MaterialChanges {
            label: self.label,
            serial_number,
            note: self.note,
            position: self.position,
            in_stock: self.in_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_requires_label() {
        let cmd = AddMaterialCommand::new("A1", "  ");
        assert!(matches!(cmd.validate(), Err(MaterialError::Validation(_))));
    }

    #[test]
    fn test_add_blank_serial_means_none() {
        let cmd = AddMaterialCommand {
            serial_number: Some(" ".into()),
            label: "Ladder".into(),
            note: None,
        };
        assert_eq!(cmd.validate().unwrap(), None);
    }

    #[test]
    fn test_edit_rejects_blank_serial() {
        let cmd = EditMaterialCommand {
            serial_number: Some("".into()),
            ..EditMaterialCommand::new("A1")
        };
        assert!(matches!(cmd.into_changes(), Err(MaterialError::Validation(_))));
    }
}
