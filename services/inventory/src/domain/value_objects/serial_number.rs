//! 序列号值对象

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 序列号最大长度
const MAX_LENGTH: usize = 64;

/// 序列号错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerialNumberError {
    #[error("serial number must not be blank")]
    Empty,
    #[error("serial number must not exceed {MAX_LENGTH} characters")]
    TooLong,
    #[error("serial number contains a control character")]
    ControlCharacter,
}

/// 序列号值对象
///
/// 扫码枪读出的自然键。业务规则:
/// - 去除首尾空白后不能为空
/// - 最大长度 64 字符
/// - 不允许控制字符（扫码枪的回车等）
///
/// 大小写保持原样，扫码查找按原样精确/前缀匹配。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerialNumber(String);

impl SerialNumber {
    pub fn new(serial: impl Into<String>) -> Result<Self, SerialNumberError> {
        let serial = serial.into();
        let serial = serial.trim();

        if serial.is_empty() {
            return Err(SerialNumberError::Empty);
        }
        if serial.chars().count() > MAX_LENGTH {
            return Err(SerialNumberError::TooLong);
        }
        if serial.chars().any(char::is_control) {
            return Err(SerialNumberError::ControlCharacter);
        }

        Ok(Self(serial.to_string()))
    }

    /// 可选序列号：空白视为未设置
    pub fn parse_optional(serial: Option<&str>) -> Result<Option<Self>, SerialNumberError> {
        match serial.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Self::new(s).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SerialNumber {
    type Error = SerialNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SerialNumber {
    type Error = SerialNumberError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SerialNumber> for String {
    fn from(serial: SerialNumber) -> Self {
        serial.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_is_trimmed() {
        let serial = SerialNumber::new("  AB-123\n").unwrap();
        assert_eq!(serial.as_str(), "AB-123");
    }

    #[test]
    fn test_case_is_preserved() {
        let serial = SerialNumber::new("ab-123").unwrap();
        assert_eq!(serial.as_str(), "ab-123");
    }

    #[test]
    fn test_blank_serial_rejected() {
        assert_eq!(SerialNumber::new("   "), Err(SerialNumberError::Empty));
    }

    #[test]
    fn test_too_long_serial_rejected() {
        assert_eq!(SerialNumber::new("9".repeat(65)), Err(SerialNumberError::TooLong));
    }

    #[test]
    fn test_control_character_rejected() {
        assert_eq!(
            SerialNumber::new("AB\u{7}12"),
            Err(SerialNumberError::ControlCharacter)
        );
    }

    #[test]
    fn test_parse_optional_treats_blank_as_none() {
        assert_eq!(SerialNumber::parse_optional(Some("  ")), Ok(None));
        assert_eq!(SerialNumber::parse_optional(None), Ok(None));
        assert_eq!(
            SerialNumber::parse_optional(Some("X1")).unwrap().unwrap().as_str(),
            "X1"
        );
    }
}
