//! 扫描模式

use lager_config::ScanModeSetting;
use serde::{Deserialize, Serialize};

/// 扫描模式
///
/// 决定一次扫码触发入库还是出库。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ScanMode {
    /// 入库（Empfang）：物料回到仓库
    #[default]
    CheckIn,
    /// 出库（Ausgabe）：物料发给指定持有人
    CheckOut,
}

impl ScanMode {
    /// 出库模式要求先设置持有人
    pub fn requires_actor(&self) -> bool {
        matches!(self, ScanMode::CheckOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::CheckIn => "check-in",
            ScanMode::CheckOut => "check-out",
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ScanModeSetting> for ScanMode {
    fn from(setting: ScanModeSetting) -> Self {
        match setting {
            ScanModeSetting::CheckIn => ScanMode::CheckIn,
            ScanModeSetting::CheckOut => ScanMode::CheckOut,
        }
    }
}
