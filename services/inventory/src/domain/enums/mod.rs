//! 枚举模块

mod action_kind;
mod scan_mode;

pub use action_kind::ActionKind;
pub use scan_mode::ScanMode;
