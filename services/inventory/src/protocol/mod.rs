//! 交接单
//!
//! 将会话日志按物料名称分组、分页，附签字栏，输出纯文本。

mod handover;

pub use handover::{HandoverProtocol, ProtocolGroup};
