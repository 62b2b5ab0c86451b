//! lager-bootstrap - 统一启动骨架
//!
//! 配置加载、日志初始化、基础设施创建与优雅退出

mod infrastructure;
mod retry;
mod runtime;
mod shutdown;
mod starter;

pub use infrastructure::*;
pub use retry::*;
pub use runtime::*;
pub use shutdown::*;
pub use starter::*;
