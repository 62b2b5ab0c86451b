//! 应用层
//!
//! 库存状态引擎及其派生结构

pub mod commands;
pub mod engine;
pub mod persistence;
pub mod serial_index;
pub mod session;

pub use commands::*;
pub use engine::{InventoryEngine, ScanOutcome};
pub use persistence::{PersistenceDispatcher, WriteOp};
pub use serial_index::SerialIndex;
pub use session::SessionLog;
