//! 实体模块

mod log_entry;
mod material;

pub use log_entry::{LastAction, LogEntry};
pub use material::{Material, MaterialChanges, STOCK_POSITION, SYSTEM_ACTOR};
