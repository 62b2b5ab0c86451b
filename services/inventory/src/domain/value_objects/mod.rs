//! 值对象模块

mod ids;
mod serial_number;

pub use ids::*;
pub use serial_number::*;
