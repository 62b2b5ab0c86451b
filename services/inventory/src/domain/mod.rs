//! 领域层
//!
//! 物料实体、值对象、枚举、领域错误与仓储接口

pub mod entities;
pub mod enums;
pub mod errors;
pub mod repositories;
pub mod value_objects;

pub use entities::*;
pub use enums::*;
pub use errors::*;
pub use repositories::*;
pub use value_objects::*;
