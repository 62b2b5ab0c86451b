//! lager-inventory - 扫码驱动的库存状态引擎

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod protocol;
