//! 仓储实现

mod cloud;
mod converters;
mod memory;
mod migrations;
mod rows;
mod sqlite;

pub use cloud::CloudMaterialRepository;
pub use memory::InMemoryMaterialRepository;
pub use migrations::inventory_migrations;
pub use sqlite::SqliteMaterialRepository;
