//! lager-adapter-sqlite - SQLite 适配器

mod connection;
mod migration;

pub use connection::*;
pub use migration::*;
