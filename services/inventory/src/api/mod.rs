//! 输入驱动

mod console;

pub use console::{Console, ConsoleCommand, ParseError, Reply};
