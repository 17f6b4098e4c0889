pub mod command;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
