//! CLI command handlers. Each command is in its own file.

mod config;
mod simulate;

pub use config::run_config;
pub use simulate::run_simulate;
