//! `interpose config` – show the config file location and effective settings.

use anyhow::Result;
use interpose_core::config::{self, InterposeConfig};

pub fn run_config(cfg: &InterposeConfig) -> Result<()> {
    match config::config_path() {
        Ok(path) => println!("# {}", path.display()),
        Err(e) => println!("# config path unavailable: {}", e),
    }
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
