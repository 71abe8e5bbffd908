use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for the simulated transport driven by `interpose simulate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulateConfig {
    /// How long each observer waits before deciding, in milliseconds.
    pub observer_delay_ms: u64,
    /// URL path suffixes the observer aborts (e.g. ".gif").
    pub abort_suffixes: Vec<String>,
    /// URL path suffixes the observer answers with `respond_body`.
    pub respond_suffixes: Vec<String>,
    /// Body used for synthetic responses.
    pub respond_body: String,
    /// Make every terminal host primitive fail (exercises error reporting).
    pub fail_actions: bool,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            observer_delay_ms: 1000,
            abort_suffixes: vec![".gif".to_string()],
            respond_suffixes: Vec::new(),
            respond_body: String::new(),
            fail_actions: false,
        }
    }
}

/// Global configuration loaded from `~/.config/interpose/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterposeConfig {
    /// Default tracing filter when `RUST_LOG` is unset (e.g. "info,interpose_core=debug").
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Simulated transport settings; built-in defaults if missing.
    #[serde(default)]
    pub simulate: SimulateConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("interpose")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<InterposeConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] but at an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<InterposeConfig> {
    if !path.exists() {
        let default_cfg = InterposeConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(path)
}

pub fn load_from_path(path: &Path) -> Result<InterposeConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: InterposeConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
