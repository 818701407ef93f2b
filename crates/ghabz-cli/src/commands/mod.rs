//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod crop;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use ghabz_core::GhabzConfig;

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ghabz")
        .join("config.json")
}

/// Load the configuration from `--config`, else the user file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<GhabzConfig> {
    if let Some(path) = config_path {
        debug!("Loading configuration from {}", path);
        return Ok(GhabzConfig::from_file(Path::new(path))?);
    }

    let user_path = default_config_path();
    if user_path.exists() {
        debug!("Loading configuration from {}", user_path.display());
        return Ok(GhabzConfig::from_file(&user_path)?);
    }

    Ok(GhabzConfig::default())
}
