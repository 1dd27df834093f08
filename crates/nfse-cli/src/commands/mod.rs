//! Subcommands.

pub mod clients;
pub mod config;
pub mod inspect;
pub mod process;

use std::path::{Path, PathBuf};

use nfse_core::NfseConfig;

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nfse")
        .join("config.json")
}

/// Load the configuration from an explicit path, the default path, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<NfseConfig> {
    if let Some(path) = config_path {
        return Ok(NfseConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        Ok(NfseConfig::from_file(&default_path)?)
    } else {
        Ok(NfseConfig::default())
    }
}
