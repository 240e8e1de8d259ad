//! Settings file loading

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tabula_core::ConnectionConfig;
use tabula_services::TableManagerConfig;

use crate::logging::LoggingConfig;

/// Contents of `config.toml`; every section is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionConfig,
    pub logging: LoggingConfig,
    pub table_manager: TableManagerConfig,
}

impl Settings {
    /// Load from an explicit path, or from the default location if a file
    /// exists there.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match settings_file() {
            Ok(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        Self::parse(&text).with_context(|| format!("Invalid settings file: {:?}", path))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("tabula"))
}

pub fn settings_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}
