// Configuration loaded from config.yaml

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_DIR: &str = "freelance-tracker";

/// Which durable storage backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(BackendKind::File),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(eyre!("Unknown backend: {} (expected file or sqlite)", other)),
        }
    }
}

/// Tracker configuration; every field is optional in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub backend: BackendKind,
    pub export_dir: PathBuf,
    pub analysis_delay_ms: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR)),
            backend: BackendKind::File,
            export_dir: PathBuf::from("."),
            analysis_delay_ms: 3000,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// `<config_dir>/freelance-tracker/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.yaml"))
    }

    /// Load from `path`, or the default location when `None`
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid config {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }
}
