#[cfg(feature = "serde")]
use crate::error::{Error, Result};
#[cfg(feature = "serde")]
use std::path::Path;
use std::path::PathBuf;

/// Where facts come from and where dumps go.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Config {
    /// CSV fact source
    pub source: PathBuf,
    /// Optional path to write a fact dump to after loading
    pub export: Option<PathBuf>,
    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::from("macadamia.csv"),
            export: None,
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    /// Overlays `MACALOG_SOURCE`, `MACALOG_EXPORT` and `MACALOG_LOG` from
    /// the environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(source) = var("MACALOG_SOURCE") {
            self.source = source.into();
        }
        if let Some(export) = var("MACALOG_EXPORT") {
            self.export = Some(export.into());
        }
        if let Some(level) = var("MACALOG_LOG") {
            self.log_level = level;
        }
        self
    }

    /// Reads a JSON config file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the file cannot be read or is not a valid
    /// config.
    #[cfg(feature = "serde")]
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Parses a JSON config.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `text` is not a valid config.
    #[cfg(feature = "serde")]
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }
}
