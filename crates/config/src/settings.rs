// Application settings
// Loaded from ~/.config/dedupe/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults for anything not given on the command line or in the environment.
///
/// Example file:
///
/// ```json
/// {
///     // Dataset
///     "data.path": "/srv/registry/repositories.csv",
///     "data.output": null,
///
///     // Finder
///     "filters.entryRecordedBy": "jdoe",
///     "filters.noPobox": true,
///
///     "log.file": "/tmp/dedupe.log"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Dataset
    #[serde(rename = "data.path")]
    pub data_path: Option<PathBuf>,

    #[serde(rename = "data.output")]
    pub output: Option<PathBuf>,

    // Finder
    #[serde(rename = "filters.entryRecordedBy")]
    pub entry_recorded_by: Option<String>,

    #[serde(rename = "filters.noPobox")]
    pub no_pobox: bool,

    // Logging
    #[serde(rename = "log.file")]
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dedupe");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Like [`Settings::load`], but hands a broken file back to the caller.
    pub fn try_load() -> Result<Self, String> {
        Self::try_load_from(&Self::config_path())
    }

    /// Load from an explicit path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Self {
        Self::try_load_from(path).unwrap_or_else(|e| {
            log::warn!("{}; using defaults", e);
            Self::default()
        })
    }

    /// Load from an explicit path, reporting a file that can't be read or parsed.
    pub fn try_load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("error reading {}: {}", path.display(), e))?;
        let settings = Self::parse(&contents)
            .map_err(|e| format!("error parsing {}: {}", path.display(), e))?;
        log::debug!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Parse settings JSON, ignoring `//` comment lines.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
