/// User settings
///
/// Settings are stored as JSON in the user's config directory:
/// - Linux: ~/.config/lensfix/settings.json
/// - macOS: ~/Library/Application Support/lensfix/settings.json
/// - Windows: %APPDATA%\lensfix\settings.json
///
/// Every field has a default, so a missing file or missing keys are fine.
/// Lens tables are compiled in and are not configurable here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

const APP_DIR: &str = "lensfix";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// exiftool executable (looked up on PATH when not absolute)
    pub exiftool_path: PathBuf,
    /// Catalog database location (None = platform data directory)
    pub database_path: Option<PathBuf>,
    /// Keep exiftool's `_original` backup files
    pub keep_backups: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exiftool_path: PathBuf::from("exiftool"),
            database_path: None,
            keep_backups: false,
        }
    }
}

impl Settings {
    /// Load settings from the default location.
    /// On first run the defaults are written out so they can be edited.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(&path)?;
            info!("📝 Wrote default settings to {}", path.display());
            return Ok(settings);
        }
        Self::load_from(&path)
    }

    /// Load settings from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write settings to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Where settings.json lives
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("settings.json"))
    }

    /// Where the catalog database lives
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(|| {
            dirs::data_dir()
                .or_else(dirs::home_dir)
                .map(|dir| dir.join(APP_DIR).join("catalog.db"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "keep_backups": true }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert!(settings.keep_backups);
        assert_eq!(settings.exiftool_path, PathBuf::from("exiftool"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            exiftool_path: PathBuf::from("/opt/exiftool/exiftool"),
            database_path: Some(dir.path().join("catalog.db")),
            keep_backups: true,
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let settings = Settings {
            database_path: Some(PathBuf::from("/tmp/catalog.db")),
            ..Settings::default()
        };
        assert_eq!(settings.database_path(), Some(PathBuf::from("/tmp/catalog.db")));
    }
}
