// SPDX-License-Identifier: MIT OR Apache-2.0
//! Console settings.
//!
//! Settings live in a RON file next to the sequence library:
//! - Library and upload locations
//! - Clock cadence
//! - Upload watcher debounce
//! - Sequence to start on launch
//! - Default log directive

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "ledctl.ron";

/// Errors loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading or writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON for this format
    #[error("Invalid settings file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be written as RON
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// A value is out of range
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Console settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Settings format version
    pub version: u32,
    /// Sequence library file
    pub library_path: PathBuf,
    /// Directory watched for uploaded binary sequence files
    pub upload_dir: Option<PathBuf>,
    /// Clock driver period in milliseconds
    pub tick_interval_ms: u64,
    /// Upload watcher debounce in milliseconds
    pub watch_debounce_ms: u64,
    /// Sequence started on launch
    pub autoplay: Option<String>,
    /// Log directive used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            library_path: PathBuf::from("library.ron"),
            upload_dir: None,
            tick_interval_ms: 250,
            watch_debounce_ms: 500,
            autoplay: None,
            log_filter: "ledctl_console=info,ledctl_sequencer=info".to_string(),
        }
    }
}

impl ConsoleSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: ConsoleSettings = ron::from_str(&content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::Invalid {
                field: "tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.library_path.as_os_str().is_empty() {
            return Err(SettingsError::Invalid {
                field: "library_path",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Clock driver period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Upload watcher debounce
    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }

    /// Resolve relative paths against the directory holding the settings file
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        if self.library_path.is_relative() {
            self.library_path = base_dir.join(&self.library_path);
        }
        if let Some(dir) = &self.upload_dir {
            if dir.is_relative() {
                self.upload_dir = Some(base_dir.join(dir));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ledctl-{}-{name}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_default_settings() {
        let settings = ConsoleSettings::default();
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(settings.tick_interval(), Duration::from_millis(250));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path(SETTINGS_FILE_NAME);
        let settings = ConsoleSettings {
            upload_dir: Some(PathBuf::from("uploads")),
            autoplay: Some("seq-1".to_string()),
            ..ConsoleSettings::default()
        };

        settings.save(&path).unwrap();
        let loaded = ConsoleSettings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded: ConsoleSettings = ron::from_str("(tick_interval_ms: 1000)").unwrap();
        assert_eq!(loaded.tick_interval_ms, 1000);
        assert_eq!(loaded.library_path, PathBuf::from("library.ron"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = temp_path("missing.ron");
        assert_eq!(ConsoleSettings::load_or_default(&path).unwrap(), ConsoleSettings::default());
    }

    #[test]
    fn test_newer_version_rejected() {
        let path = temp_path("future.ron");
        std::fs::write(&path, "(version: 99)").unwrap();
        let result = ConsoleSettings::load(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            result,
            Err(SettingsError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let settings = ConsoleSettings {
            tick_interval_ms: 0,
            ..ConsoleSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { field: "tick_interval_ms", .. })
        ));
    }

    #[test]
    fn test_resolve_relative_paths() {
        let mut settings = ConsoleSettings {
            upload_dir: Some(PathBuf::from("uploads")),
            ..ConsoleSettings::default()
        };
        settings.resolve_paths(Path::new("/srv/ledctl"));

        assert_eq!(settings.library_path, PathBuf::from("/srv/ledctl/library.ron"));
        assert_eq!(settings.upload_dir, Some(PathBuf::from("/srv/ledctl/uploads")));
    }
}
