//! Parameter definitions with units and documented semantics.
//!
//! The pressing parameters and audio file index come from a TOML settings
//! file; every value falls back to its default on its own when it is
//! missing or has the wrong type.

mod audio;
mod pressing;
mod render;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

// Re-export all types
pub use audio::FFTConfig;
pub use pressing::{FileEntry, PressingParams};
pub use render::{unix_timestamp, OutputConfig, RenderConfig};

/// Errors raised while reading the settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of the settings file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// Audio files by key (`[file-index.a]`, `[file-index.b]`, ...)
    pub file_index: BTreeMap<String, FileEntry>,

    pub settings: PressingParams,
}

impl Settings {
    /// Parse settings from TOML text
    ///
    /// Only malformed TOML is an error. Unusable values are replaced by
    /// their defaults and logged.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, SettingsError> {
        let root = text.parse::<toml::Table>().map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = match root.get("settings") {
            None => PressingParams::default(),
            Some(toml::Value::Table(table)) => PressingParams::from_table(table),
            Some(other) => {
                log::warn!(
                    "settings: expected a table, got {}; using defaults",
                    other.type_str()
                );
                PressingParams::default()
            }
        };

        let mut file_index = BTreeMap::new();
        match root.get("file-index") {
            None => {}
            Some(toml::Value::Table(entries)) => {
                for (key, value) in entries {
                    match value {
                        toml::Value::Table(table) => {
                            file_index.insert(key.clone(), FileEntry::from_table(key, table));
                        }
                        other => log::warn!(
                            "file-index.{}: expected a table, got {}; skipped",
                            key,
                            other.type_str()
                        ),
                    }
                }
            }
            Some(other) => log::warn!(
                "file-index: expected a table, got {}; ignored",
                other.type_str()
            ),
        }

        Ok(Self {
            file_index,
            settings,
        })
    }

    /// Read and parse the settings file at `path`
    pub fn read(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Read the settings file, falling back to defaults when it cannot be used
    pub fn load_or_default(path: &Path) -> Self {
        match Self::read(path) {
            Ok(settings) => {
                log::info!("settings loaded from {}", path.display());
                settings
            }
            Err(err) => {
                log::warn!("{}; using default settings", err);
                Self::default()
            }
        }
    }

    /// Entry for `key`, or the default entry when the index has none
    pub fn file(&self, key: &str) -> FileEntry {
        match self.file_index.get(key) {
            Some(entry) => entry.clone(),
            None => {
                log::warn!("no [file-index.{}] entry; using defaults", key);
                FileEntry::default()
            }
        }
    }
}

/// Value of `key` in `table`, or `default()` when it is missing or unusable
pub(crate) fn read_key<T: DeserializeOwned>(
    table: &toml::Table,
    section: &str,
    key: &str,
    default: impl FnOnce() -> T,
) -> T {
    let Some(value) = table.get(key) else {
        return default();
    };
    match value.clone().try_into() {
        Ok(value) => value,
        Err(err) => {
            log::warn!("[{}] {}: {}; using default", section, key, err.to_string().trim());
            default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Settings {
        Settings::from_toml(text, Path::new("settings.toml")).unwrap()
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = parse("");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.settings, PressingParams::default());
    }

    #[test]
    fn test_partial_settings_fall_back_per_field() {
        let settings = parse(
            r#"
            [settings]
            decay-rate = 0.5
            line-resolution = 4
            "#,
        );
        assert_eq!(settings.settings.decay_rate, 0.5);
        assert_eq!(settings.settings.line_resolution, 4.0);
        assert_eq!(settings.settings.frequency_scale, 100.0);
        assert_eq!(settings.settings.surface_depth, -20.0);
    }

    #[test]
    fn test_file_index_lookup() {
        let settings = parse(
            r#"
            [file-index.a]
            name = "track.wav"
            length = 215

            [file-index.b]
            name = "other.wav"
            "#,
        );
        let a = settings.file("a");
        assert_eq!(a.name, "track.wav");
        assert_eq!(a.length, 215.0);

        // Missing length falls back on its own
        assert_eq!(settings.file("b").length, 60.0);

        // Missing key falls back entirely
        assert_eq!(settings.file("z"), FileEntry::default());
    }

    #[test]
    fn test_wrong_type_falls_back_per_field() {
        let settings = parse(
            r#"
            [file-index.a]
            name = "song.wav"
            length = 215

            [file-index.b]
            name = 7
            length = "long"

            [settings]
            decay-rate = "fast"
            radial-position-end = 500
            band-count = -4
            "#,
        );
        let a = settings.file("a");
        assert_eq!(a.name, "song.wav");
        assert_eq!(a.length, 215.0);
        assert_eq!(settings.file("b"), FileEntry::default());

        assert_eq!(settings.settings.decay_rate, 0.97);
        assert_eq!(settings.settings.radial_position_end, 500.0);
        assert_eq!(settings.settings.band_count, 256);
    }

    #[test]
    fn test_non_table_sections_are_ignored() {
        let settings = parse(
            r#"
            settings = 3

            [file-index]
            a = "song.wav"

            [file-index.b]
            name = "other.wav"
            "#,
        );
        assert_eq!(settings.settings, PressingParams::default());
        assert!(settings.file_index.get("a").is_none());
        assert_eq!(settings.file("b").name, "other.wav");
    }

    #[test]
    fn test_invalid_values_are_sanitized() {
        let settings = parse(
            r#"
            [file-index.a]
            name = "song.wav"
            length = 0

            [settings]
            line-resolution = 0
            band-count = 1
            "#,
        );
        assert_eq!(settings.settings.line_resolution, 1.0);
        assert_eq!(settings.settings.band_count, 256);
        assert_eq!(settings.file("a").length, 60.0);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let err = Settings::from_toml("[settings\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let settings = Settings::load_or_default(Path::new("/nonexistent/settings.toml"));
        assert_eq!(settings, Settings::default());
    }
}
