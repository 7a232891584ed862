//! Command-line argument parsing.

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::params::{FileEntry, Settings};

/// File name meaning "no audio file configured"
const NO_FILE: &str = "none";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "testpressing")]
#[command(about = "Presses an audio file's spectrum into a solid radial mesh", long_about = None)]
pub struct Args {
    /// Settings file (TOML)
    #[arg(long, value_name = "PATH", default_value = "settings.toml")]
    pub settings: PathBuf,

    /// Key of the `[file-index.<key>]` entry to play
    #[arg(long, value_name = "KEY", default_value = "a")]
    pub file_index: String,

    /// Audio file to play instead of the file index entry
    #[arg(long, value_name = "WAV")]
    pub audio: Option<PathBuf>,

    /// Length of one full rotation (seconds), overriding the file index entry
    #[arg(long, value_name = "SECONDS")]
    pub length: Option<f32>,

    /// Directory for mesh dumps and screenshots
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

/// The audio file to press and how long one rotation takes
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Name shown in the status line
    pub name: String,

    /// File to play, if any
    pub path: Option<PathBuf>,

    pub length_s: f32,
}

impl Args {
    /// Resolve the track from the command line and the settings file index.
    ///
    /// Relative file index names are looked up next to the settings file.
    pub fn track(&self, settings: &Settings) -> Track {
        let entry = settings.file(&self.file_index);
        let length_s = match self.length {
            Some(length) if length.is_finite() && length > 0.0 => length,
            Some(length) => {
                log::warn!(
                    "--length must be > 0, got {}; using {}",
                    length,
                    entry.length
                );
                entry.length
            }
            None => entry.length,
        };

        if let Some(path) = &self.audio {
            return Track {
                name: path.display().to_string(),
                path: Some(path.clone()),
                length_s,
            };
        }

        let path = entry_path(&entry, &self.settings);
        Track {
            name: entry.name,
            path,
            length_s,
        }
    }
}

fn entry_path(entry: &FileEntry, settings_path: &Path) -> Option<PathBuf> {
    if entry.name.is_empty() || entry.name == NO_FILE {
        return None;
    }
    let name = Path::new(&entry.name);
    let base = settings_path.parent().unwrap_or_else(|| Path::new(""));
    Some(base.join(name))
}
