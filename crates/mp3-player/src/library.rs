//! Track list for one directory (non-recursive `.mp3`).
//!
//! Populated once at startup and never mutated while playing.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Clone, Debug, Default)]
pub struct TrackLibrary {
    dir: PathBuf,
    names: Vec<String>,
}

impl TrackLibrary {
    /// List `.mp3` files in `dir`, sorted by name.
    ///
    /// Fails with [`ConfigError::MissingDir`] if the directory cannot be read
    /// and [`ConfigError::NoTracks`] if it holds no tracks.
    pub fn scan(dir: &Path) -> Result<Self, ConfigError> {
        let read_err = |source| ConfigError::MissingDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let path = entry.path();
            if !path.is_file() || !is_mp3(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(OsStr::to_str) {
                names.push(name.to_string());
            }
        }

        if names.is_empty() {
            return Err(ConfigError::NoTracks {
                path: dir.to_path_buf(),
            });
        }

        names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        tracing::info!(dir = ?dir, tracks = names.len(), "track list loaded");
        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    /// A library with no tracks, used when the scan failed.
    pub fn empty(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            names: Vec::new(),
        }
    }

    /// Build from already-known names, in the given order.
    pub fn from_names(dir: &Path, names: Vec<String>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            names,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Readable path for the track at `index`.
    pub fn path(&self, index: usize) -> Option<PathBuf> {
        self.names.get(index).map(|n| self.dir.join(n))
    }
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|e| e.eq_ignore_ascii_case("mp3"))
        .unwrap_or(false)
}
