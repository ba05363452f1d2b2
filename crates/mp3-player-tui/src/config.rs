//! Player configuration: optional TOML file merged with CLI flags.
//!
//! CLI values win over file values; defaults fill whatever neither sets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use mp3_player::EngineConfig;
use serde::Deserialize;

pub(crate) const DEFAULT_VOLUME: u8 = 50;
pub(crate) const DEFAULT_LOG_FILE: &str = "player.log";

/// Settings as read from TOML or collected from CLI flags.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub(crate) struct PlayerConfig {
    /// Directory scanned for `.mp3` files.
    pub music_dir: Option<PathBuf>,
    /// Case-insensitive substring of the output device name.
    pub device: Option<String>,
    /// Initial volume, 0-100.
    pub volume: Option<u8>,
    pub log_file: Option<PathBuf>,
    pub block_frames: Option<usize>,
    pub pause_tick_ms: Option<u64>,
}

impl PlayerConfig {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<PlayerConfig>(raw)?)
    }

    /// Fill unset values in `self` from `fallback`.
    pub(crate) fn or(self, fallback: PlayerConfig) -> PlayerConfig {
        PlayerConfig {
            music_dir: self.music_dir.or(fallback.music_dir),
            device: self.device.or(fallback.device),
            volume: self.volume.or(fallback.volume),
            log_file: self.log_file.or(fallback.log_file),
            block_frames: self.block_frames.or(fallback.block_frames),
            pause_tick_ms: self.pause_tick_ms.or(fallback.pause_tick_ms),
        }
    }
}

/// Fully resolved settings.
#[derive(Debug)]
pub(crate) struct Settings {
    pub music_dir: PathBuf,
    pub device: Option<String>,
    pub volume: u8,
    pub log_file: PathBuf,
    pub engine: EngineConfig,
}

impl Settings {
    pub(crate) fn resolve(cfg: PlayerConfig) -> Self {
        let mut engine = EngineConfig::default();
        if let Some(frames) = cfg.block_frames {
            engine.block_frames = frames;
        }
        if let Some(ms) = cfg.pause_tick_ms {
            engine.pause_tick = Duration::from_millis(ms);
        }

        Self {
            music_dir: cfg.music_dir.unwrap_or_else(|| PathBuf::from(".")),
            device: cfg.device.filter(|d| !d.trim().is_empty()),
            volume: cfg.volume.unwrap_or(DEFAULT_VOLUME).min(100),
            log_file: cfg
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            engine: engine.sanitized(),
        }
    }
}
