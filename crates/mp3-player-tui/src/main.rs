//! `mp3play`: a terminal MP3 player for one local directory.
//!
//! Features:
//! - list `.mp3` files in a directory (non-recursive)
//! - Enter: play selected, p: play/resume, Space: pause
//! - n/b: next/previous, +/-: volume, s: stop
//! - l: logs, q: quit

mod config;
mod logging;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mp3_player::{CpalOutput, PlaybackEngine, SymphoniaDecoder, TrackController, TrackLibrary};

use crate::config::{PlayerConfig, Settings};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "mp3play", version = VERSION)]
struct Args {
    /// Directory with `.mp3` files (defaults to the current directory).
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Output device name (substring match). Defaults to the system output.
    #[arg(long)]
    device: Option<String>,

    /// Initial volume, 0-100.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,

    /// Append logs to this file instead of `player.log`.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Optional player config file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames per output block.
    #[arg(long)]
    block_frames: Option<usize>,

    /// List output devices and exit.
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn overrides(&self) -> PlayerConfig {
        PlayerConfig {
            music_dir: self.dir.clone(),
            device: self.device.clone(),
            volume: self.volume,
            log_file: self.log_file.clone(),
            block_frames: self.block_frames,
            pause_tick_ms: None,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        let host = cpal::default_host();
        for name in mp3_player::device::list_devices(&host).context("list output devices")? {
            println!("{name}");
        }
        return Ok(());
    }

    let file_cfg = match args.config.as_deref() {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };
    let settings = Settings::resolve(args.overrides().or(file_cfg));
    let log_rx = logging::init(&settings.log_file)?;
    tracing::info!(version = VERSION, dir = ?settings.music_dir, "starting");

    let library = match TrackLibrary::scan(&settings.music_dir) {
        Ok(library) => library,
        Err(e) => {
            tracing::error!("{e}");
            TrackLibrary::empty(&settings.music_dir)
        }
    };

    let output = CpalOutput::new(settings.device.clone(), &settings.engine);
    let engine = PlaybackEngine::new(Arc::new(output), settings.engine.clone());
    let mut controller = TrackController::new(library, SymphoniaDecoder, engine);
    controller.set_volume(f32::from(settings.volume) / 100.0);

    ui::run_tui(controller, settings.volume, log_rx)
}
