//! Error taxonomy for the player.
//!
//! Every kind here is recovered inside the engine/controller; none of them
//! is allowed to take the process down.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a file on disk into a decoded PCM buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported or corrupt audio in {path:?}: {source}")]
    Unsupported {
        path: PathBuf,
        #[source]
        source: symphonia::core::errors::Error,
    },

    #[error("no audio track in {path:?}")]
    NoTrack { path: PathBuf },

    #[error("{path:?} decoded to zero frames")]
    Empty { path: PathBuf },
}

/// Failure to open an output stream.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no default output device")]
    NoDevice,

    #[error("no output device matched: {0}")]
    NotFound(String),

    #[error("device rejected format: {channels} ch @ {sample_rate} Hz")]
    FormatRejected { channels: u16, sample_rate: u32 },

    #[error("open output stream: {0}")]
    Open(String),
}

/// Failure while writing a block to an open stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("output stream closed")]
    Closed,

    #[error("output device error: {0}")]
    Device(String),
}

/// Problems with the configured track directory.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read track directory {path:?}: {source}")]
    MissingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no .mp3 files found in {path:?}")]
    NoTracks { path: PathBuf },
}

/// Error returned by engine and controller operations.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no track loaded")]
    NotLoaded,

    #[error("a playback session is still active")]
    SessionActive,

    #[error("track list is empty")]
    NoTracks,

    #[error("spawn streaming thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
