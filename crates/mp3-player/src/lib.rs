//! MP3 playback core: decode a track into memory, stream it to an audio
//! device in fixed-size blocks, and drive it from a transport controller.

pub mod config;
pub mod control;
pub mod controller;
pub mod decode;
pub mod device;
pub mod engine;
pub mod error;
pub mod library;
pub mod output;
pub mod queue;
pub mod status;

#[cfg(test)]
mod test_support;

pub use config::EngineConfig;
pub use controller::TrackController;
pub use decode::{DecodedAudio, SymphoniaDecoder, TrackDecoder};
pub use engine::{EngineState, PlaybackEngine};
pub use error::{ConfigError, DecodeError, DeviceError, PlaybackError, WriteError};
pub use library::TrackLibrary;
pub use output::{CpalOutput, OutputDevice};
pub use status::PlayerStatus;
