//! Whole-file decode stage.
//!
//! Uses Symphonia to:
//! - probe the input container/codec
//! - decode every packet into interleaved `i16` samples
//! - hand back one fully materialized [`DecodedAudio`] buffer
//!
//! There is no incremental decode: playback never starts until the whole
//! file has been converted.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CODEC_TYPE_NULL, CodecParameters, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;

/// Interleaved 16-bit PCM for one track, plus its format.
///
/// Owned by exactly one place at a time: the engine while loaded, the
/// streaming thread while a session runs.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAudio {
    samples: Vec<i16>,
    channels: u16,
    sample_rate: u32,
    codec: Option<String>,
}

impl DecodedAudio {
    /// Wrap already-interleaved samples. Trailing samples that do not form a
    /// whole frame are dropped.
    pub fn new(mut samples: Vec<i16>, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self {
            samples,
            channels,
            sample_rate,
            codec: None,
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn codec(&self) -> Option<&str> {
        self.codec.as_deref()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.frames() as u64, self.sample_rate).unwrap_or(0)
    }
}

/// Convert a frame count to milliseconds; `None` for a zero rate.
pub fn frames_to_ms(frames: u64, sample_rate: u32) -> Option<u64> {
    if sample_rate == 0 {
        return None;
    }
    Some(frames.saturating_mul(1000) / sample_rate as u64)
}

/// Turns a file on disk into a decoded buffer.
pub trait TrackDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError>;
}

/// [`TrackDecoder`] backed by Symphonia's default probe and codec registry.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaDecoder;

impl TrackDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        decode_file(path)
    }
}

/// Decode the whole file at `path` into interleaved `i16`.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let unsupported = |source| DecodeError::Unsupported {
        path: path.to_path_buf(),
        source,
    };

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(unsupported)?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::NoTrack {
            path: path.to_path_buf(),
        })?;
    let track_id = track.id;
    let codec_params: CodecParameters = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(unsupported)?;

    let mut spec: Option<SignalSpec> = None;
    let mut sample_buf: Option<SampleBuffer<i16>> = None;
    let mut samples: Vec<i16> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                tracing::warn!(path = ?path, "stopped reading packets: {e}");
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                skipped_packets += 1;
                tracing::debug!(path = ?path, "skipping undecodable packet: {e}");
                continue;
            }
            Err(e) => {
                tracing::warn!(path = ?path, "decoder stopped: {e}");
                break;
            }
        };

        let packet_spec = *decoded.spec();
        match spec {
            None => spec = Some(packet_spec),
            Some(s) if s != packet_spec => {
                skipped_packets += 1;
                tracing::warn!(
                    path = ?path,
                    rate_hz = packet_spec.rate,
                    channels = packet_spec.channels.count(),
                    "dropping packet with mismatched signal spec"
                );
                continue;
            }
            Some(_) => {}
        }

        let needs_alloc = sample_buf
            .as_ref()
            .map(|b| b.capacity() < decoded.capacity())
            .unwrap_or(true);
        if needs_alloc {
            sample_buf = Some(SampleBuffer::<i16>::new(
                decoded.capacity() as u64,
                packet_spec,
            ));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    let Some(spec) = spec else {
        return Err(DecodeError::Empty {
            path: path.to_path_buf(),
        });
    };
    if samples.is_empty() {
        return Err(DecodeError::Empty {
            path: path.to_path_buf(),
        });
    }

    let channels = spec.channels.count() as u16;
    let mut audio = DecodedAudio::new(samples, channels, spec.rate);
    if let Some(codec) = codec_name_from_params(&codec_params) {
        audio = audio.with_codec(codec);
    }

    tracing::info!(
        path = ?path,
        channels,
        rate_hz = spec.rate,
        frames = audio.frames(),
        skipped_packets,
        "decoded track"
    );
    Ok(audio)
}

/// Best-effort codec label used for status display.
fn codec_name_from_params(params: &CodecParameters) -> Option<String> {
    use symphonia::core::codecs::*;
    let name = match params.codec {
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_MP2 => "MP2",
        CODEC_TYPE_MP1 => "MP1",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        _ => return None,
    };
    Some(name.to_string())
}
