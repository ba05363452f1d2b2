//! Playback engine: owns one decoded buffer and streams it to an output device.
//!
//! State machine:
//! - `Idle`: nothing loaded
//! - `Loaded`: buffer held, no session
//! - `Playing` / `Paused`: a session is streaming the buffer
//!
//! A session runs on its own named thread. The buffer is moved into that
//! thread for the duration of the session and handed back when the thread is
//! joined, so at any instant exactly one side owns it. `stop()` always joins
//! before returning; nothing touches engine state afterwards.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::EngineConfig;
use crate::control::{ControlState, PlaybackEndReason};
use crate::decode::{DecodedAudio, frames_to_ms};
use crate::error::{DeviceError, PlaybackError};
use crate::output::{OutputDevice, OutputStream, StreamInterrupt, StreamSpec};

/// Observable engine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Loaded,
    Playing,
    Paused,
}

/// Format of the loaded buffer, kept while the buffer itself is on the streaming thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: u64,
    pub codec: Option<String>,
}

impl TrackInfo {
    fn of(buffer: &DecodedAudio) -> Self {
        Self {
            channels: buffer.channels(),
            sample_rate: buffer.sample_rate(),
            frames: buffer.frames() as u64,
            codec: buffer.codec().map(str::to_string),
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        frames_to_ms(self.frames, self.sample_rate)
    }
}

struct Session {
    join: JoinHandle<DecodedAudio>,
    interrupt: Arc<dyn StreamInterrupt>,
}

pub struct PlaybackEngine {
    output: Arc<dyn OutputDevice>,
    control: Arc<ControlState>,
    config: EngineConfig,
    buffer: Option<DecodedAudio>,
    info: Option<TrackInfo>,
    session: Option<Session>,
}

impl PlaybackEngine {
    pub fn new(output: Arc<dyn OutputDevice>, config: EngineConfig) -> Self {
        Self {
            output,
            control: Arc::new(ControlState::default()),
            config: config.sanitized(),
            buffer: None,
            info: None,
            session: None,
        }
    }

    /// Replace the held buffer and rewind to frame 0.
    ///
    /// Fails with [`PlaybackError::SessionActive`] while a session is still
    /// streaming; call [`stop`](Self::stop) first.
    pub fn load(&mut self, buffer: DecodedAudio) -> Result<(), PlaybackError> {
        self.reap();
        if self.session.is_some() {
            return Err(PlaybackError::SessionActive);
        }
        self.info = Some(TrackInfo::of(&buffer));
        self.buffer = Some(buffer);
        self.control.set_position(0);
        Ok(())
    }

    /// Open an output stream for the loaded buffer and start streaming it.
    ///
    /// The stream is opened on the streaming thread; this call waits for the
    /// open result so device errors come back here. On failure the buffer
    /// stays loaded.
    pub fn start(&mut self) -> Result<(), PlaybackError> {
        self.reap();
        if self.session.is_some() {
            return Err(PlaybackError::SessionActive);
        }
        let buffer = self.buffer.take().ok_or(PlaybackError::NotLoaded)?;

        let spec = StreamSpec {
            channels: buffer.channels(),
            sample_rate: buffer.sample_rate(),
            block_frames: self.config.block_frames,
        };
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let output = self.output.clone();
        let control = self.control.clone();
        let config = self.config.clone();

        self.control.begin_session();
        let spawned = thread::Builder::new()
            .name("mp3-stream".into())
            .spawn(move || {
                let stream = match output.open(spec) {
                    Ok(s) => s,
                    Err(e) => {
                        control.finish_session(PlaybackEndReason::Error);
                        let _ = ready_tx.send(Err(e));
                        return buffer;
                    }
                };
                let _ = ready_tx.send(Ok(stream.interrupter()));
                stream_session(buffer, stream, &control, &config)
            });

        let join = match spawned {
            Ok(join) => join,
            Err(e) => {
                self.control.finish_session(PlaybackEndReason::Error);
                self.info = None;
                tracing::error!("spawn streaming thread: {e}");
                return Err(PlaybackError::Spawn(e));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(interrupt)) => {
                self.session = Some(Session { join, interrupt });
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    channels = spec.channels,
                    rate_hz = spec.sample_rate,
                    "output open failed: {e}"
                );
                self.buffer = self.join_thread(join);
                Err(e.into())
            }
            Err(_) => {
                self.buffer = self.join_thread(join);
                Err(DeviceError::Open("streaming thread exited before opening output".into()).into())
            }
        }
    }

    /// End the current session, join its thread and release the buffer.
    ///
    /// Safe to call in any state; leaves the engine `Idle`.
    pub fn stop(&mut self) {
        self.control.request_stop();
        if let Some(session) = self.session.take() {
            session.interrupt.interrupt();
            drop(self.join_thread(session.join));
        }
        self.buffer = None;
        self.info = None;
        self.control.set_paused(false);
        self.control.set_position(0);
    }

    /// Takes effect at the next loop iteration. No-op without an active session.
    pub fn pause(&mut self) {
        if self.is_playing() {
            self.control.set_paused(true);
        }
    }

    pub fn resume(&mut self) {
        self.control.set_paused(false);
    }

    /// Linear gain applied to the next block.
    pub fn set_volume(&self, gain: f32) {
        self.control.set_volume(gain);
    }

    pub fn volume(&self) -> f32 {
        self.control.volume()
    }

    /// `true` while a session is streaming (paused or not).
    pub fn is_playing(&self) -> bool {
        self.session.is_some() && self.control.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.is_playing() && self.control.is_paused()
    }

    pub fn state(&self) -> EngineState {
        match (&self.session, self.control.is_playing()) {
            (Some(_), true) if self.control.is_paused() => EngineState::Paused,
            (Some(_), true) => EngineState::Playing,
            (Some(_), false) => EngineState::Loaded,
            (None, _) if self.buffer.is_some() => EngineState::Loaded,
            (None, _) => EngineState::Idle,
        }
    }

    /// Current read position in frames.
    pub fn position_frames(&self) -> u64 {
        self.control.position()
    }

    pub fn track_info(&self) -> Option<&TrackInfo> {
        self.info.as_ref()
    }

    pub fn end_reason(&self) -> Option<PlaybackEndReason> {
        self.control.end_reason()
    }

    /// Join a session whose loop has already exited on its own.
    fn reap(&mut self) {
        let finished = self
            .session
            .as_ref()
            .map(|s| !self.control.is_playing() || s.join.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }
        if let Some(session) = self.session.take() {
            self.buffer = self.join_thread(session.join);
            if self.buffer.is_none() {
                self.info = None;
            }
            self.control.set_position(0);
        }
    }

    fn join_thread(&self, join: JoinHandle<DecodedAudio>) -> Option<DecodedAudio> {
        match join.join() {
            Ok(buffer) => Some(buffer),
            Err(_) => {
                tracing::error!("streaming thread panicked");
                None
            }
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Streaming loop for one session. Returns the buffer to the engine.
fn stream_session(
    buffer: DecodedAudio,
    mut stream: Box<dyn OutputStream>,
    control: &ControlState,
    config: &EngineConfig,
) -> DecodedAudio {
    let channels = buffer.channels() as usize;
    let total = buffer.frames();
    let mut pos = 0usize;
    let mut block = Vec::with_capacity(config.block_frames * channels);

    let reason = loop {
        if !control.is_playing() {
            break PlaybackEndReason::Stopped;
        }
        if control.is_paused() {
            thread::sleep(config.pause_tick);
            continue;
        }
        if pos >= total {
            break PlaybackEndReason::Eof;
        }

        let frames = config.block_frames.min(total - pos);
        let src = &buffer.samples()[pos * channels..(pos + frames) * channels];
        apply_gain(src, control.volume(), &mut block);

        if let Err(e) = stream.write(&block) {
            if !control.is_playing() {
                break PlaybackEndReason::Stopped;
            }
            tracing::warn!(position_frames = pos, "output write failed: {e}");
            break PlaybackEndReason::Error;
        }

        pos += frames;
        control.set_position(pos as u64);
    };

    if reason == PlaybackEndReason::Eof {
        stream.drain();
    }
    stream.close();
    drop(stream);

    tracing::info!(?reason, position_frames = pos, total_frames = total, "session ended");
    control.finish_session(reason);
    buffer
}

/// Scale `src` by `gain` into `out`, saturating at the `i16` range.
pub fn apply_gain(src: &[i16], gain: f32, out: &mut Vec<i16>) {
    out.clear();
    out.extend(src.iter().map(|&s| scale_sample(s, gain)));
}

pub fn scale_sample(sample: i16, gain: f32) -> i16 {
    (sample as f32 * gain).clamp(-32768.0, 32767.0) as i16
}
