//! Control state shared between the controlling thread and the streaming loop.
//!
//! Every field is an independent atomic so a control update never waits on
//! in-flight audio I/O.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};

/// Why the most recent session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEndReason {
    /// The read position reached the end of the buffer.
    Eof,
    /// The output device failed to open or write.
    Error,
    /// `stop()` was called.
    Stopped,
}

impl PlaybackEndReason {
    fn to_u8(self) -> u8 {
        match self {
            Self::Eof => 1,
            Self::Error => 2,
            Self::Stopped => 3,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Eof),
            2 => Some(Self::Error),
            3 => Some(Self::Stopped),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ControlState {
    playing: AtomicBool,
    paused: AtomicBool,
    /// `f32` gain stored as its bit pattern.
    volume: AtomicU32,
    /// Read position in frames.
    position: AtomicU64,
    end_reason: AtomicU8,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ControlState {
    pub fn new(gain: f32) -> Self {
        Self {
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            volume: AtomicU32::new(sanitize_gain(gain).unwrap_or(1.0).to_bits()),
            position: AtomicU64::new(0),
            end_reason: AtomicU8::new(0),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Only meaningful while [`is_playing`](Self::is_playing) is true.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Store a new linear gain. Negative values become 0; NaN/infinite are ignored.
    pub fn set_volume(&self, gain: f32) {
        match sanitize_gain(gain) {
            Some(g) => self.volume.store(g.to_bits(), Ordering::Relaxed),
            None => tracing::warn!(gain, "ignoring non-finite volume"),
        }
    }

    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    pub(crate) fn set_position(&self, frames: u64) {
        self.position.store(frames, Ordering::Relaxed);
    }

    pub fn end_reason(&self) -> Option<PlaybackEndReason> {
        PlaybackEndReason::from_u8(self.end_reason.load(Ordering::Relaxed))
    }

    /// Reset per-session fields and mark playing.
    pub(crate) fn begin_session(&self) {
        self.end_reason.store(0, Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
        self.paused.store(false, Ordering::Relaxed);
        self.playing.store(true, Ordering::Release);
    }

    pub(crate) fn request_stop(&self) {
        self.playing.store(false, Ordering::Release);
    }

    /// Record the end reason, then clear the playing flag.
    pub(crate) fn finish_session(&self, reason: PlaybackEndReason) {
        self.end_reason.store(reason.to_u8(), Ordering::Relaxed);
        self.paused.store(false, Ordering::Relaxed);
        self.playing.store(false, Ordering::Release);
    }
}

fn sanitize_gain(gain: f32) -> Option<f32> {
    if !gain.is_finite() {
        return None;
    }
    Some(gain.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_round_trips_through_bits() {
        let state = ControlState::default();
        assert_eq!(state.volume(), 1.0);
        state.set_volume(0.35);
        assert_eq!(state.volume(), 0.35);
    }

    #[test]
    fn volume_rejects_bad_values() {
        let state = ControlState::new(0.5);
        state.set_volume(f32::NAN);
        assert_eq!(state.volume(), 0.5);
        state.set_volume(-2.0);
        assert_eq!(state.volume(), 0.0);
    }

    #[test]
    fn session_lifecycle_updates_flags() {
        let state = ControlState::default();
        state.set_position(42);
        state.set_paused(true);

        state.begin_session();
        assert!(state.is_playing());
        assert!(!state.is_paused());
        assert_eq!(state.position(), 0);
        assert_eq!(state.end_reason(), None);

        state.finish_session(PlaybackEndReason::Eof);
        assert!(!state.is_playing());
        assert_eq!(state.end_reason(), Some(PlaybackEndReason::Eof));
    }

    #[test]
    fn end_reason_encoding_is_stable() {
        for reason in [
            PlaybackEndReason::Eof,
            PlaybackEndReason::Error,
            PlaybackEndReason::Stopped,
        ] {
            assert_eq!(PlaybackEndReason::from_u8(reason.to_u8()), Some(reason));
        }
        assert_eq!(PlaybackEndReason::from_u8(0), None);
    }
}
