use crate::control::PlaybackEndReason;
use crate::decode::frames_to_ms;
use crate::engine::EngineState;

/// Point-in-time view of the player for display.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerStatus {
    pub state: EngineState,
    /// UI cursor.
    pub selected_index: usize,
    /// Track actually loaded/streaming, if any.
    pub current_index: Option<usize>,
    pub now_playing: Option<String>,
    /// User-facing volume, 0.0..=1.0.
    pub volume: f32,
    pub position_frames: u64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub duration_ms: Option<u64>,
    pub codec: Option<String>,
    /// How the most recent session ended.
    pub end_reason: Option<PlaybackEndReason>,
}

impl PlayerStatus {
    /// Elapsed playback time derived from the streaming position.
    pub fn elapsed_ms(&self) -> Option<u64> {
        frames_to_ms(self.position_frames, self.sample_rate?)
    }

    pub fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    /// Short label for the transport state.
    pub fn state_label(&self) -> &'static str {
        match self.state {
            EngineState::Idle => "stopped",
            EngineState::Loaded => match self.end_reason {
                Some(PlaybackEndReason::Eof) => "finished",
                Some(PlaybackEndReason::Error) => "error",
                _ => "loaded",
            },
            EngineState::Playing => "playing",
            EngineState::Paused => "paused",
        }
    }
}
