use std::time::Duration;

/// Frames per block written to the output device.
pub const DEFAULT_BLOCK_FRAMES: usize = 512;

/// Idle wait between pause checks.
pub const DEFAULT_PAUSE_TICK: Duration = Duration::from_millis(50);

/// Engine tuning parameters shared by the streaming loop and the output stage.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Frames per output block.
    pub block_frames: usize,
    /// Sleep granularity while paused; also bounds pause/resume latency.
    pub pause_tick: Duration,
    /// Output queue capacity in blocks (device-side buffering).
    pub queue_blocks: usize,
    /// Upper bound on waiting for the device to play out the tail of a track.
    pub drain_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_frames: DEFAULT_BLOCK_FRAMES,
            pause_tick: DEFAULT_PAUSE_TICK,
            queue_blocks: 4,
            drain_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Replace zero values with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.block_frames == 0 {
            self.block_frames = defaults.block_frames;
        }
        if self.pause_tick.is_zero() {
            self.pause_tick = defaults.pause_tick;
        }
        if self.queue_blocks == 0 {
            self.queue_blocks = defaults.queue_blocks;
        }
        if self.drain_timeout.is_zero() {
            self.drain_timeout = defaults.drain_timeout;
        }
        self
    }
}
