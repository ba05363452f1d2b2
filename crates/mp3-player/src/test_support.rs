//! Test doubles shared by the engine and controller tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::decode::{DecodedAudio, TrackDecoder};
use crate::error::{DecodeError, DeviceError, WriteError};
use crate::output::{OutputDevice, OutputStream, StreamInterrupt, StreamSpec};

pub(crate) fn test_config() -> EngineConfig {
    EngineConfig {
        block_frames: 64,
        pause_tick: Duration::from_millis(2),
        queue_blocks: 2,
        drain_timeout: Duration::from_millis(100),
    }
}

/// Deterministic, mostly non-zero interleaved samples.
pub(crate) fn ramp(frames: usize, channels: u16, rate: u32) -> DecodedAudio {
    let samples = (0..frames * channels as usize)
        .map(|i| ((i * 131) % 30_000) as i16 - 14_999)
        .collect();
    DecodedAudio::new(samples, channels, rate)
}

pub(crate) fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[derive(Default)]
struct Recorder {
    state: Mutex<RecState>,
    cv: Condvar,
}

#[derive(Default)]
struct RecState {
    blocks: Vec<Vec<i16>>,
    opened: Vec<StreamSpec>,
    closed: usize,
    /// `None` = writes never block.
    permits: Option<usize>,
    fail_next_open: bool,
    fail_write_after: Option<usize>,
}

impl Recorder {
    fn lock(&self) -> MutexGuard<'_, RecState> {
        self.state.lock().unwrap()
    }
}

/// Output device that records every written block.
#[derive(Clone, Default)]
pub(crate) struct RecordingOutput {
    shared: Arc<Recorder>,
}

impl RecordingOutput {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every write blocks until a permit is granted (or the stream is interrupted).
    pub(crate) fn gated() -> Self {
        let out = Self::default();
        out.shared.lock().permits = Some(0);
        out
    }

    pub(crate) fn grant(&self, n: usize) {
        let mut st = self.shared.lock();
        st.permits = Some(st.permits.unwrap_or(0) + n);
        drop(st);
        self.shared.cv.notify_all();
    }

    pub(crate) fn fail_next_open(&self) {
        self.shared.lock().fail_next_open = true;
    }

    pub(crate) fn fail_write_after(&self, blocks: usize) {
        self.shared.lock().fail_write_after = Some(blocks);
    }

    pub(crate) fn blocks(&self) -> Vec<Vec<i16>> {
        self.shared.lock().blocks.clone()
    }

    pub(crate) fn samples(&self) -> Vec<i16> {
        self.shared.lock().blocks.concat()
    }

    pub(crate) fn opened(&self) -> Vec<StreamSpec> {
        self.shared.lock().opened.clone()
    }

    pub(crate) fn closed_count(&self) -> usize {
        self.shared.lock().closed
    }

    pub(crate) fn wait_for_blocks(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut st = self.shared.lock();
        while st.blocks.len() < n {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            st = self.shared.cv.wait_timeout(st, deadline - now).unwrap().0;
        }
        true
    }
}

impl OutputDevice for RecordingOutput {
    fn open(&self, spec: StreamSpec) -> Result<Box<dyn OutputStream>, DeviceError> {
        let mut st = self.shared.lock();
        if st.fail_next_open {
            st.fail_next_open = false;
            return Err(DeviceError::NoDevice);
        }
        st.opened.push(spec);
        Ok(Box::new(RecordingStream {
            flag: Arc::new(InterruptFlag {
                interrupted: AtomicBool::new(false),
                shared: self.shared.clone(),
            }),
            closed: false,
        }))
    }
}

struct InterruptFlag {
    interrupted: AtomicBool,
    shared: Arc<Recorder>,
}

impl StreamInterrupt for InterruptFlag {
    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        let _guard = self.shared.lock();
        self.shared.cv.notify_all();
    }
}

struct RecordingStream {
    flag: Arc<InterruptFlag>,
    closed: bool,
}

impl OutputStream for RecordingStream {
    fn write(&mut self, block: &[i16]) -> Result<(), WriteError> {
        let shared = &self.flag.shared;
        let mut st = shared.lock();
        loop {
            if self.closed || self.flag.interrupted.load(Ordering::SeqCst) {
                return Err(WriteError::Closed);
            }
            if let Some(limit) = st.fail_write_after {
                if st.blocks.len() >= limit {
                    return Err(WriteError::Device("injected failure".into()));
                }
            }
            match st.permits {
                None => break,
                Some(0) => st = shared.cv.wait(st).unwrap(),
                Some(n) => {
                    st.permits = Some(n - 1);
                    break;
                }
            }
        }
        st.blocks.push(block.to_vec());
        drop(st);
        shared.cv.notify_all();
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.flag.shared.lock().closed += 1;
        self.flag.shared.cv.notify_all();
    }

    fn interrupter(&self) -> Arc<dyn StreamInterrupt> {
        self.flag.clone()
    }
}

/// Decoder that answers from a table keyed by file name.
#[derive(Default)]
pub(crate) struct ScriptedDecoder {
    tracks: HashMap<String, DecodedAudio>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn track(mut self, name: &str, audio: DecodedAudio) -> Self {
        self.tracks.insert(name.to_string(), audio);
        self
    }

    pub(crate) fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl TrackDecoder for ScriptedDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.tracks
            .get(name)
            .cloned()
            .ok_or_else(|| DecodeError::Empty {
                path: path.to_path_buf(),
            })
    }
}
