//! Output sink stage.
//!
//! [`OutputDevice`] opens a stream for a given format; the returned
//! [`OutputStream`] accepts fixed-size blocks and blocks the caller until the
//! device has room. [`CpalOutput`] is the real implementation: it puts a
//! bounded [`BlockQueue`] in front of a CPAL output callback.
//!
//! The callback:
//! - drains the queue without blocking
//! - converts `i16` samples to the device sample format
//! - fills underruns with silence

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};

use crate::config::EngineConfig;
use crate::device;
use crate::error::{DeviceError, WriteError};
use crate::queue::BlockQueue;

/// Format requested from the output device for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub block_frames: usize,
}

/// Unblocks an in-flight [`OutputStream::write`] from another thread.
///
/// After `interrupt()` every pending and future write fails with
/// [`WriteError::Closed`].
pub trait StreamInterrupt: Send + Sync {
    fn interrupt(&self);
}

/// One open output stream.
///
/// Lives on the streaming thread for its whole life: some platforms do not
/// allow moving a device stream across threads.
pub trait OutputStream {
    /// Write one block of interleaved samples, blocking until it is buffered.
    fn write(&mut self, block: &[i16]) -> Result<(), WriteError>;

    /// Let already-buffered audio play out. Called only at natural end of track.
    fn drain(&mut self) {}

    /// Stop and release the stream. Idempotent.
    fn close(&mut self);

    fn interrupter(&self) -> Arc<dyn StreamInterrupt>;
}

/// Something that can open output streams, e.g. the default sound card.
pub trait OutputDevice: Send + Sync {
    fn open(&self, spec: StreamSpec) -> Result<Box<dyn OutputStream>, DeviceError>;
}

impl StreamInterrupt for BlockQueue {
    fn interrupt(&self) {
        self.close();
    }
}

/// CPAL-backed [`OutputDevice`].
#[derive(Clone, Debug)]
pub struct CpalOutput {
    device_name: Option<String>,
    queue_blocks: usize,
    drain_timeout: Duration,
}

impl CpalOutput {
    /// Use the default output device, or the first whose name contains `device_name`.
    pub fn new(device_name: Option<String>, cfg: &EngineConfig) -> Self {
        Self {
            device_name,
            queue_blocks: cfg.queue_blocks,
            drain_timeout: cfg.drain_timeout,
        }
    }
}

impl OutputDevice for CpalOutput {
    fn open(&self, spec: StreamSpec) -> Result<Box<dyn OutputStream>, DeviceError> {
        let host = cpal::default_host();
        let device = device::pick_device(&host, self.device_name.as_deref())?;
        let config = device::pick_output_config(&device, spec.channels, spec.sample_rate)?;
        let mut stream_config: cpal::StreamConfig = config.clone().into();
        if let Some(buf) = device::pick_buffer_size(&config, spec.block_frames) {
            stream_config.buffer_size = buf;
        }

        let queue = Arc::new(BlockQueue::for_blocks(
            spec.channels as usize,
            spec.block_frames,
            self.queue_blocks,
        ));
        let failure = Arc::new(OnceLock::new());
        let stream = build_output_stream(
            &device,
            &stream_config,
            config.sample_format(),
            &queue,
            &failure,
        )?;
        stream
            .play()
            .map_err(|e| DeviceError::Open(format!("start stream: {e}")))?;

        tracing::info!(
            device = %device.description().map(|d| d.to_string()).unwrap_or_default(),
            channels = spec.channels,
            rate_hz = spec.sample_rate,
            sample_format = ?config.sample_format(),
            buffer_size = ?stream_config.buffer_size,
            "output stream opened"
        );

        Ok(Box::new(CpalStream {
            stream: Some(stream),
            queue,
            failure,
            drain_timeout: self.drain_timeout,
        }))
    }
}

struct CpalStream {
    stream: Option<cpal::Stream>,
    queue: Arc<BlockQueue>,
    failure: Arc<OnceLock<String>>,
    drain_timeout: Duration,
}

impl CpalStream {
    fn device_failure(&self) -> Option<WriteError> {
        self.failure.get().map(|msg| WriteError::Device(msg.clone()))
    }
}

impl OutputStream for CpalStream {
    fn write(&mut self, block: &[i16]) -> Result<(), WriteError> {
        if let Some(err) = self.device_failure() {
            return Err(err);
        }
        self.queue
            .push_blocking(block)
            .map_err(|e| self.device_failure().unwrap_or(e))
    }

    fn drain(&mut self) {
        if !self.queue.wait_drained(self.drain_timeout) {
            tracing::debug!(
                remaining_frames = self.queue.len_frames(),
                "output not fully drained"
            );
        }
    }

    fn close(&mut self) {
        self.queue.close();
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                tracing::debug!("pause on close: {e}");
            }
        }
    }

    fn interrupter(&self) -> Arc<dyn StreamInterrupt> {
        self.queue.clone()
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build a CPAL output stream that plays interleaved `i16` from `queue`.
fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    queue: &Arc<BlockQueue>,
    failure: &Arc<OnceLock<String>>,
) -> Result<cpal::Stream, DeviceError> {
    match sample_format {
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, queue, failure),
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, queue, failure),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, queue, failure),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, queue, failure),
        other => Err(DeviceError::Open(format!(
            "unsupported sample format: {other:?}"
        ))),
    }
}

/// Type-specialized stream builder for CPAL sample formats.
///
/// A stream error marks the stream failed and closes the queue so a writer
/// blocked on it wakes up and reports the device error.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<BlockQueue>,
    failure: &Arc<OnceLock<String>>,
) -> Result<cpal::Stream, DeviceError>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let queue_cb = queue.clone();
    let queue_err = queue.clone();
    let failure_cb = failure.clone();
    let mut scratch: Vec<i16> = Vec::new();

    let err_fn = move |err: cpal::StreamError| {
        tracing::warn!("stream error: {err}");
        let _ = failure_cb.set(err.to_string());
        queue_err.close();
    };

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                if scratch.len() < data.len() {
                    scratch.resize(data.len(), 0);
                }
                let filled = queue_cb.pop_into(&mut scratch[..data.len()]);
                for (dst, src) in data.iter_mut().zip(&scratch[..filled]) {
                    *dst = <T as cpal::Sample>::from_sample::<i16>(*src);
                }
                for dst in &mut data[filled..] {
                    *dst = <T as cpal::Sample>::EQUILIBRIUM;
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| DeviceError::Open(format!("build output stream: {e}")))
}
