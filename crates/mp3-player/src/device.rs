//! Output device discovery and selection.
//!
//! Thin wrappers around CPAL for:
//! - listing available output devices
//! - selecting either the default device or a device by substring match
//! - choosing a stream config that matches a decoded buffer exactly

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::DeviceError;

/// Pick the first output device whose name contains `needle` (case-insensitive),
/// or the host default device when `needle` is `None`.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device, DeviceError> {
    if let Some(needle) = needle {
        let devices = host
            .output_devices()
            .map_err(|e| DeviceError::Open(format!("enumerate output devices: {e}")))?;
        for d in devices {
            let matched = d
                .description()
                .ok()
                .map(|n| matches_device_name(&n.to_string(), needle))
                .unwrap_or(false);
            if matched {
                return Ok(d);
            }
        }
        return Err(DeviceError::NotFound(needle.to_string()));
    }

    host.default_output_device().ok_or(DeviceError::NoDevice)
}

/// Choose a supported config with exactly `channels` channels at `sample_rate`.
///
/// No resampling or channel mapping happens downstream, so anything else is
/// reported as [`DeviceError::FormatRejected`]. Among matching ranges the
/// sample format closest to the `i16` source wins.
pub fn pick_output_config(
    device: &cpal::Device,
    channels: u16,
    sample_rate: u32,
) -> Result<cpal::SupportedStreamConfig, DeviceError> {
    let ranges = device
        .supported_output_configs()
        .map_err(|e| DeviceError::Open(format!("query output configs: {e}")))?;

    let mut best: Option<(u8, cpal::SupportedStreamConfigRange)> = None;
    for range in ranges {
        if range.channels() != channels {
            continue;
        }
        if sample_rate < range.min_sample_rate() || sample_rate > range.max_sample_rate() {
            continue;
        }
        let rank = sample_format_rank(range.sample_format());
        let replace = best.as_ref().map(|(r, _)| rank < *r).unwrap_or(true);
        if replace {
            best = Some((rank, range));
        }
    }

    best.map(|(_, range)| range.with_sample_rate(sample_rate))
        .ok_or(DeviceError::FormatRejected {
            channels,
            sample_rate,
        })
}

/// Ask for `block_frames` as the device buffer when the device advertises a range.
///
/// Values outside the advertised range are clamped. Returns `None` when the
/// device only supports its default buffer size.
pub fn pick_buffer_size(
    config: &cpal::SupportedStreamConfig,
    block_frames: usize,
) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            let wanted = u32::try_from(block_frames).unwrap_or(u32::MAX);
            Some(cpal::BufferSize::Fixed(clamp_frames(wanted, *min, *max)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Names of the host's output devices, in enumeration order.
pub fn list_devices(host: &cpal::Host) -> Result<Vec<String>, DeviceError> {
    let devices = host
        .output_devices()
        .map_err(|e| DeviceError::Open(format!("enumerate output devices: {e}")))?;
    let mut out = Vec::new();
    for d in devices {
        match d.description() {
            Ok(desc) => out.push(desc.to_string()),
            Err(e) => tracing::debug!("skipping device without description: {e}"),
        }
    }
    Ok(out)
}

fn clamp_frames(wanted: u32, min: u32, max: u32) -> u32 {
    if min > max {
        return min;
    }
    wanted.clamp(min, max)
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::I16 => 0,
        cpal::SampleFormat::F32 => 1,
        cpal::SampleFormat::I32 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&needle.to_lowercase())
}
