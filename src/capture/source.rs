//! Microphone capture sources.
//!
//! Defines the capture seam used by the recorder and its production cpal
//! implementation. Audio is captured from a specified or default input
//! device at its native sample rate, converted to mono by averaging
//! channels, and appended to a shared sample sink.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Shared mono PCM sample buffer appended to by the capture callback.
pub type SampleSink = Arc<Mutex<Vec<i16>>>;

/// Requested capture constraints.
///
/// Echo cancellation and noise suppression are requested from the platform
/// input pipeline; backends honor them best-effort. The actual sample rate
/// may differ from the requested one based on device capabilities.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Device name, numeric index, or "default"
    pub device: String,
    /// Requested sample rate in Hz
    pub sample_rate: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            sample_rate: 44100,
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

/// A source of capture streams (the acquisition side of the seam).
pub trait CaptureSource {
    /// Acquires the input device and starts delivering mono samples into `sink`.
    ///
    /// # Errors
    /// - If permission is denied, no device is available, or the device
    ///   configuration cannot be satisfied. No resources remain acquired
    ///   on error.
    fn open(&self, config: &CaptureConfig, sink: SampleSink) -> Result<Box<dyn CaptureStream>>;
}

/// A live capture stream whose lifetime bounds the hardware acquisition.
pub trait CaptureStream {
    /// The actual sample rate samples are delivered at.
    fn sample_rate(&self) -> u32;

    /// Stops the stream and releases the device. Idempotent.
    fn stop(&mut self);

    /// Whether the stream has been stopped.
    fn is_stopped(&self) -> bool;
}

/// Production capture source backed by cpal.
pub struct MicSource;

impl CaptureSource for MicSource {
    fn open(&self, config: &CaptureConfig, sink: SampleSink) -> Result<Box<dyn CaptureStream>> {
        // Get device while suppressing ALSA library warnings
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if config.device == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &config.device)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Capture device: {}", device_name);

        let device_config = device.default_input_config()?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        // Warn if requested sample rate doesn't match device
        if device_sample_rate != config.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Capturing at device rate.",
                config.sample_rate,
                device_sample_rate
            );
        }

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, echo_cancellation={}, noise_suppression={}",
            device_sample_rate,
            num_channels,
            config.echo_cancellation,
            config.noise_suppression
        );

        let stream = device.build_input_stream(
            &device_config.into(),
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                append_mono(data, &sink, num_channels);
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        tracing::debug!("Audio stream started");

        Ok(Box::new(MicStream {
            stream: Some(stream),
            sample_rate: device_sample_rate,
        }))
    }
}

/// A live cpal input stream. Dropping the inner stream stops the device.
struct MicStream {
    stream: Option<cpal::Stream>,
    sample_rate: u32,
}

impl CaptureStream for MicStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Audio stream stopped");
        }
    }

    fn is_stopped(&self) -> bool {
        self.stream.is_none()
    }
}

impl Drop for MicStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Appends incoming audio data to the sink, converting multi-channel
/// audio to mono by averaging all channels.
fn append_mono(data: &[i16], sink: &SampleSink, num_channels: usize) {
    let mut samples = sink.lock().unwrap();

    match num_channels {
        1 => {
            // Mono: use samples directly
            samples.extend_from_slice(data);
        }
        2 => {
            // Stereo: average pairs of samples
            for chunk in data.chunks_exact(2) {
                let left = chunk[0] as i32;
                let right = chunk[1] as i32;
                let mono = ((left + right) / 2) as i16;
                samples.push(mono);
            }
        }
        _ => {
            // Multi-channel: average all channels per sample
            for chunk in data.chunks_exact(num_channels) {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                let mono = (sum / num_channels as i32) as i16;
                samples.push(mono);
            }
        }
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Arguments
/// * `host` - The cpal audio host
/// * `device_spec` - Either "default" for system default, a device name, or a numeric index (0, 1, 2, etc.)
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    // Try to parse as a numeric index first
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();

        if index < devices.len() {
            return Ok(devices.into_iter().nth(index).unwrap());
        } else {
            return Err(anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                devices.len().saturating_sub(1)
            ));
        }
    }

    // Try to find by name
    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'voicedrop list-devices' to see available devices."
    ))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    // Open /dev/null for writing
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    // Save the current stderr file descriptor
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    // Redirect stderr to /dev/null
    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    // Execute the closure
    let result = f();

    // Restore the original stderr
    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms, no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
