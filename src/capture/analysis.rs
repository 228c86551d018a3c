//! Live frequency analysis over the capture sample stream.
//!
//! A [`SpectrumHandle`] is a read-only view of the most recent audio,
//! handed out by the recorder for the duration of one session. It computes
//! a fixed-size FFT over the latest sample window on demand and reports
//! per-bin magnitudes as bytes. The handle is a capability: once the
//! session ends it is invalidated and every subsequent read returns `None`.

use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::source::SampleSink;

/// Fixed analysis transform size.
pub const FFT_SIZE: usize = 256;

/// Number of frequency bins in one snapshot.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// Magnitudes below this level render as zero.
const FLOOR_DB: f32 = -60.0;

/// Live read-only frequency-domain view of an active recording session.
pub struct SpectrumHandle {
    samples: SampleSink,
    sample_rate: u32,
    valid: AtomicBool,
    fft_planner: Mutex<FftPlanner<f32>>,
}

impl SpectrumHandle {
    pub(crate) fn new(samples: SampleSink, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            valid: AtomicBool::new(true),
            fft_planner: Mutex::new(FftPlanner::new()),
        }
    }

    /// Whether this handle still belongs to a live session.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Severs the handle from the session. All later reads return `None`.
    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bin_count(&self) -> usize {
        BIN_COUNT
    }

    /// Computes the latest frequency-magnitude snapshot.
    ///
    /// Returns [`BIN_COUNT`] magnitudes in the range 0-255, or `None` once
    /// the handle has been invalidated. The snapshot covers the most recent
    /// [`FFT_SIZE`] samples, zero-padded when fewer have arrived.
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        if !self.is_valid() {
            return None;
        }

        let window: Vec<i16> = {
            let samples = self.samples.lock().unwrap();
            let start = samples.len().saturating_sub(FFT_SIZE);
            samples[start..].to_vec()
        };

        Some(magnitudes(&window, &mut self.fft_planner.lock().unwrap()))
    }
}

/// Computes byte magnitudes for one window of samples.
///
/// A Hann window is applied to reduce spectral leakage, then each bin's
/// magnitude is normalized against full scale and mapped from the
/// `FLOOR_DB..0` dB range onto 0-255.
fn magnitudes(window: &[i16], fft_planner: &mut FftPlanner<f32>) -> Vec<u8> {
    let count = window.len().min(FFT_SIZE);

    let mut buffer: Vec<Complex<f32>> = window[window.len() - count..]
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let hann =
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32).cos());
            Complex::new(s as f32 * hann / 32768.0, 0.0)
        })
        .collect();

    buffer.resize(FFT_SIZE, Complex::new(0.0, 0.0));

    let fft = fft_planner.plan_fft_forward(FFT_SIZE);
    fft.process(&mut buffer);

    // Full-scale reference: a 0 dBFS sine under the Hann window peaks at
    // amplitude * N/2 * 0.5 = N/4.
    let full_scale = FFT_SIZE as f32 / 4.0;

    buffer[..BIN_COUNT]
        .iter()
        .map(|bin| {
            let normalized = bin.norm() / full_scale;
            let db = if normalized > 1e-10 {
                20.0 * normalized.log10()
            } else {
                FLOOR_DB * 2.0
            };
            (((db - FLOOR_DB) / -FLOOR_DB) * 255.0).clamp(0.0, 255.0) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn handle_over(samples: Vec<i16>, sample_rate: u32) -> SpectrumHandle {
        SpectrumHandle::new(Arc::new(Mutex::new(samples)), sample_rate)
    }

    #[test]
    fn silence_yields_all_zero_bins() {
        let handle = handle_over(vec![0i16; 4096], 44100);
        let bins = handle.snapshot().unwrap();
        assert_eq!(bins.len(), BIN_COUNT);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let sample_rate = 44100u32;
        // Place the tone exactly on bin 4 so leakage stays local.
        let freq = 4.0 * sample_rate as f32 / FFT_SIZE as f32;
        let samples: Vec<i16> = (0..4096)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (0.9 * 32767.0 * (2.0 * std::f32::consts::PI * freq * t).sin()) as i16
            })
            .collect();

        let handle = handle_over(samples, sample_rate);
        let bins = handle.snapshot().unwrap();

        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        assert!((3..=5).contains(&peak), "peak at bin {peak}, expected ~4");
        assert!(bins[peak] > 200, "peak magnitude {} too low", bins[peak]);
    }

    #[test]
    fn short_windows_are_zero_padded() {
        let handle = handle_over(vec![1000i16; 10], 44100);
        let bins = handle.snapshot().unwrap();
        assert_eq!(bins.len(), BIN_COUNT);
    }

    #[test]
    fn invalidated_handle_stops_reading() {
        let handle = handle_over(vec![1000i16; 512], 44100);
        assert!(handle.is_valid());
        assert!(handle.snapshot().is_some());

        handle.invalidate();
        assert!(!handle.is_valid());
        assert!(handle.snapshot().is_none());
    }
}
