//! Recording lifecycle tests over a synthetic capture source.
//!
//! Drives the recorder state machine without hardware: the synthetic
//! source delivers one second of a 440 Hz tone on open and tracks whether
//! its stream was stopped, while tokio's paused clock stands in for wall
//! time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use voicedrop::capture::{CaptureConfig, CaptureSource, CaptureStream, Recorder, SampleSink};

const SAMPLE_RATE: u32 = 44100;

struct SyntheticSource {
    fail: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
}

impl SyntheticSource {
    fn new() -> Self {
        Self {
            fail: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        let source = Self::new();
        source.fail.store(true, Ordering::SeqCst);
        source
    }
}

impl CaptureSource for SyntheticSource {
    fn open(
        &self,
        _config: &CaptureConfig,
        sink: SampleSink,
    ) -> anyhow::Result<Box<dyn CaptureStream>> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("Permission denied");
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.stopped.store(false, Ordering::SeqCst);

        // One second of a 440 Hz tone, available immediately.
        let samples: Vec<i16> = (0..SAMPLE_RATE)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                (0.5 * 32767.0 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()) as i16
            })
            .collect();
        sink.lock().unwrap().extend_from_slice(&samples);

        Ok(Box::new(SyntheticStream {
            stopped: Arc::clone(&self.stopped),
        }))
    }
}

struct SyntheticStream {
    stopped: Arc<AtomicBool>,
}

impl CaptureStream for SyntheticStream {
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn recorder_over(source: SyntheticSource) -> Recorder {
    Recorder::with_source(CaptureConfig::default(), Box::new(source))
}

/// Lets spawned session tasks (chunker, ticker) catch up with the clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn finished_session_produces_tagged_blob() {
    let source = SyntheticSource::new();
    let stopped = Arc::clone(&source.stopped);
    let mut recorder = recorder_over(source);

    recorder.start().await;
    assert!(recorder.is_active());
    assert!(recorder.last_error().is_none());
    assert!(recorder.analysis_handle().is_some());
    assert_eq!(recorder.elapsed_seconds(), 0);

    tokio::time::advance(Duration::from_secs(3)).await;
    settle().await;
    assert_eq!(recorder.elapsed_seconds(), 3);

    let blob = recorder.stop().await.expect("expected a finished recording");
    assert_eq!(blob.mime, "audio/wav");
    assert_eq!(blob.sample_rate, SAMPLE_RATE);
    assert!((blob.duration_secs - 1.0).abs() < 0.01);
    assert!(blob.data.len() > 44);

    assert!(!recorder.is_active());
    assert!(recorder.analysis_handle().is_none());
    assert!(stopped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn elapsed_is_monotonic_and_resets_per_episode() {
    let mut recorder = recorder_over(SyntheticSource::new());

    recorder.start().await;
    let mut previous = recorder.elapsed_seconds();
    for _ in 0..4 {
        tokio::time::advance(Duration::from_millis(700)).await;
        settle().await;
        let now = recorder.elapsed_seconds();
        assert!(now >= previous);
        previous = now;
    }
    assert_eq!(previous, 2);

    let _ = recorder.stop().await;
    assert_eq!(recorder.elapsed_seconds(), 0);

    recorder.start().await;
    assert_eq!(recorder.elapsed_seconds(), 0);
    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(recorder.elapsed_seconds(), 1);
}

#[tokio::test(start_paused = true)]
async fn denied_acquisition_lands_in_last_error() {
    let source = SyntheticSource::failing();
    let fail = Arc::clone(&source.fail);
    let mut recorder = recorder_over(source);

    recorder.start().await;
    assert!(!recorder.is_active());
    assert!(recorder.analysis_handle().is_none());
    let message = recorder.last_error().expect("acquisition error recorded");
    assert!(!message.is_empty());

    // Nothing to stop after a failed acquisition
    assert!(recorder.stop().await.is_none());

    // The error is recoverable: the next start attempt clears it
    fail.store(false, Ordering::SeqCst);
    recorder.start().await;
    assert!(recorder.is_active());
    assert!(recorder.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn stop_without_session_is_a_no_op() {
    let source = SyntheticSource::new();
    let stopped = Arc::clone(&source.stopped);
    let opens = Arc::clone(&source.opens);
    let mut recorder = recorder_over(source);

    assert!(recorder.stop().await.is_none());
    assert!(recorder.stop().await.is_none());
    assert!(recorder.last_error().is_none());
    assert_eq!(opens.load(Ordering::SeqCst), 0);
    assert!(!stopped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn second_start_does_not_acquire_twice() {
    let source = SyntheticSource::new();
    let opens = Arc::clone(&source.opens);
    let mut recorder = recorder_over(source);

    recorder.start().await;
    let first_handle = recorder.analysis_handle().expect("live handle");

    recorder.start().await;
    assert!(recorder.is_active());
    assert!(recorder.last_error().is_none());
    assert_eq!(opens.load(Ordering::SeqCst), 1);

    // Still the same session and the same handle
    let second_handle = recorder.analysis_handle().expect("live handle");
    assert!(Arc::ptr_eq(&first_handle, &second_handle));
}

#[tokio::test(start_paused = true)]
async fn handle_is_live_exactly_while_active() {
    let mut recorder = recorder_over(SyntheticSource::new());

    assert!(recorder.analysis_handle().is_none());

    recorder.start().await;
    let handle = recorder.analysis_handle().expect("live handle");
    assert!(handle.is_valid());
    assert!(handle.snapshot().is_some());

    let _ = recorder.stop().await;
    assert!(recorder.analysis_handle().is_none());
    // A holder of the old handle cannot read stale data
    assert!(!handle.is_valid());
    assert!(handle.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_mid_recording_releases_everything() {
    let source = SyntheticSource::new();
    let stopped = Arc::clone(&source.stopped);

    let handle = {
        let mut recorder = recorder_over(source);
        recorder.start().await;
        recorder.analysis_handle().expect("live handle")
        // recorder dropped here without stop()
    };

    assert!(stopped.load(Ordering::SeqCst));
    assert!(!handle.is_valid());
    assert!(handle.snapshot().is_none());
}
