//! Recording lifecycle state machine.
//!
//! The [`Recorder`] owns the capture stream, the encoding engine, and the
//! duration timer for one session at a time. Acquisition failures land in
//! an observable error field rather than propagating to the caller, and
//! every exit path (normal stop, acquisition error, drop) releases the
//! capture stream, invalidates the analysis handle, and cancels timers.

use anyhow::Result;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::analysis::SpectrumHandle;
use super::feedback;
use super::source::{CaptureConfig, CaptureSource, CaptureStream, MicSource, SampleSink};

/// Cadence at which the encoding engine appends a chunk.
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Cadence of the duration timer. Elapsed time is computed from the
/// captured start instant, not from tick count, so ticks never drift.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// The fixed container/codec pair every recording is tagged with.
pub const WAV_MIME: &str = "audio/wav";

/// A finished recording: WAV-containered mono PCM.
#[derive(Debug, Clone)]
pub struct AudioBlob {
    pub data: Vec<u8>,
    pub mime: &'static str,
    pub sample_rate: u32,
    pub duration_secs: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecorderState {
    Idle,
    Acquiring,
    Recording,
    Finalizing,
}

/// Resources owned by one active session, torn down as a unit.
struct Session {
    stream: Box<dyn CaptureStream>,
    analysis: Arc<SpectrumHandle>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    elapsed: Arc<AtomicU64>,
    sample_rate: u32,
    chunker: JoinHandle<()>,
    ticker: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

/// Manages the full lifecycle of one audio capture at a time.
///
/// At most one session is active; `start()` while a session is live is a
/// no-op. The analysis handle it exposes is valid exactly while the
/// session is recording.
pub struct Recorder {
    config: CaptureConfig,
    source: Box<dyn CaptureSource>,
    state: RecorderState,
    session: Option<Session>,
    last_error: Option<String>,
}

impl Recorder {
    /// Creates a recorder capturing from the system microphone.
    pub fn new(config: CaptureConfig) -> Self {
        Self::with_source(config, Box::new(MicSource))
    }

    /// Creates a recorder over an arbitrary capture source.
    pub fn with_source(config: CaptureConfig, source: Box<dyn CaptureSource>) -> Self {
        Self {
            config,
            source,
            state: RecorderState::Idle,
            session: None,
            last_error: None,
        }
    }

    /// Starts a new recording session.
    ///
    /// Acquires the capture device, exposes a live analysis handle, and
    /// begins appending chunks and duration ticks. Acquisition failures do
    /// not propagate: they release any partially acquired resources and
    /// set [`Recorder::last_error`]. Calling `start()` while a session is
    /// already active is a no-op.
    pub async fn start(&mut self) {
        if self.state != RecorderState::Idle {
            tracing::debug!("start() ignored: a recording session is already active");
            return;
        }

        self.last_error = None;
        self.state = RecorderState::Acquiring;

        let samples: SampleSink = Arc::new(Mutex::new(Vec::new()));
        let stream = match self.source.open(&self.config, Arc::clone(&samples)) {
            Ok(stream) => stream,
            Err(e) => {
                // The source releases anything it acquired before failing.
                self.state = RecorderState::Idle;
                let message = format!("Could not access the microphone: {e}");
                tracing::error!("{message}");
                self.last_error = Some(message);
                return;
            }
        };

        let sample_rate = stream.sample_rate();
        let analysis = Arc::new(SpectrumHandle::new(Arc::clone(&samples), sample_rate));
        let chunks: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let elapsed = Arc::new(AtomicU64::new(0));

        let (stop_tx, stop_rx) = watch::channel(false);
        let chunker = tokio::spawn(run_chunker(
            Arc::clone(&samples),
            Arc::clone(&chunks),
            stop_rx,
        ));

        let started_at = Instant::now();
        let elapsed_for_ticker = Arc::clone(&elapsed);
        let ticker = tokio::spawn(async move {
            let mut tick = tokio::time::interval(TICK_INTERVAL);
            loop {
                tick.tick().await;
                elapsed_for_ticker.store(started_at.elapsed().as_secs(), Ordering::Relaxed);
            }
        });

        self.session = Some(Session {
            stream,
            analysis,
            chunks,
            elapsed,
            sample_rate,
            chunker,
            ticker,
            stop_tx,
        });
        self.state = RecorderState::Recording;

        feedback::record_started();
        tracing::info!("Recording started at {sample_rate}Hz");
    }

    /// Stops the active session and returns the finished recording.
    ///
    /// Signals the encoding engine, awaits its final-flush confirmation,
    /// concatenates the accumulated chunks into one WAV-tagged blob, and
    /// releases all capture resources. Returns `None` when there is no
    /// active session, when no audio was captured, or when finalization
    /// fails (resources are released either way).
    pub async fn stop(&mut self) -> Option<AudioBlob> {
        if self.state != RecorderState::Recording {
            tracing::debug!("stop() with no active session");
            return None;
        }

        let mut session = self.session.take().expect("recording state holds a session");

        // Invalidate the handle before the first await point so no caller
        // can observe an inactive recorder still holding a live handle.
        session.analysis.invalidate();
        self.state = RecorderState::Finalizing;

        let _ = session.stop_tx.send(true);
        if let Err(e) = (&mut session.chunker).await {
            tracing::warn!("Chunker task ended abnormally: {e}");
        }

        session.ticker.abort();
        session.stream.stop();

        let chunks = mem::take(&mut *session.chunks.lock().unwrap());
        let sample_rate = session.sample_rate;
        drop(session);
        self.state = RecorderState::Idle;

        match finalize_wav(&chunks, sample_rate) {
            Ok(Some(blob)) => {
                feedback::record_finished();
                tracing::info!(
                    "Recording finalized: {:.2}s ({} bytes, {})",
                    blob.duration_secs,
                    blob.data.len(),
                    blob.mime
                );
                Some(blob)
            }
            Ok(None) => {
                tracing::warn!("Recording stopped with no audio captured");
                None
            }
            Err(e) => {
                let message = format!("Failed to finalize recording: {e}");
                tracing::error!("{message}");
                self.last_error = Some(message);
                None
            }
        }
    }

    /// True between a successful `start()` and the matching `stop()`.
    pub fn is_active(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Whole seconds elapsed in the current session, 0 when idle.
    pub fn elapsed_seconds(&self) -> u64 {
        match self.state {
            RecorderState::Recording => self
                .session
                .as_ref()
                .map(|s| s.elapsed.load(Ordering::Relaxed))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// The live analysis handle; `Some` exactly while recording.
    pub fn analysis_handle(&self) -> Option<Arc<SpectrumHandle>> {
        match self.state {
            RecorderState::Recording => {
                self.session.as_ref().map(|s| Arc::clone(&s.analysis))
            }
            _ => None,
        }
    }

    /// The most recent acquisition or finalization failure, if any.
    /// Cleared on every new `start()` attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Releases everything without awaiting the final flush. Idempotent.
    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.analysis.invalidate();
            session.chunker.abort();
            session.ticker.abort();
            session.stream.stop();
            tracing::debug!("Recorder torn down with an active session");
        }
        self.state = RecorderState::Idle;
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// The encoding engine: drains newly captured samples into a PCM chunk on
/// a fixed cadence, flushing the remainder once stop is signaled.
async fn run_chunker(
    samples: SampleSink,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut cursor = 0usize;
    let mut tick = tokio::time::interval(CHUNK_INTERVAL);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                cursor = drain_chunk(&samples, &chunks, cursor);
            }
            _ = stop_rx.changed() => {
                drain_chunk(&samples, &chunks, cursor);
                break;
            }
        }
    }
}

/// Encodes samples past `cursor` as one little-endian PCM chunk.
fn drain_chunk(
    samples: &SampleSink,
    chunks: &Arc<Mutex<Vec<Vec<u8>>>>,
    cursor: usize,
) -> usize {
    let samples = samples.lock().unwrap();
    if samples.len() <= cursor {
        return cursor;
    }

    let chunk: Vec<u8> = samples[cursor..]
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();
    chunks.lock().unwrap().push(chunk);
    samples.len()
}

/// Concatenates PCM chunks into a single WAV-containered blob.
///
/// Returns `Ok(None)` when no audio was captured.
fn finalize_wav(chunks: &[Vec<u8>], sample_rate: u32) -> Result<Option<AudioBlob>> {
    let total_bytes: usize = chunks.iter().map(|c| c.len()).sum();
    if total_bytes == 0 {
        return Ok(None);
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::with_capacity(total_bytes + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for chunk in chunks {
            for frame in chunk.chunks_exact(2) {
                writer.write_sample(i16::from_le_bytes([frame[0], frame[1]]))?;
            }
        }
        writer.finalize()?;
    }

    let sample_count = total_bytes / 2;
    Ok(Some(AudioBlob {
        data: cursor.into_inner(),
        mime: WAV_MIME,
        sample_rate,
        duration_secs: sample_count as f32 / sample_rate as f32,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_concatenates_chunks_in_order() {
        let first: Vec<u8> = [100i16, 200].iter().flat_map(|s| s.to_le_bytes()).collect();
        let second: Vec<u8> = [300i16].iter().flat_map(|s| s.to_le_bytes()).collect();

        let blob = finalize_wav(&[first, second], 44100).unwrap().unwrap();
        assert_eq!(blob.mime, WAV_MIME);
        assert_eq!(blob.sample_rate, 44100);

        let reader = hound::WavReader::new(std::io::Cursor::new(blob.data)).unwrap();
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![100, 200, 300]);
    }

    #[test]
    fn finalize_with_no_audio_yields_none() {
        assert!(finalize_wav(&[], 44100).unwrap().is_none());
        assert!(finalize_wav(&[Vec::new()], 44100).unwrap().is_none());
    }

    #[test]
    fn blob_duration_follows_sample_count() {
        let chunk: Vec<u8> = vec![0u8; 44100 * 2];
        let blob = finalize_wav(&[chunk], 44100).unwrap().unwrap();
        assert!((blob.duration_secs - 1.0).abs() < f32::EPSILON);
    }
}
