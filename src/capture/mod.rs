//! Audio capture feature for voicedrop.
//!
//! Provides the recording lifecycle state machine, microphone capture,
//! live frequency analysis, real-time visualization, and user interaction
//! handling for the capture workflow.

pub mod analysis;
pub mod feedback;
pub mod recorder;
pub mod source;
pub mod ui;
pub mod visualizer;

pub use analysis::SpectrumHandle;
pub use recorder::{AudioBlob, Recorder};
pub use source::{CaptureConfig, CaptureSource, CaptureStream, MicSource, SampleSink};
pub use ui::{CaptureCommand, CaptureTui};
pub use visualizer::BarVisualizer;
