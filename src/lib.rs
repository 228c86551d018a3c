pub mod app;
pub mod capture;
pub mod commands;
pub mod config;
pub mod history;
pub mod logging;
pub mod ui;
pub mod upload;

pub use capture::{
    AudioBlob, BarVisualizer, CaptureConfig, CaptureSource, CaptureStream, Recorder,
    SpectrumHandle,
};
pub use config::VoicedropConfig;
pub use history::HistoryStore;
pub use upload::{FileCategory, UploadMetadata, WebhookClient};
