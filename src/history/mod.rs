//! Contribution history for voicedrop.
//!
//! Tracks every recording and attachment together with its webhook
//! delivery status.

pub mod storage;

pub use storage::{Contribution, HistoryStore, UploadStatus};
