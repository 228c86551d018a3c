//! Application command handlers for voicedrop.
//!
//! This module organizes command handling into separate submodules, each responsible for a specific
//! application command (recording, sending, history viewing).
//!
//! # Commands
//! - `record`: Audio capture with visualization and webhook delivery
//! - `send`: Upload an existing audio or image file
//! - `history`: Contribution history listing
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod history;
pub mod list_devices;
pub mod logs;
pub mod record;
pub mod send;

pub use config::handle_config;
pub use history::handle_history;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use record::handle_record;
pub use send::handle_send;
