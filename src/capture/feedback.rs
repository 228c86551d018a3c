//! Best-effort capture acknowledgment pulses.
//!
//! Emits terminal-bell pulses as a tactile stand-in on terminals that
//! support it: a single pulse when recording starts, a triple pulse when a
//! recording finishes. Unsupported or failing terminals are ignored.

use std::io::{self, Write};

const BELL: &[u8] = b"\x07";

/// One short pulse acknowledging a started recording.
pub fn record_started() {
    pulse(1);
}

/// A longer triple pulse acknowledging a finished recording.
pub fn record_finished() {
    pulse(3);
}

fn pulse(count: usize) {
    let mut stdout = io::stdout();
    for _ in 0..count {
        if stdout.write_all(BELL).is_err() {
            return;
        }
    }
    let _ = stdout.flush();
}
