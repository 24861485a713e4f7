//! Duplicate alert dispatch.
//!
//! The session fires `on_duplicate` inline with frame processing whenever the
//! ledger classifies a repeat, so implementations must return quickly.
//! Dispatch failures are non-fatal; the session logs and moves on.

use std::io::Write;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur during alert dispatch.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Alert dispatch failed: {0}")]
    DispatchFailed(String),
}

/// External signal driven when a duplicate payload is classified.
pub trait AlertDispatcher {
    /// Fire-and-forget duplicate notification. Must not block beyond a
    /// bounded short duration.
    fn on_duplicate(&self, payload: &str, occurrence: u64) -> Result<(), AlertError>;

    /// Return the actuator to its safe/off state. Called during session
    /// cleanup on every exit path.
    fn shutdown(&self) {}
}

/// Alert implementation that rings the terminal bell and logs a warning.
pub struct ConsoleAlert;

impl ConsoleAlert {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleAlert {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertDispatcher for ConsoleAlert {
    fn on_duplicate(&self, payload: &str, occurrence: u64) -> Result<(), AlertError> {
        warn!(payload = %payload, occurrence = occurrence, "Duplicate QR code detected");

        let mut stdout = std::io::stdout();
        stdout
            .write_all(b"\x07")
            .and_then(|_| stdout.flush())
            .map_err(|e| AlertError::DispatchFailed(e.to_string()))
    }
}

/// Dispatcher used when alerts are disabled.
pub struct NullAlert;

impl AlertDispatcher for NullAlert {
    fn on_duplicate(&self, _payload: &str, _occurrence: u64) -> Result<(), AlertError> {
        Ok(())
    }
}
