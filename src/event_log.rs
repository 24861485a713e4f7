//! Append-only scan event log.
//!
//! One `ScanEvent` per decoded symbol observation, in observation order. The
//! log only grows during a run; events are immutable once appended. The
//! persisted report is always a projection of a `snapshot()` of this log,
//! never an incrementally maintained copy that could drift from it.

use crate::ledger::Classification;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;

/// Timestamp column format used in the persisted artifact.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One decoded symbol observation.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEvent {
    /// Wall-clock instant of the observation
    pub timestamp: DateTime<Local>,

    /// 1-based counter of processed frames; increments once per frame
    /// regardless of decode outcome
    pub frame_number: u64,

    /// Decoded text content, the deduplication key
    pub payload: String,

    /// Decoder-reported symbol format tag
    pub symbol_type: String,

    /// New or duplicate, as classified by the ledger
    pub classification: Classification,

    /// Running count of observations of this payload including this one;
    /// populated only when the report carries a scan_count column
    pub occurrence_count: Option<u64>,
}

impl ScanEvent {
    /// Timestamp rendered for the artifact's timestamp column.
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Ordered, append-only sequence of scan events.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ScanEvent>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the end of the log. Never fails; growth is bounded
    /// only by run duration, an accepted tradeoff for short sessions.
    pub fn append(&self, event: ScanEvent) {
        self.events.lock().push(event);
    }

    /// Full copy of the current sequence, reflecting every append completed
    /// before the call. Mutually exclusive with `append`, so a snapshot
    /// never observes a partially appended event.
    pub fn snapshot(&self) -> Vec<ScanEvent> {
        self.events.lock().clone()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether any events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_event(
        frame_number: u64,
        payload: &str,
        classification: Classification,
        occurrence_count: Option<u64>,
    ) -> ScanEvent {
        ScanEvent {
            timestamp: Local::now(),
            frame_number,
            payload: payload.to_string(),
            symbol_type: "QRCODE".to_string(),
            classification,
            occurrence_count,
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let log = EventLog::new();
        log.append(create_test_event(1, "A", Classification::New, None));
        log.append(create_test_event(2, "B", Classification::New, None));
        log.append(create_test_event(3, "A", Classification::Duplicate, None));

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 3);
        let payloads: Vec<&str> = snapshot.iter().map(|e| e.payload.as_str()).collect();
        assert_eq!(payloads, ["A", "B", "A"]);
        assert_eq!(snapshot[2].classification, Classification::Duplicate);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let log = EventLog::new();
        log.append(create_test_event(1, "A", Classification::New, None));

        let snapshot = log.snapshot();
        log.append(create_test_event(2, "B", Classification::New, None));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_empty_log() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_timestamp_formatting() {
        let event = create_test_event(1, "A", Classification::New, None);
        let rendered = event.formatted_timestamp();
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(rendered.len(), 19);
        assert_eq!(rendered.as_bytes()[4], b'-');
        assert_eq!(rendered.as_bytes()[10], b' ');
        assert_eq!(rendered.as_bytes()[13], b':');
    }
}
