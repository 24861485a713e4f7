//! Duplicate detection ledger.
//!
//! The ledger is the sole source of truth for "have we seen this payload
//! before" within a run. It maps payload text to an observation count, grows
//! monotonically, and is discarded at process exit — there is no eviction and
//! no cross-run memory.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Verdict for a classified payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    New,
    Duplicate,
}

impl Classification {
    /// Column value used in the persisted artifact.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::New => "new",
            Classification::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload → observation count, write-once-per-key, increment-thereafter.
#[derive(Debug, Default)]
pub struct DedupLedger {
    counts: Mutex<HashMap<String, u64>>,
}

impl DedupLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a payload and return its running observation count,
    /// including the current observation.
    ///
    /// The lookup-insert-or-increment is a single step under the lock, so at
    /// most one `New` is ever returned per distinct payload per run even if
    /// classification is driven from more than one thread.
    pub fn classify(&self, payload: &str) -> (Classification, u64) {
        let mut counts = self.counts.lock();
        match counts.get_mut(payload) {
            Some(count) => {
                *count += 1;
                (Classification::Duplicate, *count)
            }
            None => {
                counts.insert(payload.to_string(), 1);
                (Classification::New, 1)
            }
        }
    }

    /// Number of distinct payloads observed so far.
    pub fn size(&self) -> usize {
        self.counts.lock().len()
    }

    /// Observation count for a payload, if it has been seen.
    pub fn count(&self, payload: &str) -> Option<u64> {
        self.counts.lock().get(payload).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_is_new() {
        let ledger = DedupLedger::new();
        assert_eq!(ledger.classify("A"), (Classification::New, 1));
        assert_eq!(ledger.size(), 1);
    }

    #[test]
    fn test_repeats_are_duplicates_with_running_count() {
        let ledger = DedupLedger::new();
        ledger.classify("X");
        assert_eq!(ledger.classify("X"), (Classification::Duplicate, 2));
        assert_eq!(ledger.classify("X"), (Classification::Duplicate, 3));
        assert_eq!(ledger.count("X"), Some(3));
        assert_eq!(ledger.size(), 1);
    }

    #[test]
    fn test_classification_sequence_property() {
        // First occurrence of each distinct payload is New, every later
        // occurrence Duplicate; size equals the distinct count.
        let ledger = DedupLedger::new();
        let sequence = ["X", "Y", "X", "Z", "Y", "X"];
        let mut seen: Vec<&str> = Vec::new();

        for payload in sequence {
            let (classification, _) = ledger.classify(payload);
            if seen.contains(&payload) {
                assert_eq!(classification, Classification::Duplicate, "{payload}");
            } else {
                assert_eq!(classification, Classification::New, "{payload}");
                seen.push(payload);
            }
        }

        assert_eq!(ledger.size(), 3);
    }

    #[test]
    fn test_unseen_payload_has_no_count() {
        let ledger = DedupLedger::new();
        assert_eq!(ledger.count("missing"), None);
        assert_eq!(ledger.size(), 0);
    }

    #[test]
    fn test_concurrent_classification_single_new() {
        use std::sync::Arc;

        let ledger = Arc::new(DedupLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.classify("shared"))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let new_count = results
            .iter()
            .filter(|(c, _)| *c == Classification::New)
            .count();

        assert_eq!(new_count, 1);
        assert_eq!(ledger.count("shared"), Some(8));
    }
}
