//! Persisted report artifact generation.
//!
//! The report is a full-rewrite projection of an event log snapshot into an
//! `.xlsx` worksheet: header row, one data row per projected event, and a
//! solid red fill across every cell of a duplicate row. Rewriting the whole
//! file on each call keeps the artifact a complete, consistent projection of
//! the log at all times; the cost is acceptable at tens of symbols per
//! session and is the documented scaling limit of this design.

use crate::config::{RecordingMode, ReportConfig};
use crate::event_log::ScanEvent;
use crate::ledger::Classification;
use rust_xlsxwriter::{Color, Format, Workbook};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while writing the artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Artifact write failed: {0}")]
    WriteFailed(#[from] rust_xlsxwriter::XlsxError),
}

/// One row of the artifact, projection of one or more events.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub timestamp: String,
    pub frame_number: u64,
    pub qr_content: String,
    pub qr_type: String,
    pub status: Classification,
    pub scan_count: Option<u64>,
    /// Whether the row gets the duplicate fill style
    pub highlighted: bool,
}

/// Project an event snapshot into artifact rows.
///
/// `EveryOccurrence` emits one row per event in log order. `LatestPerPayload`
/// collapses to one row per distinct payload in first-seen order; the row
/// carries the latest observation's timestamp and frame plus the cumulative
/// count, and is highlighted once the payload has been seen more than once.
pub fn project_rows(
    events: &[ScanEvent],
    mode: RecordingMode,
    include_scan_count: bool,
) -> Vec<ReportRow> {
    match mode {
        RecordingMode::EveryOccurrence => events
            .iter()
            .map(|event| ReportRow {
                timestamp: event.formatted_timestamp(),
                frame_number: event.frame_number,
                qr_content: event.payload.clone(),
                qr_type: event.symbol_type.clone(),
                status: event.classification,
                scan_count: if include_scan_count {
                    event.occurrence_count
                } else {
                    None
                },
                highlighted: event.classification == Classification::Duplicate,
            })
            .collect(),

        RecordingMode::LatestPerPayload => {
            let mut rows: Vec<ReportRow> = Vec::new();
            let mut index: HashMap<&str, usize> = HashMap::new();
            let mut counts: HashMap<&str, u64> = HashMap::new();

            for event in events {
                let count = counts.entry(event.payload.as_str()).or_insert(0);
                *count += 1;
                let count = *count;

                match index.get(event.payload.as_str()) {
                    Some(&idx) => {
                        let row = &mut rows[idx];
                        row.timestamp = event.formatted_timestamp();
                        row.frame_number = event.frame_number;
                        row.status = Classification::Duplicate;
                        row.highlighted = true;
                        if include_scan_count {
                            row.scan_count = Some(count);
                        }
                    }
                    None => {
                        index.insert(event.payload.as_str(), rows.len());
                        rows.push(ReportRow {
                            timestamp: event.formatted_timestamp(),
                            frame_number: event.frame_number,
                            qr_content: event.payload.clone(),
                            qr_type: event.symbol_type.clone(),
                            status: Classification::New,
                            scan_count: include_scan_count.then_some(count),
                            highlighted: false,
                        });
                    }
                }
            }

            rows
        }
    }
}

/// Writes the artifact by fully regenerating it from an event snapshot.
pub struct ReportWriter {
    path: PathBuf,
    recording_mode: RecordingMode,
    include_scan_count: bool,
}

impl ReportWriter {
    /// Create a writer from the report configuration.
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            recording_mode: config.recording_mode,
            include_scan_count: config.include_scan_count,
        }
    }

    /// Destination path of the artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Regenerate the artifact from the given snapshot. Overwrite semantics:
    /// the previous file contents are fully replaced. Returns the number of
    /// data rows written.
    pub fn write(&self, events: &[ScanEvent]) -> Result<usize, ReportError> {
        let rows = project_rows(events, self.recording_mode, self.include_scan_count);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        let header_format = Format::new().set_bold();
        let duplicate_format = Format::new().set_background_color(Color::Red);

        let mut headers = vec!["timestamp", "frame_number", "qr_content", "qr_type", "status"];
        if self.include_scan_count {
            headers.push("scan_count");
        }
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            let format = if row.highlighted {
                Some(&duplicate_format)
            } else {
                None
            };

            write_string(worksheet, r, 0, &row.timestamp, format)?;
            write_number(worksheet, r, 1, row.frame_number, format)?;
            write_string(worksheet, r, 2, &row.qr_content, format)?;
            write_string(worksheet, r, 3, &row.qr_type, format)?;
            write_string(worksheet, r, 4, row.status.as_str(), format)?;
            if self.include_scan_count {
                if let Some(count) = row.scan_count {
                    write_number(worksheet, r, 5, count, format)?;
                }
            }
        }

        workbook.save(&self.path)?;

        debug!(
            path = %self.path.display(),
            rows = rows.len(),
            "Artifact regenerated"
        );

        Ok(rows.len())
    }
}

fn write_string(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    col: u16,
    value: &str,
    format: Option<&Format>,
) -> Result<(), ReportError> {
    match format {
        Some(f) => worksheet.write_string_with_format(row, col, value, f)?,
        None => worksheet.write_string(row, col, value)?,
    };
    Ok(())
}

fn write_number(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    col: u16,
    value: u64,
    format: Option<&Format>,
) -> Result<(), ReportError> {
    match format {
        Some(f) => worksheet.write_number_with_format(row, col, value as f64, f)?,
        None => worksheet.write_number(row, col, value as f64)?,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

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

    fn repeat_session_events() -> Vec<ScanEvent> {
        // Frames 1..4 with payloads X, Y, X, X
        vec![
            create_test_event(1, "X", Classification::New, Some(1)),
            create_test_event(2, "Y", Classification::New, Some(1)),
            create_test_event(3, "X", Classification::Duplicate, Some(2)),
            create_test_event(4, "X", Classification::Duplicate, Some(3)),
        ]
    }

    #[test]
    fn test_every_occurrence_all_new() {
        let events = vec![
            create_test_event(1, "A", Classification::New, Some(1)),
            create_test_event(2, "B", Classification::New, Some(1)),
            create_test_event(3, "C", Classification::New, Some(1)),
        ];

        let rows = project_rows(&events, RecordingMode::EveryOccurrence, true);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| !r.highlighted));
        assert!(rows.iter().all(|r| r.status == Classification::New));
        let contents: Vec<&str> = rows.iter().map(|r| r.qr_content.as_str()).collect();
        assert_eq!(contents, ["A", "B", "C"]);
    }

    #[test]
    fn test_every_occurrence_highlights_duplicates() {
        let rows = project_rows(&repeat_session_events(), RecordingMode::EveryOccurrence, true);
        assert_eq!(rows.len(), 4);
        let highlighted: Vec<bool> = rows.iter().map(|r| r.highlighted).collect();
        assert_eq!(highlighted, [false, false, true, true]);
        assert_eq!(rows[2].scan_count, Some(2));
        assert_eq!(rows[3].scan_count, Some(3));
    }

    #[test]
    fn test_every_occurrence_preserves_log_order_and_fields() {
        let events = repeat_session_events();
        let rows = project_rows(&events, RecordingMode::EveryOccurrence, true);
        for (event, row) in events.iter().zip(rows.iter()) {
            assert_eq!(row.frame_number, event.frame_number);
            assert_eq!(row.qr_content, event.payload);
            assert_eq!(row.qr_type, event.symbol_type);
            assert_eq!(row.status, event.classification);
            assert_eq!(row.timestamp, event.formatted_timestamp());
        }
    }

    #[test]
    fn test_scan_count_column_omitted() {
        let rows = project_rows(&repeat_session_events(), RecordingMode::EveryOccurrence, false);
        assert!(rows.iter().all(|r| r.scan_count.is_none()));
    }

    #[test]
    fn test_latest_per_payload_collapses_rows() {
        let rows = project_rows(&repeat_session_events(), RecordingMode::LatestPerPayload, true);

        // One row per distinct payload, first-seen order
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].qr_content, "X");
        assert_eq!(rows[1].qr_content, "Y");

        // X's row carries the latest observation and cumulative count
        assert_eq!(rows[0].frame_number, 4);
        assert_eq!(rows[0].scan_count, Some(3));
        assert_eq!(rows[0].status, Classification::Duplicate);
        assert!(rows[0].highlighted);

        // Y was seen once and stays unhighlighted
        assert_eq!(rows[1].scan_count, Some(1));
        assert_eq!(rows[1].status, Classification::New);
        assert!(!rows[1].highlighted);
    }

    #[test]
    fn test_latest_per_payload_counts_without_event_counts() {
        // Cumulative counts are derived from the snapshot itself, so the
        // projection does not depend on events carrying occurrence_count.
        let events = vec![
            create_test_event(1, "X", Classification::New, None),
            create_test_event(2, "X", Classification::Duplicate, None),
        ];
        let rows = project_rows(&events, RecordingMode::LatestPerPayload, true);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].scan_count, Some(2));
    }

    #[test]
    fn test_write_creates_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let writer = ReportWriter::new(&ReportConfig {
            path: path.to_string_lossy().into_owned(),
            ..ReportConfig::default()
        });

        let rows = writer.write(&repeat_session_events()).unwrap();
        assert_eq!(rows, 4);

        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.len() > 0);
    }

    #[test]
    fn test_write_overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let writer = ReportWriter::new(&ReportConfig {
            path: path.to_string_lossy().into_owned(),
            ..ReportConfig::default()
        });

        writer.write(&repeat_session_events()).unwrap();
        let rows = writer
            .write(&[create_test_event(1, "A", Classification::New, Some(1))])
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_write_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let writer = ReportWriter::new(&ReportConfig {
            path: path.to_string_lossy().into_owned(),
            ..ReportConfig::default()
        });

        // Header-only artifact, still a valid write
        assert_eq!(writer.write(&[]).unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_write_failure_is_an_error_not_a_panic() {
        let writer = ReportWriter::new(&ReportConfig {
            path: "/nonexistent-dir/report.xlsx".to_string(),
            ..ReportConfig::default()
        });
        assert!(writer.write(&repeat_session_events()).is_err());
    }
}
