//! QRLedger Scan Service
//!
//! Continuously decodes QR codes from a frame stream, classifies each
//! payload as first-seen or repeat, and persists a timestamped,
//! frame-indexed audit log as an `.xlsx` artifact with duplicate rows
//! highlighted.
//!
//! ## Architecture
//!
//! ```text
//! FrameSource ──▶ ScanSession ──▶ SymbolDecoder
//!                     │
//!          ┌──────────┼───────────┐
//!          ▼          ▼           ▼
//!     DedupLedger  EventLog  AlertDispatcher
//!                     │
//!                     ▼
//!               ReportWriter ──▶ report.xlsx
//! ```
//!
//! The session owns the dedup ledger, event log, and frame counter; every
//! collaborator (frame acquisition, symbol decoding, alerting, rendering)
//! sits behind a trait. The persisted report is always a full-rewrite
//! projection of an event log snapshot, so it can never drift from the log.

pub mod alert;
pub mod config;
pub mod decoder;
pub mod event_log;
pub mod frame_source;
pub mod ledger;
pub mod overlay;
pub mod report;
pub mod session;

pub use alert::{AlertDispatcher, ConsoleAlert, NullAlert};
pub use config::{RecordingMode, ReportTriggerPolicy, ScannerConfig};
pub use decoder::{DecodedSymbol, RqrrDecoder, SymbolDecoder};
pub use event_log::{EventLog, ScanEvent};
pub use frame_source::{Frame, FrameSource, ImageDirSource};
pub use ledger::{Classification, DedupLedger};
pub use overlay::{FrameOverlay, Renderer, TraceRenderer};
pub use report::{project_rows, ReportRow, ReportWriter};
pub use session::{LoopState, ScanSession, SessionOptions, SessionStats};
