//! Scan session orchestration.
//!
//! `ScanSession` owns the mutable state of one scanning run (dedup ledger,
//! event log, frame counter, stats) and drives the per-frame
//! decode-classify-record loop against the collaborator traits. The loop is
//! an explicit state machine: `Idle → Running → Stopping → Stopped`. Only
//! acquisition failure and the external stop signal end the loop; decode,
//! report, and alert failures reduce to logged, skipped operations. Cleanup
//! (source release, actuator safe-state, final unconditional report write)
//! runs on every exit path.

use crate::alert::AlertDispatcher;
use crate::config::{DisplayConfig, ReportConfig, ReportTriggerPolicy, ScannerConfig};
use crate::decoder::SymbolDecoder;
use crate::event_log::{EventLog, ScanEvent};
use crate::frame_source::{FrameSource, SourceError};
use crate::ledger::{Classification, DedupLedger};
use crate::overlay::{truncate_label, FrameOverlay, Renderer, SymbolOverlay};
use crate::report::ReportWriter;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that end a session before the loop starts.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Frame source open failed: {0}")]
    SourceOpen(#[from] SourceError),
}

/// Loop states of a session. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Counters for one scanning run.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub symbols_decoded: u64,
    pub decode_errors: u64,
    pub new_payloads: u64,
    pub duplicates: u64,
    pub report_writes: u64,
    pub report_failures: u64,
    pub alert_failures: u64,
}

/// Loop behavior knobs extracted from the service configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// When a frame's decode results trigger a report rewrite
    pub trigger_policy: ReportTriggerPolicy,

    /// Whether events carry the running per-payload count
    pub track_occurrences: bool,

    /// Truncation threshold for overlay labels, in characters
    pub label_max_length: usize,

    /// Minimum delay between frame reads (zero = no pacing)
    pub min_frame_interval: Duration,
}

impl SessionOptions {
    /// Extract loop options from the service configuration.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            trigger_policy: config.report.trigger_policy,
            track_occurrences: config.report.include_scan_count,
            label_max_length: config.display.label_max_length,
            min_frame_interval: config.source.min_frame_interval(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            trigger_policy: ReportTriggerPolicy::default(),
            track_occurrences: ReportConfig::default().include_scan_count,
            label_max_length: DisplayConfig::default().label_max_length,
            min_frame_interval: Duration::ZERO,
        }
    }
}

/// One scanning run: ledger, event log, frame counter, and the loop that
/// feeds them.
pub struct ScanSession {
    options: SessionOptions,
    ledger: DedupLedger,
    log: EventLog,
    frame_number: u64,
    state: LoopState,
    stats: SessionStats,
}

impl ScanSession {
    /// Create an idle session with an empty ledger and log.
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            ledger: DedupLedger::new(),
            log: EventLog::new(),
            frame_number: 0,
            state: LoopState::Idle,
            stats: SessionStats::default(),
        }
    }

    /// Current loop state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> SessionStats {
        self.stats.clone()
    }

    /// The session's event log.
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// The session's dedup ledger.
    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Run the scan loop until the stop flag is set or the source is
    /// exhausted.
    ///
    /// Returns the final stats on a normal run. An open failure is returned
    /// as an error, but cleanup (final report write, actuator safe-state)
    /// still happens before returning.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        decoder: &dyn SymbolDecoder,
        reporter: &ReportWriter,
        alerts: &dyn AlertDispatcher,
        renderer: &mut dyn Renderer,
        stop: &AtomicBool,
    ) -> Result<SessionStats, SessionError> {
        if let Err(e) = source.open() {
            error!(error = %e, "Could not open frame source");
            self.finish(source, reporter, alerts);
            return Err(e.into());
        }
        self.state = LoopState::Running;
        info!(
            trigger_policy = ?self.options.trigger_policy,
            artifact = %reporter.path().display(),
            "Scan session started"
        );

        while self.state == LoopState::Running {
            if stop.load(Ordering::SeqCst) {
                info!("Stop signal received");
                self.state = LoopState::Stopping;
                break;
            }

            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!(frames = self.frame_number, "Frame stream exhausted");
                    self.state = LoopState::Stopping;
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Frame acquisition failed");
                    self.state = LoopState::Stopping;
                    break;
                }
            };

            self.frame_number += 1;
            self.stats.frames_processed += 1;

            let mut overlay = FrameOverlay::default();
            let mut decoded_in_frame = 0usize;
            let mut new_in_frame = 0usize;

            for result in decoder.decode(&frame) {
                match result {
                    Ok(symbol) => {
                        decoded_in_frame += 1;
                        self.stats.symbols_decoded += 1;

                        let (classification, count) = self.ledger.classify(&symbol.payload);
                        match classification {
                            Classification::New => {
                                new_in_frame += 1;
                                self.stats.new_payloads += 1;
                                info!(payload = %symbol.payload, "New QR code detected");
                            }
                            Classification::Duplicate => {
                                self.stats.duplicates += 1;
                                info!(
                                    payload = %symbol.payload,
                                    occurrence = count,
                                    "Duplicate QR code detected"
                                );
                                if let Err(e) = alerts.on_duplicate(&symbol.payload, count) {
                                    self.stats.alert_failures += 1;
                                    warn!(error = %e, "Alert dispatch failed");
                                }
                            }
                        }

                        overlay.symbols.push(SymbolOverlay {
                            label: truncate_label(&symbol.payload, self.options.label_max_length),
                            bounds: symbol.bounds.clone(),
                            duplicate: classification == Classification::Duplicate,
                        });

                        self.log.append(ScanEvent {
                            timestamp: Local::now(),
                            frame_number: self.frame_number,
                            payload: symbol.payload,
                            symbol_type: symbol.symbol_type,
                            classification,
                            occurrence_count: self.options.track_occurrences.then_some(count),
                        });
                    }
                    Err(e) => {
                        self.stats.decode_errors += 1;
                        warn!(
                            frame_number = self.frame_number,
                            error = %e,
                            "Skipping undecodable symbol"
                        );
                    }
                }
            }

            let qualifies = match self.options.trigger_policy {
                ReportTriggerPolicy::AnyDecodedSymbol => decoded_in_frame > 0,
                ReportTriggerPolicy::OnlyNewSymbols => new_in_frame > 0,
            };
            if qualifies {
                self.write_report(reporter);
            }

            overlay.symbols_in_frame = decoded_in_frame;
            overlay.distinct_total = self.ledger.size();
            renderer.render(&frame, &overlay);

            if !self.options.min_frame_interval.is_zero() {
                std::thread::sleep(self.options.min_frame_interval);
            }
        }

        self.finish(source, reporter, alerts);
        Ok(self.stats.clone())
    }

    /// Release resources and perform the final unconditional report write.
    fn finish(
        &mut self,
        source: &mut dyn FrameSource,
        reporter: &ReportWriter,
        alerts: &dyn AlertDispatcher,
    ) {
        self.state = LoopState::Stopping;
        source.release();
        self.write_report(reporter);
        alerts.shutdown();
        self.state = LoopState::Stopped;

        info!(
            frames_processed = self.stats.frames_processed,
            symbols_decoded = self.stats.symbols_decoded,
            new_payloads = self.stats.new_payloads,
            duplicates = self.stats.duplicates,
            decode_errors = self.stats.decode_errors,
            report_writes = self.stats.report_writes,
            report_failures = self.stats.report_failures,
            "Scan session stopped"
        );
    }

    fn write_report(&mut self, reporter: &ReportWriter) {
        match reporter.write(&self.log.snapshot()) {
            Ok(rows) => {
                self.stats.report_writes += 1;
                debug!(rows = rows, "Report written");
            }
            Err(e) => {
                // Non-fatal: the log survives in memory and the next
                // qualifying frame retries a full rewrite.
                self.stats.report_failures += 1;
                warn!(error = %e, "Report write failed");
            }
        }
    }
}
