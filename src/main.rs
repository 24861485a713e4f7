//! QR Scan Service binary.
//!
//! Wires the configured frame source, decoder, report writer, and alert
//! dispatcher into a scan session and runs it until Ctrl-C or stream
//! exhaustion.
//!
//! # Configuration
//!
//! Configuration is loaded from:
//! 1. Configuration files (config/default.toml, config/{env}.toml)
//! 2. Environment variables (prefixed with QRLEDGER_)
//!
//! See `config.rs` for detailed configuration options.

use qrledger::alert::{AlertDispatcher, ConsoleAlert, NullAlert};
use qrledger::config::{LoggingConfig, ScannerConfig};
use qrledger::decoder::RqrrDecoder;
use qrledger::frame_source::{FrameSource, ImageDirSource};
use qrledger::overlay::TraceRenderer;
use qrledger::report::ReportWriter;
use qrledger::session::{ScanSession, SessionOptions};

use anyhow::{bail, Context};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_config()?;

    // Initialize logging
    init_logging(&config.logging)?;

    info!(
        service = "qrledger",
        version = env!("CARGO_PKG_VERSION"),
        source = %config.source.identifier,
        artifact = %config.report.path,
        "Starting QR scan service"
    );

    // Validate configuration
    config.validate()?;

    // Build the frame source from the configured identifier
    let mut source = build_source(&config)?;

    let decoder = RqrrDecoder::new();
    let reporter = ReportWriter::new(&config.report);
    let alerts: Box<dyn AlertDispatcher + Send> = if config.alert.enabled {
        Box::new(ConsoleAlert::new())
    } else {
        Box::new(NullAlert)
    };
    let mut renderer = TraceRenderer::new();

    // Stop signal: Ctrl-C sets the flag, the loop observes it once per frame
    let stop = Arc::new(AtomicBool::new(false));
    let stop_watcher = stop.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            stop_watcher.store(true, Ordering::SeqCst);
        }
    });

    let mut session = ScanSession::new(SessionOptions::from_config(&config));

    // The scan loop is synchronous by design; run it off the async runtime
    let stats = tokio::task::spawn_blocking(move || {
        let result = session.run(
            source.as_mut(),
            &decoder,
            &reporter,
            alerts.as_ref(),
            &mut renderer,
            &stop,
        );
        result.map(|stats| (stats, session))
    })
    .await
    .context("Scan loop task panicked")?;

    match stats {
        Ok((stats, session)) => {
            info!(
                frames_processed = stats.frames_processed,
                symbols_decoded = stats.symbols_decoded,
                distinct_payloads = session.ledger().size(),
                duplicates = stats.duplicates,
                report_writes = stats.report_writes,
                "Scan session completed"
            );
            Ok(())
        }
        Err(e) => Err(e).context("Scan session failed"),
    }
}

/// Load and validate configuration.
fn load_config() -> anyhow::Result<ScannerConfig> {
    // Try loading from files first, fall back to environment
    let config = ScannerConfig::load().or_else(|e| {
        warn!(error = %e, "Failed to load config from files, trying environment");
        ScannerConfig::from_env()
    })?;

    Ok(config)
}

/// Initialize the tracing/logging subsystem.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("qrledger={}", level).parse()?);

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer().pretty()).init();
    }

    Ok(())
}

/// Build the frame source selected by `source.identifier`.
///
/// `dir:<path>` replays a directory of image files; other backends (live
/// cameras) plug in behind the `FrameSource` trait.
fn build_source(config: &ScannerConfig) -> anyhow::Result<Box<dyn FrameSource + Send>> {
    let identifier = config.source.identifier.as_str();

    if let Some(path) = identifier.strip_prefix("dir:") {
        return Ok(Box::new(ImageDirSource::new(path)));
    }

    bail!("Unsupported frame source identifier: {identifier}");
}
