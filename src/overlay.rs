//! Per-frame overlay data for on-screen rendering.
//!
//! The session builds a `FrameOverlay` per processed frame: symbol boundary
//! polygons, truncated payload labels, and the two session counters. Actual
//! drawing is a collaborator behind `Renderer`; the shipped `TraceRenderer`
//! emits the overlay as structured log events.

use crate::frame_source::Frame;
use tracing::debug;

/// Overlay data for one decoded symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolOverlay {
    /// Payload label, truncated to the display length
    pub label: String,

    /// Boundary polygon in frame coordinates
    pub bounds: Vec<(i32, i32)>,

    /// Drives the boundary color (red for duplicates, green for new)
    pub duplicate: bool,
}

/// Overlay data for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameOverlay {
    /// Per-symbol overlays in decode order
    pub symbols: Vec<SymbolOverlay>,

    /// Symbols decoded in this frame
    pub symbols_in_frame: usize,

    /// Total distinct payloads seen this session
    pub distinct_total: usize,
}

/// Truncate a payload for display, suffixing `...` past the threshold.
///
/// Operates on characters, not bytes, so multi-byte payloads never split in
/// the middle of a code point.
pub fn truncate_label(payload: &str, max_chars: usize) -> String {
    if payload.chars().count() <= max_chars {
        return payload.to_string();
    }
    let truncated: String = payload.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

/// Displays a frame with its overlay.
pub trait Renderer {
    fn render(&mut self, frame: &Frame, overlay: &FrameOverlay);
}

/// Renderer that reports the overlay through the logging subsystem instead
/// of a display surface.
pub struct TraceRenderer;

impl TraceRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TraceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for TraceRenderer {
    fn render(&mut self, frame: &Frame, overlay: &FrameOverlay) {
        for symbol in &overlay.symbols {
            debug!(
                sequence = frame.sequence,
                label = %symbol.label,
                duplicate = symbol.duplicate,
                "Symbol overlay"
            );
        }
        debug!(
            sequence = frame.sequence,
            symbols_in_frame = overlay.symbols_in_frame,
            distinct_total = overlay.distinct_total,
            "Frame overlay"
        );
    }
}
