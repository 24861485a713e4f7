//! Frame acquisition behind a pluggable source trait.
//!
//! The scan loop does not care where frames come from. `FrameSource` exposes
//! the open/read/release lifecycle the loop drives; the shipped
//! `ImageDirSource` replays a directory of image files as a frame stream,
//! which is also what the scenario tests run against. A live camera backend
//! implements the same trait.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during frame acquisition.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source not open")]
    NotOpen,

    #[error("Failed to open source {identifier}: {message}")]
    OpenFailed { identifier: String, message: String },

    #[error("Frame read failed: {0}")]
    ReadFailed(String),
}

/// One frame of the stream: an 8-bit luma buffer plus dimensions.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Grayscale pixel data, row-major, `width * height` bytes
    pub data: Vec<u8>,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Source-assigned sequence number, starting at 0
    pub sequence: u64,

    /// Timestamp when the frame was acquired
    pub captured_at: Instant,
}

/// Statistics for a frame source.
#[derive(Debug, Default, Clone)]
pub struct SourceStats {
    pub frames_delivered: u64,
    pub bytes_delivered: u64,
    pub read_errors: u64,
}

/// A stream of frames the scan loop can drain.
///
/// `read_frame` returning `Ok(None)` signals end-of-stream; the loop treats
/// both `Ok(None)` and `Err` as stream exhaustion. `release` must be safe to
/// call on every exit path, including before a successful `open`.
pub trait FrameSource {
    /// Acquire the underlying resource.
    fn open(&mut self) -> Result<(), SourceError>;

    /// Read the next frame. `Ok(None)` means the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Release the underlying resource.
    fn release(&mut self);

    /// Current acquisition statistics.
    fn stats(&self) -> SourceStats;
}

/// Frame source that replays image files from a directory in sorted order.
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    open: bool,
    stats: SourceStats,
}

impl ImageDirSource {
    /// Create a source over the given directory. The directory is scanned
    /// lazily at `open` time.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            cursor: 0,
            open: false,
            stats: SourceStats::default(),
        }
    }

    fn is_image_file(path: &PathBuf) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()),
            Some(ref ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp")
        )
    }
}

impl FrameSource for ImageDirSource {
    fn open(&mut self) -> Result<(), SourceError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| SourceError::OpenFailed {
            identifier: self.dir.display().to_string(),
            message: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(Self::is_image_file)
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(SourceError::OpenFailed {
                identifier: self.dir.display().to_string(),
                message: "No image files in directory".to_string(),
            });
        }

        info!(
            dir = %self.dir.display(),
            frame_count = files.len(),
            "Opened image directory source"
        );

        self.files = files;
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }

        let path = match self.files.get(self.cursor) {
            Some(path) => path.clone(),
            None => return Ok(None),
        };

        let img = image::open(&path).map_err(|e| {
            self.stats.read_errors += 1;
            SourceError::ReadFailed(format!("{}: {}", path.display(), e))
        })?;
        let luma = img.to_luma8();

        let frame = Frame {
            width: luma.width(),
            height: luma.height(),
            data: luma.into_raw(),
            sequence: self.cursor as u64,
            captured_at: Instant::now(),
        };

        self.cursor += 1;
        self.stats.frames_delivered += 1;
        self.stats.bytes_delivered += frame.data.len() as u64;

        debug!(
            path = %path.display(),
            sequence = frame.sequence,
            size = format!("{}x{}", frame.width, frame.height),
            "Frame read"
        );

        Ok(Some(frame))
    }

    fn release(&mut self) {
        if self.open {
            info!(
                dir = %self.dir.display(),
                frames_delivered = self.stats.frames_delivered,
                "Released image directory source"
            );
        }
        self.open = false;
        self.files.clear();
    }

    fn stats(&self) -> SourceStats {
        self.stats.clone()
    }
}
