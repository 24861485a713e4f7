//! Symbol decoding behind an opaque adapter trait.
//!
//! The scan loop treats decoding as a black box: a frame goes in, a list of
//! per-symbol results comes out. A symbol that cannot be decoded (damaged
//! code, payload bytes that are not valid text) is an `Err` element in the
//! list, never a panic and never fatal to the frame — the caller logs it and
//! keeps going with the remaining symbols.

use crate::frame_source::Frame;
use thiserror::Error;

/// Per-symbol decode failures.
#[derive(Debug, Error)]
pub enum SymbolDecodeError {
    #[error("Symbol decode failed: {0}")]
    DecodeFailed(String),

    #[error("Symbol payload is not valid text: {0}")]
    InvalidPayload(String),
}

/// One successfully decoded symbol in a frame.
#[derive(Debug, Clone)]
pub struct DecodedSymbol {
    /// Decoded text content, used as the deduplication key
    pub payload: String,

    /// Decoder-reported symbol format tag
    pub symbol_type: String,

    /// Boundary polygon of the symbol in frame coordinates
    pub bounds: Vec<(i32, i32)>,
}

/// Decodes optical symbols out of a frame.
///
/// Returns zero or more per-symbol results in decoder-determined order. The
/// order is not guaranteed stable across near-duplicate frames. No state, no
/// side effects.
pub trait SymbolDecoder {
    fn decode(&self, frame: &Frame) -> Vec<Result<DecodedSymbol, SymbolDecodeError>>;
}

/// QR decoder adapter built on the `rqrr` crate.
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RqrrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolDecoder for RqrrDecoder {
    fn decode(&self, frame: &Frame) -> Vec<Result<DecodedSymbol, SymbolDecodeError>> {
        let width = frame.width as usize;
        let height = frame.height as usize;

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            frame.data[y * width + x]
        });

        prepared
            .detect_grids()
            .into_iter()
            .map(|grid| {
                let bounds: Vec<(i32, i32)> =
                    grid.bounds.iter().map(|p| (p.x, p.y)).collect();

                match grid.decode() {
                    Ok((_meta, content)) => Ok(DecodedSymbol {
                        payload: content,
                        symbol_type: "QRCODE".to_string(),
                        bounds,
                    }),
                    Err(rqrr::DeQRError::EncodingError) => {
                        Err(SymbolDecodeError::InvalidPayload(
                            "payload bytes are not valid UTF-8".to_string(),
                        ))
                    }
                    Err(e) => Err(SymbolDecodeError::DecodeFailed(e.to_string())),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn blank_frame(width: u32, height: u32) -> Frame {
        Frame {
            data: vec![255u8; (width * height) as usize],
            width,
            height,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_blank_frame_yields_no_symbols() {
        let decoder = RqrrDecoder::new();
        let results = decoder.decode(&blank_frame(64, 64));
        assert!(results.is_empty());
    }

    #[test]
    fn test_noise_frame_yields_no_panics() {
        // Pseudo-random speckle; must never panic, any Err elements are fine.
        let width = 48u32;
        let height = 48u32;
        let mut data = vec![0u8; (width * height) as usize];
        let mut seed = 0x12345678u32;
        for px in data.iter_mut() {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            *px = (seed >> 24) as u8;
        }
        let frame = Frame {
            data,
            width,
            height,
            sequence: 0,
            captured_at: Instant::now(),
        };

        let decoder = RqrrDecoder::new();
        let _ = decoder.decode(&frame);
    }
}
