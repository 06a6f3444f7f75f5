// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for JPEG encoding and decoding.
//!
//! Decode failures are terminal for the frame: there is no partial-frame
//! recovery. Each variant maps onto a stable numeric code (see
//! [`JpegError::code`]) so that callers bridging to an integer-status API
//! keep the classic decoder error numbering.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a JPEG frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JpegError {
    /// Missing SOI (0xFFD8) at start of data.
    #[error("missing SOI marker (not a JPEG)")]
    NoSoi,
    /// Sample precision other than 8 bits.
    #[error("unsupported sample precision: {0}-bit")]
    NotEightBit(u8),
    /// Frame height differs from the size the caller asserted.
    #[error("frame height {found} does not match expected {expected}")]
    HeightMismatch { expected: u16, found: u16 },
    /// Frame width differs from the size the caller asserted.
    #[error("frame width {found} does not match expected {expected}")]
    WidthMismatch { expected: u16, found: u16 },
    /// Zero dimension, or not MCU-aligned when strict alignment is requested.
    #[error("invalid image dimensions {width}x{height}")]
    BadWidthOrHeight { width: u16, height: u16 },
    /// More than three components in SOF0.
    #[error("too many components in frame: {0}")]
    TooManyComponents(u8),
    /// A sampling factor outside 1..=3.
    #[error("illegal sampling factors: 0x{0:02X}")]
    IllegalHv(u8),
    /// Quantization table selector out of range (0–3).
    #[error("invalid quantization table selector: {0}")]
    QuantTableSelector(u8),
    /// Huffman table selector in SOS out of range (0–1).
    #[error("invalid Huffman table selector: 0x{0:02X}")]
    HuffmanTableSelector(u8),
    /// Frame is not 3-component YCbCr with 4:2:0 or 4:2:2 sampling.
    #[error("unsupported component layout: {0}")]
    NotYcbcr(&'static str),
    /// Component ID referenced in SOS not declared in SOF0.
    #[error("unknown component ID in scan: {0}")]
    UnknownCidInScan(u8),
    /// Spectral selection or successive approximation is not baseline,
    /// or the frame type is progressive, lossless or arithmetic coded.
    #[error("not a baseline sequential DCT stream")]
    NotSequentialDct,
    /// A restart marker was expected but something else was found.
    #[error("expected marker 0xFF{expected:02X}, found {found:?}")]
    WrongMarker { expected: u8, found: Option<u8> },
    /// Entropy-coded data ended (at a marker or the end of input) before
    /// every MCU was decoded.
    #[error("scan data ended early, found {found:?} where entropy data was expected")]
    UnexpectedMarker { found: Option<u8> },
    /// Invalid Huffman code in the entropy-coded data.
    #[error("invalid Huffman code in scan data")]
    HuffmanDecode,
    /// Scan data did not end with EOI (0xFFD9).
    #[error("missing EOI marker")]
    NoEoi,
    /// DQT/DHT/DRI segment is malformed or a referenced table is missing.
    #[error("bad table segment: {0}")]
    BadTables(&'static str),
    /// Header data ended inside a marker segment.
    #[error("unexpected end of JPEG data")]
    UnexpectedEof,
    /// Encoder input buffer is too small for the declared format and size.
    #[error("pixel buffer holds {actual} bytes, {expected} required")]
    BufferSize { expected: usize, actual: usize },
}

impl JpegError {
    /// Numeric status code, stable across releases.
    ///
    /// Codes 1–14 follow the classic MJPEG decoder numbering. Encoder-side
    /// input errors report 15 (the legacy depth/size mismatch slot).
    pub fn code(&self) -> i32 {
        match self {
            Self::NoSoi => 1,
            Self::NotEightBit(_) => 2,
            Self::HeightMismatch { .. } => 3,
            Self::WidthMismatch { .. } => 4,
            Self::BadWidthOrHeight { .. } => 5,
            Self::TooManyComponents(_) => 6,
            Self::IllegalHv(_) => 7,
            Self::QuantTableSelector(_) | Self::HuffmanTableSelector(_) => 8,
            Self::NotYcbcr(_) => 9,
            Self::UnknownCidInScan(_) => 10,
            Self::NotSequentialDct => 11,
            // A corrupt code desynchronizes the stream; it surfaces as a bad marker.
            Self::WrongMarker { .. } | Self::UnexpectedMarker { .. } | Self::HuffmanDecode => 12,
            Self::NoEoi => 13,
            Self::BadTables(_) | Self::UnexpectedEof => 14,
            Self::BufferSize { .. } => 15,
        }
    }
}

pub type Result<T> = std::result::Result<T, JpegError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_legacy_numbering() {
        assert_eq!(JpegError::NoSoi.code(), 1);
        assert_eq!(JpegError::TooManyComponents(4).code(), 6);
        assert_eq!(JpegError::NotSequentialDct.code(), 11);
        assert_eq!(JpegError::UnexpectedMarker { found: Some(0xD9) }.code(), 12);
        assert_eq!(JpegError::NoEoi.code(), 13);
        assert_eq!(JpegError::BadTables("16-bit DQT").code(), 14);
    }

    #[test]
    fn display_mentions_details() {
        let err = JpegError::WrongMarker { expected: 0xD3, found: Some(0xD5) };
        let msg = err.to_string();
        assert!(msg.contains("FFD3"), "{msg}");
        assert!(JpegError::NotEightBit(12).to_string().contains("12-bit"));
    }
}
