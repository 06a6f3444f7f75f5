// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Helpers for MJPEG camera frames.
//!
//! UVC and similar cameras send "abbreviated" JPEGs without a DHT segment,
//! relying on the standard Huffman tables. Generic decoders and browsers
//! need the tables spelled out, so capture code inserts them before
//! handing a frame to the streaming layer. Camera buffers may also carry
//! padding after EOI, or several frames back to back.

use std::borrow::Cow;

use tracing::trace;

use crate::jpeg::error::{JpegError, Result};
use crate::jpeg::marker::{iterate_markers, skip_scan_data, DHT, EOI, SOF0, SOS};
use crate::jpeg::tables::{standard_specs, write_dht};

/// Whether a DHT segment appears before the first SOS.
pub fn has_huffman_tables(frame: &[u8]) -> Result<bool> {
    let (entries, _) = iterate_markers(frame)?;
    Ok(entries.iter().any(|e| e.marker == DHT))
}

/// Return `frame` with the standard DHT segment inserted in front of SOF0,
/// or unchanged (borrowed) if it already defines Huffman tables.
pub fn insert_huffman_tables(frame: &[u8]) -> Result<Cow<'_, [u8]>> {
    let (entries, _) = iterate_markers(frame)?;
    if entries.iter().any(|e| e.marker == DHT) {
        return Ok(Cow::Borrowed(frame));
    }
    let sof = entries
        .iter()
        .find(|e| e.marker == SOF0)
        .ok_or(JpegError::NotSequentialDct)?;

    let dht = write_dht(&standard_specs());
    let mut out = Vec::with_capacity(frame.len() + dht.len());
    out.extend_from_slice(&frame[..sof.offset]);
    out.extend_from_slice(&dht);
    out.extend_from_slice(&frame[sof.offset..]);
    trace!(at = sof.offset, "inserted standard DHT");
    Ok(Cow::Owned(out))
}

/// Length of the JPEG at the start of `data`, through its EOI marker.
pub fn frame_length(data: &[u8]) -> Result<usize> {
    let (entries, pos) = iterate_markers(data)?;
    if entries.last().map(|e| e.marker) != Some(SOS) {
        // Header-only stream that ended with EOI
        return Ok(pos);
    }
    let end = skip_scan_data(data, pos).map_err(|_| JpegError::NoEoi)?;
    if data[end + 1] != EOI {
        return Err(JpegError::NoEoi);
    }
    Ok(end + 2)
}

/// Iterator over JPEG frames concatenated in one buffer.
///
/// Bytes between frames are skipped up to the next SOI. Iteration stops
/// after the first malformed frame.
pub struct Frames<'a> {
    data: &'a [u8],
    pos: usize,
}

/// Split a buffer of back-to-back JPEG frames.
pub fn frames(data: &[u8]) -> Frames<'_> {
    Frames { data, pos: 0 }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.get(self.pos..)?;
        let start = rest.windows(2).position(|w| w == [0xFF, 0xD8])?;
        let rest = &rest[start..];
        match frame_length(rest) {
            Ok(len) => {
                self.pos += start + len;
                Some(Ok(&rest[..len]))
            }
            Err(e) => {
                self.pos = self.data.len();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::{decode, encode, EncodeOptions, PixelFormat};

    fn sample() -> Vec<u8> {
        let px: Vec<u8> = (0..32 * 16 * 3).map(|i| (i * 7 % 251) as u8).collect();
        encode(&px, PixelFormat::Rgb24, 32, 16, &EncodeOptions::default()).unwrap()
    }

    /// The same frame with its DHT segment cut out.
    fn abbreviated(full: &[u8]) -> Vec<u8> {
        let (entries, _) = iterate_markers(full).unwrap();
        let dht = entries.iter().find(|e| e.marker == DHT).unwrap();
        let end = dht.offset + 4 + dht.data.len();
        [&full[..dht.offset], &full[end..]].concat()
    }

    #[test]
    fn detects_and_restores_tables() {
        let full = sample();
        let short = abbreviated(&full);
        assert!(has_huffman_tables(&full).unwrap());
        assert!(!has_huffman_tables(&short).unwrap());

        assert!(matches!(insert_huffman_tables(&full).unwrap(), Cow::Borrowed(_)));
        let restored = insert_huffman_tables(&short).unwrap();
        // Our encoder writes DHT right before SOF0, so the bytes match exactly.
        assert_eq!(restored.as_ref(), full.as_slice());
    }

    #[test]
    fn abbreviated_frame_decodes_with_default_tables() {
        let full = sample();
        let a = decode(&full).unwrap();
        let b = decode(&abbreviated(&full)).unwrap();
        assert_eq!(a.pixels, b.pixels);
    }

    #[test]
    fn length_ignores_trailing_padding() {
        let full = sample();
        let mut padded = full.clone();
        padded.extend_from_slice(&[0u8; 37]);
        assert_eq!(frame_length(&padded).unwrap(), full.len());

        assert_eq!(frame_length(&full[..full.len() - 2]).unwrap_err(), JpegError::NoEoi);
        assert_eq!(frame_length(&[0xFF, 0xD8, 0xFF, 0xD9]).unwrap(), 4);
    }

    #[test]
    fn splits_concatenated_frames() {
        let one = sample();
        let mut buf = one.clone();
        buf.extend_from_slice(&[0x00, 0x11]);
        buf.extend_from_slice(&one);

        let frames: Vec<&[u8]> = frames(&buf).map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| *f == one.as_slice()));
    }

    #[test]
    fn truncated_last_frame_is_an_error() {
        let one = sample();
        let mut buf = one.clone();
        buf.extend_from_slice(&one[..one.len() / 2]);
        let results: Vec<_> = frames(&buf).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
