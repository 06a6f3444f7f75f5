// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! JPEG marker parsing and writing.
//!
//! [`iterate_markers`] walks the marker segments between SOI and the start
//! of entropy-coded data. [`read_headers`] runs the decoder's header state
//! machine over those segments: tables (DQT/DHT/DRI) may appear in any
//! order before and after SOF0, APPn and COM are skipped, and SOS ends the
//! header. Everything outside baseline sequential DCT is rejected here.
//!
//! [`write_headers`] produces the fixed header the encoder emits.

use tracing::{debug, trace};

use super::error::{JpegError, Result};
use super::frame::{parse_sof, write_sof, FrameInfo};
use super::quant::QuantTable;
use super::scan::ScanComponent;
use super::tables::{parse_dht, parse_dqt, standard_specs, write_dht, write_dqt, HuffmanSpec};

/// JPEG marker constants.
pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOF0: u8 = 0xC0;
pub const DHT: u8 = 0xC4;
pub const DAC: u8 = 0xCC;
pub const DQT: u8 = 0xDB;
pub const DRI: u8 = 0xDD;
pub const SOS: u8 = 0xDA;
pub const COM: u8 = 0xFE;
pub const RST0: u8 = 0xD0;

/// Whether `marker` is one of RST0..RST7.
pub fn is_rst(marker: u8) -> bool {
    (RST0..=RST0 + 7).contains(&marker)
}

/// A marker segment found in the header area.
#[derive(Debug, Clone, Copy)]
pub struct MarkerEntry<'a> {
    /// The marker byte (e.g., 0xDB for DQT), without the 0xFF prefix.
    pub marker: u8,
    /// Segment data after the 2-byte length field; empty for standalone markers.
    pub data: &'a [u8],
    /// Byte offset of the marker (the 0xFF byte) in the original data.
    pub offset: usize,
}

/// Iterate over JPEG markers from a byte slice.
///
/// Returns markers in order, starting with SOI, and the position after
/// the last one. Stops after SOS (the position is then the first byte of
/// scan data) or after EOI.
pub fn iterate_markers(data: &[u8]) -> Result<(Vec<MarkerEntry<'_>>, usize)> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != SOI {
        return Err(JpegError::NoSoi);
    }
    let mut entries = vec![MarkerEntry {
        marker: SOI,
        data: &[],
        offset: 0,
    }];
    let mut pos = 2;

    loop {
        // Find next 0xFF
        while pos < data.len() && data[pos] != 0xFF {
            pos += 1;
        }
        // Skip fill bytes
        while pos + 1 < data.len() && data[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= data.len() {
            return Err(JpegError::UnexpectedEof);
        }

        let offset = pos;
        let marker = data[pos + 1];
        pos += 2;

        if marker == 0x00 {
            continue;
        }

        // Standalone markers (no length field)
        if marker == EOI || marker == SOI || is_rst(marker) {
            entries.push(MarkerEntry {
                marker,
                data: &[],
                offset,
            });
            if marker == EOI {
                return Ok((entries, pos));
            }
            continue;
        }

        if pos + 2 > data.len() {
            return Err(JpegError::UnexpectedEof);
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if length < 2 {
            return Err(JpegError::BadTables("invalid segment length"));
        }
        if pos + length > data.len() {
            return Err(JpegError::UnexpectedEof);
        }

        entries.push(MarkerEntry {
            marker,
            data: &data[pos + 2..pos + length],
            offset,
        });
        pos += length;

        if marker == SOS {
            return Ok((entries, pos));
        }
    }
}

/// Frame types and coding modes other than baseline Huffman.
fn is_non_baseline(marker: u8) -> bool {
    matches!(
        marker,
        0xC1..=0xC3 // extended, progressive, lossless
        | 0xC5..=0xC7 // differential
        | 0xC8..=0xCB // arithmetic
        | DAC
        | 0xCD..=0xCF // differential arithmetic
    )
}

/// Everything the scan decoder needs, collected from the header segments.
#[derive(Debug, Clone)]
pub struct StreamHeaders {
    pub frame: FrameInfo,
    /// Quantization tables, indexed by table ID (0–3).
    pub quant_tables: [Option<QuantTable>; 4],
    /// DC Huffman table specs, indexed by table ID (0–1).
    pub dc_specs: [Option<HuffmanSpec>; 2],
    /// AC Huffman table specs, indexed by table ID (0–1).
    pub ac_specs: [Option<HuffmanSpec>; 2],
    /// Restart interval in MCUs (0 = no restarts).
    pub restart_interval: u16,
    /// Scan components in scan order.
    pub scan_components: Vec<ScanComponent>,
    /// Byte offset of the first entropy-coded byte.
    pub scan_start: usize,
}

impl StreamHeaders {
    /// Whether the stream defined any Huffman table at all.
    pub fn has_huffman_tables(&self) -> bool {
        self.dc_specs.iter().chain(self.ac_specs.iter()).any(Option::is_some)
    }

    /// Fill empty Huffman slots with the standard tables.
    pub fn fill_standard_huffman(&mut self) {
        for spec in standard_specs() {
            let slot = if spec.class == 0 {
                &mut self.dc_specs[spec.id as usize]
            } else {
                &mut self.ac_specs[spec.id as usize]
            };
            if slot.is_none() {
                *slot = Some(spec);
            }
        }
    }
}

/// Header parser state.
enum State {
    /// Before SOF0: only tables and skippable segments.
    Tables,
    /// SOF0 seen, waiting for SOS.
    Frame(FrameInfo),
}

/// Parse and validate every header segment up to the start of scan data.
pub fn read_headers(data: &[u8]) -> Result<StreamHeaders> {
    let (entries, scan_start) = iterate_markers(data)?;

    let mut state = State::Tables;
    let mut quant_tables: [Option<QuantTable>; 4] = Default::default();
    let mut dc_specs: [Option<HuffmanSpec>; 2] = Default::default();
    let mut ac_specs: [Option<HuffmanSpec>; 2] = Default::default();
    let mut restart_interval = 0u16;

    for entry in entries.iter().skip(1) {
        trace!(marker = entry.marker, offset = entry.offset, len = entry.data.len(), "segment");
        match entry.marker {
            DQT => {
                for (id, qt) in parse_dqt(entry.data)? {
                    quant_tables[id as usize] = Some(qt);
                }
            }
            DHT => {
                for spec in parse_dht(entry.data)? {
                    let id = spec.id as usize;
                    let slot = if spec.class == 0 { &mut dc_specs } else { &mut ac_specs };
                    slot[id] = Some(spec);
                }
            }
            DRI => restart_interval = parse_dri(entry.data)?,
            SOF0 => {
                if matches!(state, State::Frame(_)) {
                    return Err(JpegError::NotSequentialDct);
                }
                state = State::Frame(parse_sof(entry.data)?);
            }
            SOS => {
                let State::Frame(frame) = state else {
                    return Err(JpegError::WrongMarker {
                        expected: SOF0,
                        found: Some(SOS),
                    });
                };
                let scan_components = parse_sos(entry.data, &frame)?;
                debug!(
                    width = frame.width,
                    height = frame.height,
                    restart_interval,
                    "parsed JPEG headers"
                );
                return Ok(StreamHeaders {
                    frame,
                    quant_tables,
                    dc_specs,
                    ac_specs,
                    restart_interval,
                    scan_components,
                    scan_start,
                });
            }
            EOI => {
                return Err(JpegError::WrongMarker {
                    expected: SOS,
                    found: Some(EOI),
                })
            }
            m if is_non_baseline(m) => return Err(JpegError::NotSequentialDct),
            // APPn, COM, stray RSTn and anything else unknown
            _ => {}
        }
    }

    Err(JpegError::UnexpectedEof)
}

/// Parse an SOS (Start of Scan) header against the frame it belongs to.
///
/// The scan must carry all three frame components, in frame order, with
/// baseline spectral parameters `Ss=0, Se=63, Ah=Al=0`.
pub fn parse_sos(data: &[u8], frame: &FrameInfo) -> Result<Vec<ScanComponent>> {
    if data.is_empty() {
        return Err(JpegError::UnexpectedEof);
    }
    let num_components = data[0] as usize;
    if num_components != 3 {
        return Err(JpegError::NotYcbcr("scan must have three components"));
    }
    let params_offset = 1 + num_components * 2;
    if data.len() < params_offset + 3 {
        return Err(JpegError::UnexpectedEof);
    }

    let mut selectors = Vec::with_capacity(num_components);
    for (i, sel) in data[1..params_offset].chunks_exact(2).enumerate() {
        let td_ta = sel[1];
        let dc_table = td_ta >> 4;
        let ac_table = td_ta & 0x0F;
        if dc_table > 1 || ac_table > 1 {
            return Err(JpegError::HuffmanTableSelector(td_ta));
        }
        let comp_idx = frame
            .component_index(sel[0])
            .ok_or(JpegError::UnknownCidInScan(sel[0]))?;
        if comp_idx != i {
            return Err(JpegError::NotYcbcr("scan components out of frame order"));
        }
        selectors.push(ScanComponent {
            comp_idx,
            dc_table: dc_table as usize,
            ac_table: ac_table as usize,
        });
    }

    let (ss, se, ah_al) = (data[params_offset], data[params_offset + 1], data[params_offset + 2]);
    if ss != 0 || se != 63 || ah_al != 0 {
        return Err(JpegError::NotSequentialDct);
    }

    Ok(selectors)
}

/// Parse DRI (Define Restart Interval) marker data.
pub fn parse_dri(data: &[u8]) -> Result<u16> {
    if data.len() < 2 {
        return Err(JpegError::UnexpectedEof);
    }
    Ok(u16::from_be_bytes([data[0], data[1]]))
}

/// Skip past entropy-coded scan data to find the next marker.
///
/// Starting from `pos` (the first byte of entropy-coded data after an SOS header),
/// scans forward looking for a 0xFF byte followed by a non-zero, non-RST marker byte.
/// Returns the byte offset of the 0xFF byte of the next marker.
pub fn skip_scan_data(data: &[u8], mut pos: usize) -> Result<usize> {
    while pos < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        if pos + 1 >= data.len() {
            return Err(JpegError::UnexpectedEof);
        }
        match data[pos + 1] {
            // Stuffed byte or restart marker
            0x00 => pos += 2,
            m if is_rst(m) => pos += 2,
            // Fill byte
            0xFF => pos += 1,
            _ => return Ok(pos),
        }
    }
    Err(JpegError::UnexpectedEof)
}

/// Write an SOS segment selecting table 0 for luma and table 1 for chroma.
pub fn write_sos(frame: &FrameInfo) -> Vec<u8> {
    let length = 6 + 2 * frame.components.len();
    let mut out = Vec::with_capacity(2 + length);
    out.extend_from_slice(&[0xFF, SOS]);
    out.extend_from_slice(&(length as u16).to_be_bytes());
    out.push(frame.components.len() as u8);
    for (i, comp) in frame.components.iter().enumerate() {
        out.push(comp.id);
        out.push(if i == 0 { 0x00 } else { 0x11 });
    }
    out.extend_from_slice(&[0x00, 0x3F, 0x00]);
    out
}

/// Write a DRI segment.
pub fn write_dri(restart_interval: u16) -> Vec<u8> {
    let mut out = vec![0xFF, DRI, 0x00, 0x04];
    out.extend_from_slice(&restart_interval.to_be_bytes());
    out
}

/// Write everything from SOI through the SOS header.
///
/// Layout: SOI, one DQT with both tables, one DHT with the four standard
/// tables, SOF0, DRI (only for a non-zero interval), SOS.
pub fn write_headers(
    frame: &FrameInfo,
    luma: &QuantTable,
    chroma: &QuantTable,
    restart_interval: u16,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(640);
    out.extend_from_slice(&[0xFF, SOI]);
    out.extend_from_slice(&write_dqt(&[(0, luma), (1, chroma)]));
    out.extend_from_slice(&write_dht(&standard_specs()));
    out.extend_from_slice(&write_sof(frame));
    if restart_interval > 0 {
        out.extend_from_slice(&write_dri(restart_interval));
    }
    out.extend_from_slice(&write_sos(frame));
    out
}
