// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! JPEG scan data encoding and decoding.
//!
//! Converts between [`DctGrid`]s (one per component) and the interleaved,
//! entropy-coded scan. Handles MCU ordering, DC prediction and restart
//! intervals. All coder state lives in per-call values.

use tracing::trace;

use super::bitio::{BitReader, BitWriter};
use super::dct::DctGrid;
use super::error::{JpegError, Result};
use super::frame::FrameInfo;
use super::huffman::{
    encode_value, extend_sign, HuffmanDecodeTable, HuffmanEncodeTable, EOB, ZRL,
};
use super::marker::{skip_scan_data, StreamHeaders, EOI, RST0};
use super::tables::{standard_specs, HuffmanSpec};
use super::zigzag::{NATURAL_TO_ZIGZAG, ZIGZAG_TO_NATURAL};

/// Component selector for one scan component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanComponent {
    /// Index into FrameInfo.components.
    pub comp_idx: usize,
    /// DC Huffman table index.
    pub dc_table: usize,
    /// AC Huffman table index.
    pub ac_table: usize,
}

impl ScanComponent {
    /// Selectors the encoder uses: table 0 for luma, table 1 for chroma.
    pub fn for_encode(frame: &FrameInfo) -> Vec<Self> {
        (0..frame.components.len())
            .map(|comp_idx| {
                let table = usize::from(comp_idx > 0);
                Self {
                    comp_idx,
                    dc_table: table,
                    ac_table: table,
                }
            })
            .collect()
    }
}

/// Visit every block of the scan in interleaved MCU order.
///
/// `visit(mcu_index, scan_component_index, block_row, block_col)`.
fn for_each_block(
    frame: &FrameInfo,
    scan_components: &[ScanComponent],
    mut visit: impl FnMut(usize, usize, usize, usize) -> Result<()>,
) -> Result<()> {
    let mut mcu = 0usize;
    for mcu_row in 0..frame.mcus_tall as usize {
        for mcu_col in 0..frame.mcus_wide as usize {
            for (sci, sc) in scan_components.iter().enumerate() {
                let comp = &frame.components[sc.comp_idx];
                for v in 0..comp.v_sampling as usize {
                    for h in 0..comp.h_sampling as usize {
                        let block_row = mcu_row * (comp.v_sampling as usize) + v;
                        let block_col = mcu_col * (comp.h_sampling as usize) + h;
                        visit(mcu, sci, block_row, block_col)?;
                    }
                }
            }
            mcu += 1;
        }
    }
    Ok(())
}

fn is_restart_boundary(mcu: usize, restart_interval: u16) -> bool {
    restart_interval > 0 && mcu > 0 && mcu % restart_interval as usize == 0
}

/// Per-image encoder state: the bit writer, DC predictors and restart
/// bookkeeping. Created for one encode call and consumed by [`Self::finish`].
pub struct EncoderState {
    writer: BitWriter,
    dc_tables: [HuffmanEncodeTable; 2],
    ac_tables: [HuffmanEncodeTable; 2],
    /// Previous DC value per scan component.
    dc_pred: Vec<i32>,
    restart_interval: u16,
    /// MCU index that last emitted a restart marker, if any.
    last_restart_mcu: usize,
    restarts: u32,
}

impl EncoderState {
    /// Start a scan after `header` (SOI through SOS) with the standard tables.
    pub fn new(header: Vec<u8>, num_components: usize, restart_interval: u16) -> Self {
        let [dc0, dc1, ac0, ac1] =
            standard_specs().map(|s: HuffmanSpec| HuffmanEncodeTable::build(&s.bits, &s.huffval));
        Self {
            writer: BitWriter::with_output(header),
            dc_tables: [dc0, dc1],
            ac_tables: [ac0, ac1],
            dc_pred: vec![0; num_components],
            restart_interval,
            last_restart_mcu: 0,
            restarts: 0,
        }
    }

    /// Emit a restart marker and reset predictors if `mcu` starts a new interval.
    fn restart_if_due(&mut self, mcu: usize) {
        if mcu != self.last_restart_mcu && is_restart_boundary(mcu, self.restart_interval) {
            self.writer.write_marker(RST0 + (self.restarts % 8) as u8);
            self.restarts += 1;
            self.last_restart_mcu = mcu;
            self.dc_pred.fill(0);
        }
    }

    /// Huffman-code one block of quantized coefficients (natural order).
    pub fn encode_block(&mut self, sc: &ScanComponent, sci: usize, block: &[i16]) -> Result<()> {
        let mut zz = [0i16; 64];
        for (ni, &v) in block.iter().enumerate().take(64) {
            zz[NATURAL_TO_ZIGZAG[ni]] = v;
        }

        let dc_tab = &self.dc_tables[sc.dc_table];
        let ac_tab = &self.ac_tables[sc.ac_table];
        let writer = &mut self.writer;

        // DC difference against the previous block of this component
        let dc_diff = (zz[0] as i32 - self.dc_pred[sci]) as i16;
        self.dc_pred[sci] = zz[0] as i32;
        let (dc_bits, dc_size) = encode_value(dc_diff);
        let (dc_code, dc_code_len) = dc_tab.encode(dc_size)?;
        writer.write_bits(dc_code, dc_code_len);
        if dc_size > 0 {
            writer.write_bits(dc_bits, dc_size);
        }

        let mut k = 1;
        while k < 64 {
            let mut run = 0usize;
            while k + run < 64 && zz[k + run] == 0 {
                run += 1;
            }

            if k + run >= 64 {
                let (eob_code, eob_len) = ac_tab.encode(EOB)?;
                writer.write_bits(eob_code, eob_len);
                break;
            }

            while run >= 16 {
                let (zrl_code, zrl_len) = ac_tab.encode(ZRL)?;
                writer.write_bits(zrl_code, zrl_len);
                run -= 16;
                k += 16;
            }

            k += run;
            let (ac_bits, ac_size) = encode_value(zz[k]);
            let (ac_code, ac_code_len) = ac_tab.encode(((run as u8) << 4) | ac_size)?;
            writer.write_bits(ac_code, ac_code_len);
            writer.write_bits(ac_bits, ac_size);
            k += 1;
        }
        Ok(())
    }

    /// Pad the last byte with 1-bits, append EOI and return the stream.
    pub fn finish(mut self) -> Vec<u8> {
        self.writer.write_marker(EOI);
        self.writer.flush()
    }
}

/// Entropy-code `grids` (one per frame component, natural order) after
/// `header` and terminate the stream with EOI.
pub fn encode_scan(
    header: Vec<u8>,
    frame: &FrameInfo,
    grids: &[DctGrid],
    restart_interval: u16,
) -> Result<Vec<u8>> {
    let scan_components = ScanComponent::for_encode(frame);
    let mut state = EncoderState::new(header, scan_components.len(), restart_interval);

    for_each_block(frame, &scan_components, |mcu, sci, br, bc| {
        state.restart_if_due(mcu);
        state.encode_block(&scan_components[sci], sci, grids[sci].block(br, bc))
    })?;

    trace!(restarts = state.restarts, "scan encoded");
    Ok(state.finish())
}

/// Huffman decode tables for the two baseline slots.
pub struct DecodeTables {
    dc: [Option<HuffmanDecodeTable>; 2],
    ac: [Option<HuffmanDecodeTable>; 2],
}

impl DecodeTables {
    /// Build the tables the scan selects. A selected but undefined table
    /// is a [`JpegError::BadTables`].
    pub fn build(headers: &StreamHeaders) -> Result<Self> {
        let mut tables = Self {
            dc: [None, None],
            ac: [None, None],
        };
        for sc in &headers.scan_components {
            for (specs, slot, id) in [
                (&headers.dc_specs, &mut tables.dc, sc.dc_table),
                (&headers.ac_specs, &mut tables.ac, sc.ac_table),
            ] {
                if slot[id].is_none() {
                    let spec = specs[id]
                        .as_ref()
                        .ok_or(JpegError::BadTables("scan selects an undefined Huffman table"))?;
                    slot[id] = Some(HuffmanDecodeTable::build(&spec.bits, &spec.huffval)?);
                }
            }
        }
        Ok(tables)
    }

    fn get(&self, sc: &ScanComponent) -> Result<(&HuffmanDecodeTable, &HuffmanDecodeTable)> {
        match (&self.dc[sc.dc_table], &self.ac[sc.ac_table]) {
            (Some(dc), Some(ac)) => Ok((dc, ac)),
            _ => Err(JpegError::BadTables("scan selects an undefined Huffman table")),
        }
    }
}

/// Decode one block into `block` (natural order), updating `dc_pred`.
fn decode_block(
    reader: &mut BitReader,
    dc_tab: &HuffmanDecodeTable,
    ac_tab: &HuffmanDecodeTable,
    dc_pred: &mut i32,
    block: &mut [i16],
) -> Result<()> {
    let dc_size = dc_tab.decode(reader)?;
    if dc_size > 11 {
        return Err(JpegError::HuffmanDecode);
    }
    if dc_size > 0 {
        let dc_bits = reader.read_bits(dc_size);
        *dc_pred += extend_sign(dc_bits, dc_size) as i32;
    }
    block[0] = (*dc_pred).clamp(i16::MIN as i32, i16::MAX as i32) as i16;

    let mut k = 1;
    while k < 64 {
        let rs = ac_tab.decode(reader)?;
        let run = (rs >> 4) as usize;
        let size = rs & 0x0F;

        if size == 0 {
            if run == 15 {
                k += 16;
                continue;
            }
            // EOB
            break;
        }

        k += run;
        if k >= 64 {
            return Err(JpegError::HuffmanDecode);
        }
        let ac_bits = reader.read_bits(size);
        block[ZIGZAG_TO_NATURAL[k]] = extend_sign(ac_bits, size);
        k += 1;
    }
    Ok(())
}

/// Every block codes at least a DC symbol and an AC symbol of one bit each.
const MIN_BLOCK_BITS: usize = 2;

/// Reject a scan too short to hold the frame's blocks, before the
/// coefficient grids for the claimed size are allocated.
fn check_scan_length(data: &[u8], headers: &StreamHeaders) -> Result<()> {
    let frame = &headers.frame;
    let start = headers.scan_start.min(data.len());
    let (end, found) = match skip_scan_data(data, start) {
        Ok(pos) => (pos, data.get(pos + 1).copied()),
        Err(_) => (data.len(), None),
    };
    let blocks: usize = headers
        .scan_components
        .iter()
        .map(|sc| frame.blocks_wide(sc.comp_idx) * frame.blocks_tall(sc.comp_idx))
        .sum();
    if blocks.saturating_mul(MIN_BLOCK_BITS) > (end - start) * 8 {
        trace!(blocks, scan_bytes = end - start, "scan too short for frame");
        return Err(JpegError::UnexpectedMarker { found });
    }
    Ok(())
}

/// Decode the entropy-coded scan into one [`DctGrid`] per component.
///
/// Restart markers must appear every `restart_interval` MCUs and cycle
/// RST0..RST7; the scan must be followed by EOI. Returns the grids and
/// the byte offset just past EOI.
pub fn decode_scan(
    data: &[u8],
    headers: &StreamHeaders,
    tables: &DecodeTables,
) -> Result<(Vec<DctGrid>, usize)> {
    let frame = &headers.frame;
    let scan_components = &headers.scan_components;
    check_scan_length(data, headers)?;

    let mut grids: Vec<DctGrid> = scan_components
        .iter()
        .map(|sc| DctGrid::new(frame.blocks_wide(sc.comp_idx), frame.blocks_tall(sc.comp_idx)))
        .collect();

    // i32 so accumulated diffs of corrupt streams cannot overflow
    let mut dc_pred = vec![0i32; scan_components.len()];
    let mut reader = BitReader::new(data, headers.scan_start);
    let mut expected_rst = 0u8;
    let mut last_restart_mcu = 0usize;

    for_each_block(frame, scan_components, |mcu, sci, br, bc| {
        if mcu != last_restart_mcu && is_restart_boundary(mcu, headers.restart_interval) {
            let expected = RST0 + expected_rst;
            let found = reader.read_marker();
            if found != Some(expected) {
                return Err(JpegError::WrongMarker { expected, found });
            }
            expected_rst = (expected_rst + 1) % 8;
            last_restart_mcu = mcu;
            dc_pred.fill(0);
        }

        let (dc_tab, ac_tab) = tables.get(&scan_components[sci])?;
        decode_block(&mut reader, dc_tab, ac_tab, &mut dc_pred[sci], grids[sci].block_mut(br, bc))?;
        if reader.overrun() {
            return Err(JpegError::UnexpectedMarker {
                found: reader.marker_found(),
            });
        }
        Ok(())
    })?;

    if reader.read_marker() != Some(EOI) {
        return Err(JpegError::NoEoi);
    }
    Ok((grids, reader.position()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::frame::Subsampling;
    use crate::jpeg::marker::{read_headers, write_headers};
    use crate::jpeg::quant::QuantTable;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_grids(frame: &FrameInfo, seed: u64) -> Vec<DctGrid> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..frame.components.len())
            .map(|ci| {
                let mut grid = DctGrid::new(frame.blocks_wide(ci), frame.blocks_tall(ci));
                for c in grid.coeffs_mut().iter_mut() {
                    // Mostly zeros with occasional large values, like real data.
                    *c = match rng.gen_range(0..10) {
                        0..=5 => 0,
                        6..=8 => rng.gen_range(-20..=20),
                        _ => rng.gen_range(-1023..=1023),
                    };
                }
                grid
            })
            .collect()
    }

    fn encode(frame: &FrameInfo, grids: &[DctGrid], dri: u16) -> Vec<u8> {
        let header = write_headers(frame, &QuantTable::luma(1024), &QuantTable::chroma(1024), dri);
        encode_scan(header, frame, grids, dri).unwrap()
    }

    fn decode(data: &[u8]) -> Result<Vec<DctGrid>> {
        let headers = read_headers(data)?;
        let tables = DecodeTables::build(&headers)?;
        decode_scan(data, &headers, &tables).map(|(g, end)| {
            assert_eq!(end, data.len());
            g
        })
    }

    #[test]
    fn coefficients_survive_entropy_coding() {
        for sub in [Subsampling::S420, Subsampling::S422] {
            let frame = FrameInfo::for_encode(48, 32, sub);
            let grids = random_grids(&frame, 3);
            let data = encode(&frame, &grids, 0);
            let back = decode(&data).unwrap();
            for (a, b) in grids.iter().zip(back.iter()) {
                assert_eq!(a.coeffs(), b.coeffs(), "{sub:?}");
            }
        }
    }

    #[test]
    fn long_zero_runs_use_zrl() {
        let frame = FrameInfo::for_encode(16, 16, Subsampling::S420);
        let mut grids = random_grids(&frame, 4);
        let block = grids[0].block_mut(0, 0);
        block.fill(0);
        block[0] = 5;
        block[63] = -1; // 62 zeros in between
        let data = encode(&frame, &grids, 0);
        assert_eq!(decode(&data).unwrap()[0].block(0, 0), grids[0].block(0, 0));
    }

    #[test]
    fn restart_markers_cycle_and_reset_prediction() {
        // 6 x 2 MCUs with an interval of 1 → 11 markers, wrapping past RST7.
        let frame = FrameInfo::for_encode(96, 32, Subsampling::S420);
        let grids = random_grids(&frame, 5);
        let data = encode(&frame, &grids, 1);

        let scan_start = read_headers(&data).unwrap().scan_start;
        let mut rst = Vec::new();
        let mut i = scan_start;
        while i + 1 < data.len() {
            if data[i] == 0xFF && (0xD0..=0xD7).contains(&data[i + 1]) {
                rst.push(data[i + 1]);
                i += 2;
            } else {
                i += 1;
            }
        }
        let expect: Vec<u8> = (0..11).map(|n| 0xD0 + (n % 8) as u8).collect();
        assert_eq!(rst, expect);

        let back = decode(&data).unwrap();
        for (a, b) in grids.iter().zip(back.iter()) {
            assert_eq!(a.coeffs(), b.coeffs());
        }
    }

    #[test]
    fn wrong_restart_marker_is_reported() {
        let frame = FrameInfo::for_encode(32, 16, Subsampling::S420);
        let grids = random_grids(&frame, 6);
        let mut data = encode(&frame, &grids, 1);
        let pos = data
            .windows(2)
            .rposition(|w| w == [0xFF, 0xD0])
            .unwrap();
        data[pos + 1] = 0xD3;
        assert_eq!(
            decode(&data).unwrap_err(),
            JpegError::WrongMarker { expected: 0xD0, found: Some(0xD3) }
        );
    }

    #[test]
    fn missing_eoi() {
        let frame = FrameInfo::for_encode(16, 16, Subsampling::S420);
        let grids = random_grids(&frame, 7);
        let mut data = encode(&frame, &grids, 0);
        data.truncate(data.len() - 2);
        assert_eq!(decode(&data).unwrap_err(), JpegError::NoEoi);
    }

    #[test]
    fn scan_cut_short_before_eoi_is_rejected() {
        let frame = FrameInfo::for_encode(64, 64, Subsampling::S420);
        let grids = random_grids(&frame, 9);
        let data = encode(&frame, &grids, 0);
        let scan_start = read_headers(&data).unwrap().scan_start;
        let keep = scan_start + (data.len() - scan_start) / 4;
        let mut cut = data[..keep].to_vec();
        // Never leave a dangling 0xFF in front of the new EOI.
        while cut.last() == Some(&0xFF) {
            cut.pop();
        }
        cut.extend_from_slice(&[0xFF, 0xD9]);

        let err = decode(&cut).unwrap_err();
        assert!(
            matches!(err, JpegError::UnexpectedMarker { found: Some(0xD9) } | JpegError::HuffmanDecode),
            "{err:?}"
        );
    }

    #[test]
    fn oversized_frame_fails_before_decoding() {
        let small = FrameInfo::for_encode(16, 16, Subsampling::S420);
        let data = encode(&small, &random_grids(&small, 10), 0);
        let mut headers = read_headers(&data).unwrap();
        headers.frame = FrameInfo::for_encode(4096, 4096, Subsampling::S420);
        let tables = DecodeTables::build(&headers).unwrap();
        assert_eq!(
            decode_scan(&data, &headers, &tables).unwrap_err(),
            JpegError::UnexpectedMarker { found: Some(EOI) }
        );
    }

    #[test]
    fn undefined_table_is_bad_tables() {
        let frame = FrameInfo::for_encode(16, 16, Subsampling::S420);
        let data = encode(&frame, &random_grids(&frame, 8), 0);
        let mut headers = read_headers(&data).unwrap();
        headers.ac_specs[1] = None;
        assert!(matches!(DecodeTables::build(&headers), Err(JpegError::BadTables(_))));
    }

    #[test]
    fn encoder_selectors() {
        let frame = FrameInfo::for_encode(8, 8, Subsampling::S400);
        assert_eq!(
            ScanComponent::for_encode(&frame),
            vec![ScanComponent { comp_idx: 0, dc_table: 0, ac_table: 0 }]
        );
        let frame = FrameInfo::for_encode(8, 8, Subsampling::S444);
        let sel = ScanComponent::for_encode(&frame);
        assert_eq!(sel[2], ScanComponent { comp_idx: 2, dc_table: 1, ac_table: 1 });
    }
}
