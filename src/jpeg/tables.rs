// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Quantization and Huffman table parsing/serialization.
//!
//! Handles DQT (Define Quantization Table) and DHT (Define Huffman Table)
//! marker segments. Only 8-bit quantization precision is accepted, and
//! Huffman table ids are limited to the two baseline slots (0 and 1).
//! Both segment kinds may carry several tables.

use super::error::{JpegError, Result};
use super::huffman::{
    AC_CHROMA_BITS, AC_CHROMA_VALUES, AC_LUMA_BITS, AC_LUMA_VALUES, DC_CHROMA_BITS,
    DC_LUMA_BITS, DC_VALUES,
};
use super::quant::QuantTable;
use super::zigzag::{to_natural, to_zigzag};

/// Parse a DQT marker segment body (after the 2-byte length).
///
/// Returns a list of (table_id, QuantTable) pairs.
pub fn parse_dqt(data: &[u8]) -> Result<Vec<(u8, QuantTable)>> {
    let mut tables = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let pq_tq = data[pos];
        pos += 1;
        let precision = pq_tq >> 4;
        let table_id = pq_tq & 0x0F;

        if precision != 0 {
            return Err(JpegError::BadTables("16-bit quantization table"));
        }
        if table_id > 3 {
            return Err(JpegError::BadTables("DQT table id out of range"));
        }
        if pos + 64 > data.len() {
            return Err(JpegError::UnexpectedEof);
        }

        let mut zigzag = [0u16; 64];
        for (v, &b) in zigzag.iter_mut().zip(&data[pos..pos + 64]) {
            *v = b as u16;
        }
        pos += 64;

        tables.push((table_id, QuantTable::new(to_natural(&zigzag))));
    }

    Ok(tables)
}

/// Write one DQT marker segment (including 0xFFDB and length) holding
/// every given table, values in zigzag order.
pub fn write_dqt(tables: &[(u8, &QuantTable)]) -> Vec<u8> {
    let length = 2 + tables.len() * 65;
    let mut out = Vec::with_capacity(2 + length);
    out.extend_from_slice(&[0xFF, 0xDB]);
    out.extend_from_slice(&(length as u16).to_be_bytes());

    for &(table_id, qt) in tables {
        out.push(table_id & 0x0F);
        out.extend(to_zigzag(&qt.values).iter().map(|&v| v.min(255) as u8));
    }

    out
}

/// Parsed Huffman table specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanSpec {
    /// Table class: 0 = DC, 1 = AC.
    pub class: u8,
    /// Table ID (0 or 1).
    pub id: u8,
    /// Number of codes of each length (1–16).
    pub bits: [u8; 16],
    /// Symbol values in order of increasing code length.
    pub huffval: Vec<u8>,
}

impl HuffmanSpec {
    fn new(class: u8, id: u8, bits: &[u8; 16], huffval: &[u8]) -> Self {
        Self {
            class,
            id,
            bits: *bits,
            huffval: huffval.to_vec(),
        }
    }
}

/// The four Annex K tables: DC luma, DC chroma, AC luma, AC chroma.
///
/// Used by the encoder and substituted by the decoder for streams that
/// omit DHT (typical of MJPEG cameras).
pub fn standard_specs() -> [HuffmanSpec; 4] {
    [
        HuffmanSpec::new(0, 0, &DC_LUMA_BITS, &DC_VALUES),
        HuffmanSpec::new(0, 1, &DC_CHROMA_BITS, &DC_VALUES),
        HuffmanSpec::new(1, 0, &AC_LUMA_BITS, &AC_LUMA_VALUES),
        HuffmanSpec::new(1, 1, &AC_CHROMA_BITS, &AC_CHROMA_VALUES),
    ]
}

/// Parse a DHT marker segment body (after the 2-byte length).
pub fn parse_dht(data: &[u8]) -> Result<Vec<HuffmanSpec>> {
    let mut specs = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let tc_th = data[pos];
        pos += 1;
        let class = tc_th >> 4;
        let id = tc_th & 0x0F;

        if class > 1 || id > 1 {
            return Err(JpegError::BadTables("DHT class or id out of range"));
        }

        if pos + 16 > data.len() {
            return Err(JpegError::UnexpectedEof);
        }
        let mut bits = [0u8; 16];
        bits.copy_from_slice(&data[pos..pos + 16]);
        pos += 16;

        let total: usize = bits.iter().map(|&b| b as usize).sum();
        if total > 256 {
            return Err(JpegError::BadTables("DHT declares more than 256 symbols"));
        }
        if pos + total > data.len() {
            return Err(JpegError::UnexpectedEof);
        }
        let huffval = data[pos..pos + total].to_vec();
        pos += total;

        specs.push(HuffmanSpec {
            class,
            id,
            bits,
            huffval,
        });
    }

    Ok(specs)
}

/// Write one DHT marker segment (including 0xFFC4 and length) holding
/// every given table.
pub fn write_dht(specs: &[HuffmanSpec]) -> Vec<u8> {
    let length: usize = 2 + specs.iter().map(|s| 17 + s.huffval.len()).sum::<usize>();
    let mut out = Vec::with_capacity(2 + length);
    out.extend_from_slice(&[0xFF, 0xC4]);
    out.extend_from_slice(&(length as u16).to_be_bytes());

    for spec in specs {
        out.push((spec.class << 4) | (spec.id & 0x0F));
        out.extend_from_slice(&spec.bits);
        out.extend_from_slice(&spec.huffval);
    }

    out
}
