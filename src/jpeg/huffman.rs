// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Huffman coding tables for JPEG entropy encoding and decoding.
//!
//! The encoder always uses the ITU-T T.81 Annex K example tables, which
//! are also what the DHT segment carries. Codes are derived canonically
//! from the Annex K `BITS`/`HUFFVAL` lists (Annex C), never hand-coded.
//!
//! Decoding resolves codes of up to [`LOOKUP_BITS`] bits with one table
//! lookup and falls back to a canonical `maxcode`/`valptr` walk for the
//! longer ones.

use super::bitio::BitReader;
use super::error::{JpegError, Result};

/// Annex K.3 luminance DC code counts per length.
pub const DC_LUMA_BITS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
/// Annex K.4 chrominance DC code counts per length.
pub const DC_CHROMA_BITS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
/// DC symbols are the magnitude categories 0–11 for both tables.
pub const DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Annex K.5 luminance AC code counts per length.
pub const AC_LUMA_BITS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7d];
/// Annex K.5 luminance AC symbols, `(run << 4) | size`.
pub const AC_LUMA_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06,
    0x13, 0x51, 0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08,
    0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0, 0x24, 0x33, 0x62, 0x72,
    0x82, 0x09, 0x0a, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45,
    0x46, 0x47, 0x48, 0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6a, 0x73, 0x74, 0x75,
    0x76, 0x77, 0x78, 0x79, 0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3,
    0xa4, 0xa5, 0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6,
    0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9,
    0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf1, 0xf2, 0xf3, 0xf4,
    0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa,];

/// Annex K.6 chrominance AC code counts per length.
pub const AC_CHROMA_BITS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
/// Annex K.6 chrominance AC symbols.
pub const AC_CHROMA_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41,
    0x51, 0x07, 0x61, 0x71, 0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0, 0x15, 0x62, 0x72, 0xd1,
    0x0a, 0x16, 0x24, 0x34, 0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44,
    0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6a, 0x73, 0x74,
    0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a,
    0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4,
    0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5, 0xc6, 0xc7,
    0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf2, 0xf3, 0xf4,
    0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa,];

/// AC end-of-block symbol.
pub const EOB: u8 = 0x00;
/// AC run of sixteen zeros.
pub const ZRL: u8 = 0xF0;

/// Width of the decoder's direct lookup table.
pub const LOOKUP_BITS: u8 = 10;

/// Result of probing the direct lookup table with [`LOOKUP_BITS`] bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// A complete code of `len` bits sits at the front of the window.
    Symbol { symbol: u8, len: u8 },
    /// The window is a prefix of a longer code (or of no code at all).
    NeedMoreBits,
}

/// Huffman decode table.
///
/// `maxcode[l]` is one past the last code of length `l` (exclusive bound,
/// index 0 unused), `valptr[l]` the index in `vals` of the first symbol of
/// that length. The first code of length `l` is `maxcode[l - 1] << 1`.
pub struct HuffmanDecodeTable {
    /// `(len << 8) | symbol`, 0 when the code is longer than the table.
    lookup: Box<[u16; 1 << LOOKUP_BITS]>,
    maxcode: [u32; 17],
    valptr: [u16; 17],
    vals: Vec<u8>,
}

impl HuffmanDecodeTable {
    /// Build a decode table from DHT counts and symbols.
    ///
    /// Rejects tables whose counts do not match the symbol list or that
    /// assign more codes to a length than the code space allows.
    pub fn build(bits: &[u8; 16], huffval: &[u8]) -> Result<Self> {
        let total: usize = bits.iter().map(|&b| b as usize).sum();
        if total != huffval.len() || total > 256 {
            return Err(JpegError::BadTables("DHT symbol count mismatch"));
        }

        let mut lookup = Box::new([0u16; 1 << LOOKUP_BITS]);
        let mut maxcode = [0u32; 17];
        let mut valptr = [0u16; 17];

        let mut code: u32 = 0;
        let mut k = 0usize;
        for len in 1..=16u8 {
            let count = bits[len as usize - 1] as u32;
            valptr[len as usize] = k as u16;
            if code + count > (1u32 << len) {
                return Err(JpegError::BadTables("overfull Huffman table"));
            }
            for _ in 0..count {
                if len <= LOOKUP_BITS {
                    let shift = LOOKUP_BITS - len;
                    let base = (code << shift) as usize;
                    let entry = ((len as u16) << 8) | huffval[k] as u16;
                    lookup[base..base + (1 << shift)].fill(entry);
                }
                code += 1;
                k += 1;
            }
            maxcode[len as usize] = code;
            code <<= 1;
        }

        Ok(Self {
            lookup,
            maxcode,
            valptr,
            vals: huffval.to_vec(),
        })
    }

    /// Look up the direct table with the next [`LOOKUP_BITS`] bits.
    pub fn lookup(&self, bits: u16) -> Lookup {
        let entry = self.lookup[bits as usize & ((1 << LOOKUP_BITS) - 1)];
        if entry == 0 {
            Lookup::NeedMoreBits
        } else {
            Lookup::Symbol {
                symbol: entry as u8,
                len: (entry >> 8) as u8,
            }
        }
    }

    /// Resolve a code of exactly `len` bits through the canonical tables.
    ///
    /// Returns `None` if `code` is not a complete code of that length.
    pub fn canonical(&self, code: u32, len: u8) -> Option<u8> {
        let len = len as usize;
        if !(1..=16).contains(&len) {
            return None;
        }
        let first = self.maxcode[len - 1] << 1;
        if code < first || code >= self.maxcode[len] {
            return None;
        }
        let idx = self.valptr[len] as usize + (code - first) as usize;
        self.vals.get(idx).copied()
    }

    /// Decode one symbol from the bit stream.
    pub fn decode(&self, reader: &mut BitReader) -> Result<u8> {
        let peek = reader.peek_bits(LOOKUP_BITS);
        if let Lookup::Symbol { symbol, len } = self.lookup(peek) {
            reader.skip_bits(len);
            return Ok(symbol);
        }

        reader.skip_bits(LOOKUP_BITS);
        let mut code = peek as u32;
        for len in LOOKUP_BITS + 1..=16 {
            code = (code << 1) | reader.read_bits(1) as u32;
            if code < self.maxcode[len as usize] {
                return self.canonical(code, len).ok_or(JpegError::HuffmanDecode);
            }
        }
        Err(JpegError::HuffmanDecode)
    }
}

/// Huffman encode table: maps symbol → (code_bits, code_length).
pub struct HuffmanEncodeTable {
    /// Length 0 means the symbol has no code.
    table: [(u16, u8); 256],
}

impl HuffmanEncodeTable {
    /// Build an encode table from DHT counts and symbols (Annex C.2).
    pub fn build(bits: &[u8; 16], huffval: &[u8]) -> Self {
        let mut table = [(0u16, 0u8); 256];
        let mut code: u32 = 0;
        let mut si = 0;

        for length in 1..=16u8 {
            let count = bits[(length - 1) as usize] as usize;
            for _ in 0..count {
                if si < huffval.len() {
                    table[huffval[si] as usize] = (code as u16, length);
                    si += 1;
                }
                code += 1;
            }
            code <<= 1;
        }

        Self { table }
    }

    /// Encode a symbol: returns (code_bits, code_length).
    pub fn encode(&self, symbol: u8) -> Result<(u16, u8)> {
        let (code, len) = self.table[symbol as usize];
        if len == 0 {
            Err(JpegError::BadTables("Huffman table missing code for symbol"))
        } else {
            Ok((code, len))
        }
    }
}

/// Extend a signed value from its JPEG "additional bits" representation.
///
/// Per ITU-T T.81 Table F.1: if the high bit is 0, the value is negative.
pub fn extend_sign(value: u16, bits: u8) -> i16 {
    if bits == 0 {
        return 0;
    }
    let half = 1i32 << (bits - 1);
    if (value as i32) < half {
        (value as i32 - (1i32 << bits) + 1) as i16
    } else {
        value as i16
    }
}

/// Encode a signed value into JPEG "additional bits" representation.
/// Returns (magnitude_bits, category/size).
pub fn encode_value(value: i16) -> (u16, u8) {
    if value == 0 {
        return (0, 0);
    }
    let abs = value.unsigned_abs();
    let size = 16 - abs.leading_zeros() as u8;
    // Negative values are sent as the one's complement of the magnitude.
    let bits = if value > 0 { value as u16 } else { (value as i32 - 1) as u16 };
    (bits & ((1u32 << size) - 1) as u16, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::bitio::BitWriter;

    fn all_tables() -> [(&'static str, &'static [u8; 16], &'static [u8]); 4] {
        [
            ("dc luma", &DC_LUMA_BITS, &DC_VALUES),
            ("dc chroma", &DC_CHROMA_BITS, &DC_VALUES),
            ("ac luma", &AC_LUMA_BITS, &AC_LUMA_VALUES),
            ("ac chroma", &AC_CHROMA_BITS, &AC_CHROMA_VALUES),
        ]
    }

    fn codes(bits: &[u8; 16], vals: &[u8]) -> Vec<(u8, u16, u8)> {
        let enc = HuffmanEncodeTable::build(bits, vals);
        vals.iter()
            .map(|&s| {
                let (code, len) = enc.encode(s).unwrap();
                (s, code, len)
            })
            .collect()
    }

    #[test]
    fn symbol_counts_match_bits() {
        for (name, bits, vals) in all_tables() {
            let total: usize = bits.iter().map(|&b| b as usize).sum();
            assert_eq!(total, vals.len(), "{name}");
        }
    }

    #[test]
    fn dc_codes_match_legacy_tables() {
        let luma: Vec<(u16, u8)> = codes(&DC_LUMA_BITS, &DC_VALUES).iter().map(|c| (c.1, c.2)).collect();
        assert_eq!(
            luma,
            vec![
                (0x000, 2), (0x002, 3), (0x003, 3), (0x004, 3), (0x005, 3), (0x006, 3),
                (0x00E, 4), (0x01E, 5), (0x03E, 6), (0x07E, 7), (0x0FE, 8), (0x1FE, 9),
            ]
        );
        let chroma: Vec<(u16, u8)> = codes(&DC_CHROMA_BITS, &DC_VALUES).iter().map(|c| (c.1, c.2)).collect();
        assert_eq!(
            chroma,
            vec![
                (0x000, 2), (0x001, 2), (0x002, 2), (0x006, 3), (0x00E, 4), (0x01E, 5),
                (0x03E, 6), (0x07E, 7), (0x0FE, 8), (0x1FE, 9), (0x3FE, 10), (0x7FE, 11),
            ]
        );
    }

    #[test]
    fn ac_reserved_codes_match_annex_k() {
        let luma = HuffmanEncodeTable::build(&AC_LUMA_BITS, &AC_LUMA_VALUES);
        assert_eq!(luma.encode(EOB).unwrap(), (0x000A, 4));
        assert_eq!(luma.encode(ZRL).unwrap(), (0x07F9, 11));
        assert_eq!(luma.encode(0x01).unwrap(), (0x0000, 2));
        assert_eq!(luma.encode(0x11).unwrap(), (0x000C, 4));
        assert_eq!(luma.encode(0xFA).unwrap(), (0xFFFE, 16));

        let chroma = HuffmanEncodeTable::build(&AC_CHROMA_BITS, &AC_CHROMA_VALUES);
        assert_eq!(chroma.encode(EOB).unwrap(), (0x0000, 2));
        assert_eq!(chroma.encode(ZRL).unwrap(), (0x03FA, 10));
        assert_eq!(chroma.encode(0x31).unwrap(), (0x001B, 5));
    }

    #[test]
    fn every_ac_run_size_pair_has_a_code() {
        for (_, bits, vals) in &all_tables()[2..] {
            let enc = HuffmanEncodeTable::build(bits, vals);
            for run in 0..16u8 {
                for size in 1..=10u8 {
                    assert!(enc.encode((run << 4) | size).is_ok(), "run {run} size {size}");
                }
            }
        }
    }

    #[test]
    fn tables_are_prefix_free() {
        for (name, bits, vals) in all_tables() {
            let cs = codes(bits, vals);
            for &(sa, ca, la) in &cs {
                for &(sb, cb, lb) in &cs {
                    if sa == sb || la > lb {
                        continue;
                    }
                    assert_ne!(cb >> (lb - la), ca, "{name}: {sa:#x} prefixes {sb:#x}");
                }
            }
        }
    }

    #[test]
    fn lookup_agrees_with_canonical_walk_exhaustively() {
        for (name, bits, vals) in all_tables() {
            let dec = HuffmanDecodeTable::build(bits, vals).unwrap();
            let cs = codes(bits, vals);
            for window in 0u16..1024 {
                // Shortest complete code at the front of the window, if any.
                let canonical = (1..=LOOKUP_BITS).find_map(|len| {
                    let code = (window >> (LOOKUP_BITS - len)) as u32;
                    dec.canonical(code, len).map(|s| (s, len))
                });
                match dec.lookup(window) {
                    Lookup::Symbol { symbol, len } => {
                        assert_eq!(canonical, Some((symbol, len)), "{name}: window {window:#b}");
                    }
                    Lookup::NeedMoreBits => {
                        assert_eq!(canonical, None, "{name}: window {window:#b}");
                        // Every miss is the prefix of a longer code, or lies
                        // in the unused tail of the canonical code space.
                        let prefixes_longer = cs.iter().any(|&(_, c, l)| {
                            l > LOOKUP_BITS && (c >> (l - LOOKUP_BITS)) == window
                        });
                        let past_all_codes = cs.iter().all(|&(_, c, l)| {
                            let aligned = if l > LOOKUP_BITS {
                                c >> (l - LOOKUP_BITS)
                            } else {
                                c << (LOOKUP_BITS - l)
                            };
                            aligned < window
                        });
                        assert!(prefixes_longer || past_all_codes, "{name}: dead window {window:#b}");
                    }
                }
            }
        }
    }

    #[test]
    fn decode_every_symbol_through_bitstream() {
        for (name, bits, vals) in all_tables() {
            let dec = HuffmanDecodeTable::build(bits, vals).unwrap();
            let mut w = BitWriter::new();
            for (_, code, len) in codes(bits, vals) {
                w.write_bits(code, len);
            }
            let stream = w.flush();
            let mut r = BitReader::new(&stream, 0);
            for &sym in vals {
                assert_eq!(dec.decode(&mut r).unwrap(), sym, "{name}");
            }
        }
    }

    #[test]
    fn rejects_malformed_tables() {
        // Three 1-bit codes cannot exist.
        let mut bits = [0u8; 16];
        bits[0] = 3;
        assert!(matches!(
            HuffmanDecodeTable::build(&bits, &[1, 2, 3]),
            Err(JpegError::BadTables(_))
        ));
        // Counts and symbol list disagree.
        assert!(HuffmanDecodeTable::build(&DC_LUMA_BITS, &DC_VALUES[..11]).is_err());
    }

    #[test]
    fn invalid_code_is_an_error() {
        // Luma DC has no 9-bit code of all ones.
        let dec = HuffmanDecodeTable::build(&DC_LUMA_BITS, &DC_VALUES).unwrap();
        let data = [0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00];
        let mut r = BitReader::new(&data, 0);
        assert_eq!(dec.decode(&mut r), Err(JpegError::HuffmanDecode));
    }

    #[test]
    fn extend_sign_values() {
        assert_eq!(extend_sign(0, 1), -1);
        assert_eq!(extend_sign(1, 1), 1);
        assert_eq!(extend_sign(0, 3), -7);
        assert_eq!(extend_sign(3, 3), -4);
        assert_eq!(extend_sign(4, 3), 4);
        assert_eq!(extend_sign(7, 3), 7);
        assert_eq!(extend_sign(0, 0), 0);
    }

    #[test]
    fn encode_value_inverts_extend_sign() {
        for v in -2047i16..=2047 {
            let (bits, size) = encode_value(v);
            assert!(size <= 11);
            assert_eq!(extend_sign(bits, size), v, "value {v}");
        }
    }
}
