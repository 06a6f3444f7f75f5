// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Bit-level I/O for JPEG entropy-coded data.
//!
//! Provides [`BitReader`] for decoding and [`BitWriter`] for encoding the
//! entropy-coded scan data. Both handle JPEG byte-stuffing (0xFF -> 0xFF 0x00)
//! and operate in MSB-first bit order on a 32-bit accumulator.

/// Bit-level reader for JPEG entropy-coded data.
///
/// A `0xFF 0x00` pair collapses to one `0xFF` data byte. A `0xFF` followed by
/// anything else is a marker: the reader stops in front of it and feeds zero
/// bits from then on, so a Huffman lookup that peeks past the end of a
/// segment never consumes the marker. [`BitReader::read_marker`] picks it up.
///
/// Zero fill is only there to satisfy peeks. A well-formed segment ends with
/// its own 1-bit padding, so decoding never consumes filled bits;
/// [`BitReader::overrun`] reports when it did.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bit buffer, MSB-aligned at bit `bits_left - 1`.
    buf: u32,
    bits_left: u8,
    /// Marker byte seen while filling, not yet consumed.
    marker_found: Option<u8>,
    /// Zero bits fed since the reader stopped at a marker or the end of data.
    filled: u32,
}

impl<'a> BitReader<'a> {
    /// `pos` is the first byte of entropy-coded data (right after the SOS header).
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            buf: 0,
            bits_left: 0,
            marker_found: None,
            filled: 0,
        }
    }

    /// Read `count` bits (1–16), right-aligned.
    pub fn read_bits(&mut self, count: u8) -> u16 {
        let val = self.peek_bits(count);
        self.bits_left -= count;
        val
    }

    /// Peek at the next `count` bits (1–16) without consuming them.
    pub fn peek_bits(&mut self, count: u8) -> u16 {
        debug_assert!((1..=16).contains(&count));
        while self.bits_left < count {
            self.fill_byte();
        }
        let val = (self.buf >> (self.bits_left - count)) & ((1u32 << count) - 1);
        val as u16
    }

    /// Discard `count` bits that were already peeked.
    pub fn skip_bits(&mut self, count: u8) {
        debug_assert!(count <= self.bits_left);
        self.bits_left -= count;
    }

    /// Current byte position in the underlying data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether decoding has consumed zero fill, i.e. ran past the end of the
    /// segment's entropy-coded data.
    pub fn overrun(&self) -> bool {
        self.filled > self.bits_left as u32
    }

    /// The marker the reader stopped in front of, if any.
    pub fn marker_found(&self) -> Option<u8> {
        self.marker_found
    }

    /// Drop the remaining bits of the current segment and consume the next
    /// marker. Fill bytes (`0xFF 0xFF ...`) before the marker are skipped.
    ///
    /// Returns `None` if the next bytes are not a marker or data ran out.
    pub fn read_marker(&mut self) -> Option<u8> {
        self.buf = 0;
        self.bits_left = 0;
        self.marker_found = None;
        self.filled = 0;

        while self.pos + 1 < self.data.len() && self.data[self.pos] == 0xFF {
            let next = self.data[self.pos + 1];
            match next {
                0xFF => self.pos += 1,
                0x00 => return None,
                m => {
                    self.pos += 2;
                    return Some(m);
                }
            }
        }
        None
    }

    fn fill_byte(&mut self) {
        let byte = if self.marker_found.is_some() || self.pos >= self.data.len() {
            self.filled += 8;
            0
        } else if self.data[self.pos] != 0xFF {
            self.pos += 1;
            self.data[self.pos - 1]
        } else {
            match self.data.get(self.pos + 1) {
                Some(0x00) => {
                    self.pos += 2;
                    0xFF
                }
                Some(&m) => {
                    self.marker_found = Some(m);
                    self.filled += 8;
                    0
                }
                None => {
                    self.pos = self.data.len();
                    self.filled += 8;
                    0
                }
            }
        };
        self.buf = (self.buf << 8) | byte as u32;
        self.bits_left += 8;
    }
}

/// Bit-level writer for JPEG entropy-coded data.
///
/// Every `0xFF` data byte is followed by a stuffed `0x00`.
pub struct BitWriter {
    output: Vec<u8>,
    acc: u32,
    bits: u8,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_output(Vec::new())
    }

    /// Append entropy-coded data after bytes already in `output` (the headers).
    pub fn with_output(output: Vec<u8>) -> Self {
        Self {
            output,
            acc: 0,
            bits: 0,
        }
    }

    /// Write `count` bits (1–16) from the low bits of `value`, MSB first.
    pub fn write_bits(&mut self, value: u16, count: u8) {
        debug_assert!((1..=16).contains(&count));
        let mask = (1u32 << count) - 1;
        self.acc = (self.acc << count) | (value as u32 & mask);
        self.bits += count;
        while self.bits >= 8 {
            self.bits -= 8;
            let byte = (self.acc >> self.bits) as u8;
            self.emit_byte(byte);
        }
    }

    /// Pad a partial byte with 1-bits.
    pub fn align(&mut self) {
        if self.bits > 0 {
            let pad = 8 - self.bits;
            self.write_bits((1u16 << pad) - 1, pad);
        }
    }

    /// Align, then write a two-byte marker without stuffing.
    pub fn write_marker(&mut self, marker: u8) {
        self.align();
        self.output.push(0xFF);
        self.output.push(marker);
    }

    /// Pad the remaining bits with 1s and return the output.
    pub fn flush(mut self) -> Vec<u8> {
        self.align();
        self.output
    }

    fn emit_byte(&mut self, byte: u8) {
        self.output.push(byte);
        if byte == 0xFF {
            self.output.push(0x00);
        }
    }
}
