// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Quantization tables.
//!
//! Tables are derived from the ITU-T T.81 Annex K reference matrices and a
//! fixed-point scale factor where 1024 reproduces the reference matrix.
//! [`quality_scale`] maps the conventional 1–100 quality setting onto
//! that scale.

/// Annex K luminance matrix, natural order.
pub const LUMA_BASE: [u8; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Annex K chrominance matrix, natural order.
pub const CHROMA_BASE: [u8; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Scale factor that leaves the base matrices unchanged.
pub const UNIT_SCALE: u32 = 1024;

/// Map a 1–100 quality setting to a table scale factor.
///
/// Out-of-range values clamp: 0 behaves as 1, anything above 100 as 100.
/// Uses the IJG curve (`5000/q` below 50, `200 - 2q` above), expressed
/// in 1/1024 units so quality 50 yields [`UNIT_SCALE`].
pub fn quality_scale(quality: u8) -> u32 {
    let q = quality.clamp(1, 100) as u32;
    let percent = if q < 50 { 5000 / q } else { 200 - 2 * q };
    percent * UNIT_SCALE / 100
}

/// Quantization table: 64 values in natural (row-major) order.
///
/// Every entry is at least 1. The encoder divides through the Q15
/// reciprocals, which are kept alongside the divisors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantTable {
    /// Divisors, indexed by row * 8 + col.
    pub values: [u16; 64],
    recip: [u16; 64],
}

impl QuantTable {
    /// Wrap explicit divisors. Zero entries are raised to 1.
    pub fn new(values: [u16; 64]) -> Self {
        let mut values = values;
        for v in values.iter_mut() {
            *v = (*v).max(1);
        }
        let recip = values.map(reciprocal);
        Self { values, recip }
    }

    /// Scale a base matrix: `clamp((base * scale + 0x200) >> 10, 1, 255)`.
    pub fn scaled(base: &[u8; 64], scale: u32) -> Self {
        let values = base.map(|b| ((b as u32 * scale + 0x200) >> 10).clamp(1, 255) as u16);
        Self::new(values)
    }

    pub fn luma(scale: u32) -> Self {
        Self::scaled(&LUMA_BASE, scale)
    }

    pub fn chroma(scale: u32) -> Self {
        Self::scaled(&CHROMA_BASE, scale)
    }

    /// Q15 reciprocals, `0x8000 / values[i]`.
    pub fn reciprocals(&self) -> &[u16; 64] {
        &self.recip
    }

    /// Quantize one block of forward-DCT output, both in natural order.
    ///
    /// Rounds to nearest through the reciprocal: `(c * r + 0x4000) >> 15`.
    pub fn quantize(&self, coeffs: &[i32; 64], out: &mut [i16]) {
        debug_assert_eq!(out.len(), 64);
        for i in 0..64 {
            let q = (coeffs[i] * self.recip[i] as i32 + 0x4000) >> 15;
            out[i] = q.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
    }
}

fn reciprocal(value: u16) -> u16 {
    // 0x8000 / 1 still fits in u16.
    (0x8000u32 / value.max(1) as u32) as u16
}
