// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Fixed-point 8×8 DCT and coefficient storage.
//!
//! The forward transform is a separable integer butterfly with cosine
//! constants in 2^-10 units: the row pass keeps the even terms at full
//! scale and rounds the odd/even AC products by `>> 10`, the column pass
//! rounds DC terms by `>> 3` and AC terms by `>> 13`. Net output equals
//! the T.81 DCT, so quantization divides by the table entry directly.
//!
//! The inverse transform is an AAN-style butterfly in 2^-11 fixed point.
//! Its row/column scale factors are folded into the dequantization table
//! ([`IdctTable`]), together with the chroma-to-RGB gains for Cb/Cr, so
//! the color packer only adds and clamps.

use super::quant::QuantTable;

const C1: i32 = 1420;
const C2: i32 = 1338;
const C3: i32 = 1204;
const C5: i32 = 805;
const C6: i32 = 554;
const C7: i32 = 283;

const ROW_ROUND: i32 = 1 << 9;
const COL_ROUND: i32 = 1 << 12;

/// Forward DCT of one block of level-shifted samples (natural order).
pub fn forward_dct(samples: &[i16; 64]) -> [i32; 64] {
    let mut d = [0i32; 64];
    for (o, s) in d.iter_mut().zip(samples.iter()) {
        *o = *s as i32;
    }

    for row in d.chunks_exact_mut(8) {
        let x = [row[0], row[1], row[2], row[3], row[4], row[5], row[6], row[7]];
        let out = butterfly(&x, 0, ROW_ROUND, 10);
        row.copy_from_slice(&out);
    }

    for col in 0..8 {
        let x = [
            d[col],
            d[col + 8],
            d[col + 16],
            d[col + 24],
            d[col + 32],
            d[col + 40],
            d[col + 48],
            d[col + 56],
        ];
        let out = butterfly(&x, 3, COL_ROUND, 13);
        for (k, v) in out.into_iter().enumerate() {
            d[col + 8 * k] = v;
        }
    }
    d
}

/// One 8-point pass. Even outputs 0/4 are shifted by `dc_shift` (rounded
/// when non-zero), all other outputs by `ac_shift` after adding `round`.
fn butterfly(x: &[i32; 8], dc_shift: u32, round: i32, ac_shift: u32) -> [i32; 8] {
    let s07 = x[0] + x[7];
    let d07 = x[0] - x[7];
    let s16 = x[1] + x[6];
    let d16 = x[1] - x[6];
    let s25 = x[2] + x[5];
    let d25 = x[2] - x[5];
    let s34 = x[3] + x[4];
    let d34 = x[3] - x[4];

    let e0 = s07 + s34;
    let e1 = s07 - s34;
    let e2 = s16 + s25;
    let e3 = s16 - s25;

    let dc = |v: i32| if dc_shift == 0 { v } else { (v + (1 << (dc_shift - 1))) >> dc_shift };
    let ac = |v: i32| (v + round) >> ac_shift;

    [
        dc(e0 + e2),
        ac(d07 * C1 + d16 * C3 + d25 * C5 + d34 * C7),
        ac(e1 * C2 + e3 * C6),
        ac(d07 * C3 - d16 * C7 - d25 * C1 - d34 * C5),
        dc(e0 - e2),
        ac(d07 * C5 - d16 * C1 + d25 * C7 + d34 * C3),
        ac(e1 * C6 - e3 * C2),
        ac(d07 * C7 - d16 * C5 + d25 * C3 - d34 * C1),
    ]
}

const ISHIFT: u32 = 11;

#[inline]
fn imult(a: i64, b: i64) -> i64 {
    (a * b) >> ISHIFT
}

// Constants below are round(x * 2^11).
const S22: i64 = 1567; // 2 * sin(pi/8)
const C22: i64 = 3784; // 2 * cos(pi/8)
const IC4: i64 = 2896; // 1 / cos(pi/4)

/// AAN prescale factors, `cos(k*pi/16) / 2` (k > 0) and `1 / (2*sqrt(2))`.
const AA: [i64; 8] = [724, 1004, 946, 851, 724, 569, 392, 200];

const CB_GAIN: i64 = 3629; // 1.772
const CR_GAIN: i64 = 2871; // 1.402
const LUMA_OFFSET: i64 = 263_168; // 128.5
const CHROMA_OFFSET: i64 = 1024; // 0.5

/// Frequency order in which the inverse butterfly expects its inputs.
const IDCT_ORDER: [usize; 8] = [0, 4, 2, 6, 5, 1, 7, 3];

/// Which plane an [`IdctTable`] reconstructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// Output is the 0–255 sample.
    Luma,
    /// Output is `1.772 * (Cb - 128)`.
    Cb,
    /// Output is `1.402 * (Cr - 128)`.
    Cr,
}

/// Dequantization table with the IDCT prescale folded in.
#[derive(Debug, Clone)]
pub struct IdctTable {
    /// Natural order.
    values: [i64; 64],
    /// Added to the DC path before the final shift.
    offset: i64,
}

impl IdctTable {
    pub fn new(qt: &QuantTable, plane: Plane) -> Self {
        let mut values = [0i64; 64];
        for r in 0..8 {
            for c in 0..8 {
                values[r * 8 + c] = qt.values[r * 8 + c] as i64 * imult(AA[r], AA[c]);
            }
        }
        let gain = match plane {
            Plane::Luma => None,
            Plane::Cb => Some(CB_GAIN),
            Plane::Cr => Some(CR_GAIN),
        };
        if let Some(gain) = gain {
            for v in values.iter_mut() {
                *v = imult(*v, gain);
            }
        }
        let offset = match plane {
            // +128 level shift, +0.5 rounding
            Plane::Luma => LUMA_OFFSET,
            Plane::Cb | Plane::Cr => CHROMA_OFFSET,
        };
        Self { values, offset }
    }
}

/// Dequantize and inverse-transform one block (natural order in and out).
///
/// Blocks whose AC coefficients are all zero take a DC-only path that fills
/// the block with one value, within one of the full transform.
pub fn inverse_dct(coeffs: &[i16], table: &IdctTable, out: &mut [i16; 64]) {
    debug_assert_eq!(coeffs.len(), 64);
    if coeffs[1..].iter().all(|&c| c == 0) {
        let v = (table.offset + coeffs[0] as i64 * table.values[0]) >> ISHIFT;
        out.fill(saturate(v));
        return;
    }

    let mut tmp = [0i64; 64];
    for (i, &col) in IDCT_ORDER.iter().enumerate() {
        let mut t = [0i64; 8];
        for (k, &row) in IDCT_ORDER.iter().enumerate() {
            let idx = row * 8 + col;
            t[k] = coeffs[idx] as i64 * table.values[idx];
        }
        if i == 0 {
            t[0] += table.offset;
        }
        let o = idct_pass(t);
        for k in 0..8 {
            tmp[k * 8 + i] = o[k];
        }
    }

    for r in 0..8 {
        let mut t = [0i64; 8];
        t.copy_from_slice(&tmp[r * 8..r * 8 + 8]);
        let o = idct_pass(t);
        for k in 0..8 {
            out[r * 8 + k] = saturate(o[k] >> ISHIFT);
        }
    }
}

/// 8-point inverse butterfly. Inputs in [`IDCT_ORDER`], outputs spatial.
#[rustfmt::skip]
fn idct_pass(t: [i64; 8]) -> [i64; 8] {
    let [mut t0, mut t1, mut t2, mut t3, mut t4, mut t5, mut t6, mut t7] = t;
    let mut tt;

    tt = t0 + t1; t1 = t0 - t1; t0 = tt;
    tt = t2 - t3; t3 += t2; t2 = tt;
    t2 = imult(t2, IC4) - t3;
    tt = t0 + t3; t3 = t0 - t3; t0 = tt;
    tt = t1 + t2; t2 = t1 - t2; t1 = tt;

    tt = t4 - t7; t7 += t4; t4 = tt;
    tt = t5 + t6; t6 = t5 - t6; t5 = tt;
    tt = t5 - t7; t7 += t5; t5 = tt;
    t5 = imult(t5, IC4);
    tt = imult(t4 + t6, S22);
    t4 = imult(t4, C22 - S22) + tt;
    t6 = imult(t6, C22 + S22) - tt;
    t6 -= t7;
    t5 -= t6;
    t4 -= t5;

    [t0 + t7, t1 + t6, t2 + t5, t3 + t4, t3 - t4, t2 - t5, t1 - t6, t0 - t7]
}

fn saturate(v: i64) -> i16 {
    v.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Grid of quantized DCT coefficients for one image component.
///
/// Blocks are stored in block-raster order; within a block, coefficients
/// are in natural order.
#[derive(Debug, Clone)]
pub struct DctGrid {
    blocks_wide: usize,
    blocks_tall: usize,
    coeffs: Vec<i16>,
}

impl DctGrid {
    pub fn new(blocks_wide: usize, blocks_tall: usize) -> Self {
        Self {
            blocks_wide,
            blocks_tall,
            coeffs: vec![0i16; blocks_wide * blocks_tall * 64],
        }
    }

    pub fn blocks_wide(&self) -> usize {
        self.blocks_wide
    }

    pub fn blocks_tall(&self) -> usize {
        self.blocks_tall
    }

    pub fn block(&self, br: usize, bc: usize) -> &[i16] {
        let start = (br * self.blocks_wide + bc) * 64;
        &self.coeffs[start..start + 64]
    }

    pub fn block_mut(&mut self, br: usize, bc: usize) -> &mut [i16] {
        let start = (br * self.blocks_wide + bc) * 64;
        &mut self.coeffs[start..start + 64]
    }

    /// Raw mutable access, `blocks_wide * 64` values per block row.
    /// Used for row-parallel processing.
    pub fn coeffs_mut(&mut self) -> &mut [i16] {
        &mut self.coeffs
    }

    pub fn coeffs(&self) -> &[i16] {
        &self.coeffs
    }
}
