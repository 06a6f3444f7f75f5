// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Zigzag scan order.
//!
//! Quantization tables travel in zigzag order inside DQT, and AC
//! coefficients are run-length coded in zigzag order. Everything else in
//! the codec works on natural (row * 8 + col) order.

/// Zigzag position → natural index.
pub const ZIGZAG_TO_NATURAL: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Natural index → zigzag position. Inverse of [`ZIGZAG_TO_NATURAL`].
pub const NATURAL_TO_ZIGZAG: [usize; 64] = {
    let mut table = [0usize; 64];
    let mut i = 0;
    while i < 64 {
        table[ZIGZAG_TO_NATURAL[i]] = i;
        i += 1;
    }
    table
};

/// Reorder a natural-order block into zigzag order.
pub fn to_zigzag<T: Copy + Default>(natural: &[T; 64]) -> [T; 64] {
    let mut out = [T::default(); 64];
    for (ni, &v) in natural.iter().enumerate() {
        out[NATURAL_TO_ZIGZAG[ni]] = v;
    }
    out
}

/// Reorder a zigzag-order block into natural order.
pub fn to_natural<T: Copy + Default>(zigzag: &[T; 64]) -> [T; 64] {
    let mut out = [T::default(); 64];
    for (zi, &v) in zigzag.iter().enumerate() {
        out[ZIGZAG_TO_NATURAL[zi]] = v;
    }
    out
}
