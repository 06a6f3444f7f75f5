// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Baseline JPEG encoder.
//!
//! Pipeline: pixel conversion → per-block forward DCT → quantization →
//! Huffman coding with the standard tables → marker framing. Block rows
//! are transformed in parallel when the `parallel` feature is enabled;
//! entropy coding is sequential.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use super::dct::{forward_dct, DctGrid, Plane};
use super::error::{JpegError, Result};
use super::frame::{FrameInfo, Subsampling};
use super::marker::write_headers;
use super::pixels::{PixelFormat, YccImage};
use super::quant::{quality_scale, QuantTable};
use super::scan::encode_scan;

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// 1–100, clamped. Mapped through [`quality_scale`].
    pub quality: u8,
    pub subsampling: Subsampling,
    /// MCUs between restart markers; 0 disables DRI/RSTn.
    pub restart_interval: u16,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            subsampling: Subsampling::S420,
            restart_interval: 0,
        }
    }
}

impl EncodeOptions {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }
}

/// Encode one raw frame as a baseline JPEG.
///
/// `pixels` must hold at least [`PixelFormat::frame_len`] bytes. Any size
/// is accepted; partial MCUs at the right and bottom edges are padded by
/// repeating the last column and row.
pub fn encode(
    pixels: &[u8],
    format: PixelFormat,
    width: u16,
    height: u16,
    options: &EncodeOptions,
) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(JpegError::BadWidthOrHeight { width, height });
    }
    let image = YccImage::convert(pixels, format, width as usize, height as usize, options.subsampling)?;

    let scale = quality_scale(options.quality);
    let luma = QuantTable::luma(scale);
    let chroma = QuantTable::chroma(scale);
    let frame = FrameInfo::for_encode(width, height, options.subsampling);

    let planes = [(Plane::Luma, &luma), (Plane::Cb, &chroma), (Plane::Cr, &chroma)];
    let grids: Vec<DctGrid> = planes
        .iter()
        .take(frame.components.len())
        .enumerate()
        .map(|(ci, &(plane, qt))| transform_plane(&image, plane, qt, &frame, ci))
        .collect();

    debug!(
        width,
        height,
        ?format,
        subsampling = ?options.subsampling,
        quality = options.quality,
        mcus = frame.mcus_wide as usize * frame.mcus_tall as usize,
        "encoding frame"
    );

    let header = write_headers(&frame, &luma, &chroma, options.restart_interval);
    encode_scan(header, &frame, &grids, options.restart_interval)
}

/// Forward DCT and quantize every block of one component.
fn transform_plane(
    image: &YccImage,
    plane: Plane,
    qt: &QuantTable,
    frame: &FrameInfo,
    comp_idx: usize,
) -> DctGrid {
    let bw = frame.blocks_wide(comp_idx);
    let bt = frame.blocks_tall(comp_idx);
    let mut grid = DctGrid::new(bw, bt);

    let block_row = |(br, row): (usize, &mut [i16])| {
        for (bc, out) in row.chunks_exact_mut(64).enumerate() {
            let coeffs = forward_dct(&image.shifted_block(plane, br, bc));
            qt.quantize(&coeffs, out);
        }
    };

    #[cfg(feature = "parallel")]
    grid.coeffs_mut().par_chunks_mut(bw * 64).enumerate().for_each(block_row);

    #[cfg(not(feature = "parallel"))]
    grid.coeffs_mut().chunks_mut(bw * 64).enumerate().for_each(block_row);

    grid
}
