// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Baseline JPEG decoder for 4:2:0 and 4:2:2 YCbCr frames.
//!
//! Pipeline: header state machine → Huffman decode into coefficient
//! grids → dequantize and inverse DCT per plane → nearest-neighbour
//! chroma upsampling and color packing into interleaved 8-bit pixels.
//!
//! A [`Decoder`] remembers the size of the last frame it produced so a
//! streaming caller can tell when the output geometry changes. Pixel
//! buffers are plain `Vec<u8>` owned by the caller: pass the previous
//! frame's buffer to [`Decoder::decode_reusing`] to recycle its
//! allocation.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

use super::dct::{inverse_dct, DctGrid, IdctTable, Plane};
use super::error::{JpegError, Result};
use super::frame::Subsampling;
use super::marker::{read_headers, StreamHeaders};
use super::pixels::{pack_pixel, ChannelOrder};
use super::scan::{decode_scan, DecodeTables};

/// Decoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject frames whose size is not a whole number of MCUs. When off,
    /// such frames decode and the padding is cropped.
    pub strict_alignment: bool,
    /// Fail unless the frame is exactly this (width, height).
    pub expected_size: Option<(u16, u16)>,
    /// Byte order of the output pixels.
    pub channel_order: ChannelOrder,
    /// Substitute the standard Huffman tables for any the stream leaves
    /// undefined, as many MJPEG cameras omit DHT.
    pub default_huffman_tables: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_alignment: false,
            expected_size: None,
            channel_order: ChannelOrder::Rgb,
            default_huffman_tables: true,
        }
    }
}

/// One decoded frame. The caller owns `pixels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// `width * height * 3` bytes, rows top to bottom.
    pub pixels: Vec<u8>,
    pub width: u16,
    pub height: u16,
    pub subsampling: Subsampling,
    /// The size differs from the previous frame this decoder produced
    /// (always true for the first frame).
    pub resized: bool,
}

/// Reusable frame decoder.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
    last_size: Option<(u16, u16)>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self {
            options,
            last_size: None,
        }
    }

    /// Size of the last successfully decoded frame.
    pub fn last_size(&self) -> Option<(u16, u16)> {
        self.last_size
    }

    /// Decode into a freshly allocated buffer.
    pub fn decode(&mut self, data: &[u8]) -> Result<DecodedFrame> {
        self.decode_reusing(data, Vec::new())
    }

    /// Decode, writing the pixels into `buf` (resized as needed).
    ///
    /// On error the buffer is dropped and the remembered size is kept.
    pub fn decode_reusing(&mut self, data: &[u8], mut buf: Vec<u8>) -> Result<DecodedFrame> {
        let mut headers = read_headers(data)?;
        let subsampling = self.validate(&headers)?;

        if self.options.default_huffman_tables {
            if !headers.has_huffman_tables() {
                warn!("stream has no DHT segment, using standard Huffman tables");
            }
            headers.fill_standard_huffman();
        }
        let tables = DecodeTables::build(&headers)?;
        let idct = idct_tables(&headers)?;
        let (grids, end) = decode_scan(data, &headers, &tables)?;

        let frame = &headers.frame;
        let (width, height) = (frame.width, frame.height);
        let luma = reconstruct_plane(&grids[0], &idct[0]);
        let cb = reconstruct_plane(&grids[1], &idct[1]);
        let cr = reconstruct_plane(&grids[2], &idct[2]);

        buf.clear();
        buf.resize(width as usize * height as usize * 3, 0);
        pack_frame(&mut buf, width as usize, [&luma, &cb, &cr], subsampling, self.options.channel_order);

        let resized = self.last_size != Some((width, height));
        if resized {
            debug!(width, height, ?subsampling, "frame size changed");
        }
        self.last_size = Some((width, height));
        debug!(bytes = end, restart_interval = headers.restart_interval, "decoded frame");

        Ok(DecodedFrame {
            pixels: buf,
            width,
            height,
            subsampling,
            resized,
        })
    }

    /// Profile, alignment and expected-size checks on a parsed header.
    fn validate(&self, headers: &StreamHeaders) -> Result<Subsampling> {
        let frame = &headers.frame;
        let subsampling = frame.decodable_subsampling()?;
        if self.options.strict_alignment && !frame.is_mcu_aligned() {
            return Err(JpegError::BadWidthOrHeight {
                width: frame.width,
                height: frame.height,
            });
        }
        if let Some((width, height)) = self.options.expected_size {
            if frame.height != height {
                return Err(JpegError::HeightMismatch {
                    expected: height,
                    found: frame.height,
                });
            }
            if frame.width != width {
                return Err(JpegError::WidthMismatch {
                    expected: width,
                    found: frame.width,
                });
            }
        }
        Ok(subsampling)
    }
}

/// Decode one frame with default options.
pub fn decode(data: &[u8]) -> Result<DecodedFrame> {
    Decoder::new().decode(data)
}

/// Dequantization tables for Y, Cb and Cr.
fn idct_tables(headers: &StreamHeaders) -> Result<[IdctTable; 3]> {
    let table = |comp_idx: usize, plane: Plane| -> Result<IdctTable> {
        let id = headers.frame.components[comp_idx].quant_table_id as usize;
        let qt = headers.quant_tables[id]
            .as_ref()
            .ok_or(JpegError::BadTables("frame references an undefined quantization table"))?;
        Ok(IdctTable::new(qt, plane))
    };
    Ok([table(0, Plane::Luma)?, table(1, Plane::Cb)?, table(2, Plane::Cr)?])
}

/// A reconstructed plane covering every block of a component.
struct PlaneBuf {
    samples: Vec<i16>,
    width: usize,
}

fn reconstruct_plane(grid: &DctGrid, table: &IdctTable) -> PlaneBuf {
    let width = grid.blocks_wide() * 8;
    let mut samples = vec![0i16; width * grid.blocks_tall() * 8];

    let block_row = |(br, rows): (usize, &mut [i16])| {
        let mut out = [0i16; 64];
        for bc in 0..grid.blocks_wide() {
            inverse_dct(grid.block(br, bc), table, &mut out);
            for r in 0..8 {
                let dst = r * width + bc * 8;
                rows[dst..dst + 8].copy_from_slice(&out[r * 8..r * 8 + 8]);
            }
        }
    };

    if width > 0 {
        #[cfg(feature = "parallel")]
        samples.par_chunks_mut(8 * width).enumerate().for_each(block_row);

        #[cfg(not(feature = "parallel"))]
        samples.chunks_mut(8 * width).enumerate().for_each(block_row);
    }

    PlaneBuf { samples, width }
}

/// Upsample chroma by replication and write interleaved pixels, cropping
/// the MCU padding.
fn pack_frame(
    out: &mut [u8],
    width: usize,
    [luma, cb, cr]: [&PlaneBuf; 3],
    subsampling: Subsampling,
    order: ChannelOrder,
) {
    let (sx, sy) = subsampling.chroma_step();
    let pack_row = |(y, row): (usize, &mut [u8])| {
        let yrow = &luma.samples[y * luma.width..];
        let crow = (y / sy) * cb.width;
        for (x, px) in row.chunks_exact_mut(3).enumerate() {
            let ci = crow + x / sx;
            pack_pixel(yrow[x], cb.samples[ci], cr.samples[ci], order, px);
        }
    };

    if width > 0 {
        #[cfg(feature = "parallel")]
        out.par_chunks_mut(width * 3).enumerate().for_each(pack_row);

        #[cfg(not(feature = "parallel"))]
        out.chunks_mut(width * 3).enumerate().for_each(pack_row);
    }
}
