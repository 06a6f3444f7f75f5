// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Pixel-domain conversion.
//!
//! Encode side: [`YccImage::convert`] turns a raw camera frame into a Y
//! plane plus Cb/Cr planes at the target subsampling, and
//! [`YccImage::block`] extracts 8×8 blocks with edge replication.
//!
//! Decode side: [`pack_pixel`] turns reconstructed Y and scaled chroma
//! into interleaved 8-bit RGB or BGR.
//!
//! Color transform (BT.601, 8-bit fixed point):
//! `Y = (77R + 150G + 29B) >> 8`,
//! `Cb = ((-43R - 85G + 128B) >> 8) + 128`,
//! `Cr = ((128R - 107G - 21B) >> 8) + 128`, each clamped to 0–255.
//! Subsampled chroma takes the top-left pixel of each cluster.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::dct::Plane;
use super::error::{JpegError, Result};
use super::frame::Subsampling;

/// Layout of a raw input frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 bytes per pixel, R, G, B.
    Rgb24,
    /// 3 bytes per pixel, B, G, R.
    Bgr24,
    /// 16-bit little-endian words, red in bits 11–15, green 5–10, blue 0–4.
    Rgb565,
    /// 32-bit little-endian words `0xXXRRGGBB` (bytes B, G, R, X).
    Xrgb32,
    /// Y plane, then Cb and Cr planes at half width and half height.
    Yuv420p,
    /// Y plane, then Cb and Cr planes at half width.
    Yuv422p,
    /// Y, Cb and Cr planes at full resolution.
    Yuv444p,
    /// Packed 4:2:2, bytes Y0 Cb Y1 Cr per pixel pair.
    Yuyv,
}

impl PixelFormat {
    /// Chroma decimation of planar and packed YUV layouts.
    fn yuv_step(self) -> Option<(usize, usize)> {
        match self {
            Self::Yuv420p => Some((2, 2)),
            Self::Yuv422p | Self::Yuyv => Some((2, 1)),
            Self::Yuv444p => Some((1, 1)),
            _ => None,
        }
    }

    /// Bytes a frame of this format occupies. Odd dimensions round the
    /// chroma planes (and YUYV pairs) up.
    pub fn frame_len(self, width: usize, height: usize) -> usize {
        match self {
            Self::Rgb24 | Self::Bgr24 => width * height * 3,
            Self::Rgb565 => width * height * 2,
            Self::Xrgb32 => width * height * 4,
            Self::Yuyv => width.div_ceil(2) * 4 * height,
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => {
                let (sx, sy) = self.yuv_step().unwrap_or((1, 1));
                width * height + 2 * width.div_ceil(sx) * height.div_ceil(sy)
            }
        }
    }
}

#[inline]
fn clip(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[inline]
pub fn rgb_to_y(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    clip((77 * r + 150 * g + 29 * b) >> 8)
}

#[inline]
pub fn rgb_to_cbcr(r: u8, g: u8, b: u8) -> (u8, u8) {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let cb = clip(((-43 * r - 85 * g + 128 * b) >> 8) + 128);
    let cr = clip(((128 * r - 107 * g - 21 * b) >> 8) + 128);
    (cb, cr)
}

/// A borrowed raw frame with bounds already checked.
struct Source<'a> {
    pixels: &'a [u8],
    format: PixelFormat,
    width: usize,
    height: usize,
}

impl Source<'_> {
    fn rgb(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let i = y * self.width + x;
        let p = self.pixels;
        match self.format {
            PixelFormat::Rgb24 => (p[3 * i], p[3 * i + 1], p[3 * i + 2]),
            PixelFormat::Bgr24 => (p[3 * i + 2], p[3 * i + 1], p[3 * i]),
            PixelFormat::Xrgb32 => (p[4 * i + 2], p[4 * i + 1], p[4 * i]),
            PixelFormat::Rgb565 => {
                let v = u16::from_le_bytes([p[2 * i], p[2 * i + 1]]);
                (
                    (((v >> 11) & 0x1F) << 3) as u8,
                    (((v >> 5) & 0x3F) << 2) as u8,
                    ((v & 0x1F) << 3) as u8,
                )
            }
            // Not reached: YUV layouts never ask for RGB.
            _ => (0, 0, 0),
        }
    }

    fn luma(&self, x: usize, y: usize) -> u8 {
        match self.format {
            PixelFormat::Yuv420p | PixelFormat::Yuv422p | PixelFormat::Yuv444p => {
                self.pixels[y * self.width + x]
            }
            PixelFormat::Yuyv => {
                let pair = y * self.width.div_ceil(2) + x / 2;
                self.pixels[pair * 4 + (x & 1) * 2]
            }
            _ => {
                let (r, g, b) = self.rgb(x, y);
                rgb_to_y(r, g, b)
            }
        }
    }

    fn chroma(&self, x: usize, y: usize) -> (u8, u8) {
        match self.format.yuv_step() {
            Some(_) if self.format == PixelFormat::Yuyv => {
                let pair = y * self.width.div_ceil(2) + x / 2;
                (self.pixels[pair * 4 + 1], self.pixels[pair * 4 + 3])
            }
            Some((sx, sy)) => {
                let cw = self.width.div_ceil(sx);
                let plane = cw * self.height.div_ceil(sy);
                let i = (y / sy) * cw + x / sx;
                let base = self.width * self.height;
                (self.pixels[base + i], self.pixels[base + plane + i])
            }
            None => {
                let (r, g, b) = self.rgb(x, y);
                rgb_to_cbcr(r, g, b)
            }
        }
    }
}

/// A frame converted to YCbCr planes for a target subsampling.
///
/// The Y plane is `width × height`; Cb and Cr are
/// `ceil(width / sx) × ceil(height / sy)` for chroma step `(sx, sy)`,
/// and empty for 4:0:0.
#[derive(Debug, Clone)]
pub struct YccImage {
    width: usize,
    height: usize,
    subsampling: Subsampling,
    y: Vec<u8>,
    cb: Vec<u8>,
    cr: Vec<u8>,
}

impl YccImage {
    /// Convert a raw frame.
    ///
    /// Fails with [`JpegError::BufferSize`] if `pixels` is shorter than
    /// the format requires. Extra trailing bytes are ignored.
    pub fn convert(
        pixels: &[u8],
        format: PixelFormat,
        width: usize,
        height: usize,
        subsampling: Subsampling,
    ) -> Result<Self> {
        let expected = format.frame_len(width, height);
        if pixels.len() < expected {
            return Err(JpegError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        let src = Source {
            pixels,
            format,
            width,
            height,
        };

        let mut y = vec![0u8; width * height];
        let luma_row = |(row, out): (usize, &mut [u8])| {
            for (x, v) in out.iter_mut().enumerate() {
                *v = src.luma(x, row);
            }
        };
        #[cfg(feature = "parallel")]
        y.par_chunks_mut(width.max(1)).enumerate().for_each(luma_row);
        #[cfg(not(feature = "parallel"))]
        y.chunks_mut(width.max(1)).enumerate().for_each(luma_row);

        let (cw, ch) = chroma_dims(width, height, subsampling);
        let (sx, sy) = subsampling.chroma_step();
        let mut cb = vec![0u8; cw * ch];
        let mut cr = vec![0u8; cw * ch];
        if cw > 0 {
            for (cy, (cb_row, cr_row)) in cb.chunks_mut(cw).zip(cr.chunks_mut(cw)).enumerate() {
                for cx in 0..cw {
                    let (u, v) = src.chroma(cx * sx, cy * sy);
                    cb_row[cx] = u;
                    cr_row[cx] = v;
                }
            }
        }

        Ok(Self {
            width,
            height,
            subsampling,
            y,
            cb,
            cr,
        })
    }

    /// Samples and dimensions of one plane.
    pub fn plane(&self, plane: Plane) -> (&[u8], usize, usize) {
        match plane {
            Plane::Luma => (&self.y, self.width, self.height),
            Plane::Cb | Plane::Cr => {
                let (cw, ch) = chroma_dims(self.width, self.height, self.subsampling);
                let data = if plane == Plane::Cb { &self.cb } else { &self.cr };
                (data, cw, ch)
            }
        }
    }

    /// The 8×8 block at block row `br`, column `bc` of a plane.
    ///
    /// Positions past the right or bottom edge repeat the last valid
    /// column or row.
    pub fn block(&self, plane: Plane, br: usize, bc: usize) -> [u8; 64] {
        let (data, w, h) = self.plane(plane);
        let mut out = [0u8; 64];
        if w == 0 || h == 0 {
            return out;
        }
        for r in 0..8 {
            let sy = (br * 8 + r).min(h - 1);
            let row = &data[sy * w..sy * w + w];
            for c in 0..8 {
                out[r * 8 + c] = row[(bc * 8 + c).min(w - 1)];
            }
        }
        out
    }

    /// [`Self::block`] level-shifted to -128..127 for the forward DCT.
    pub fn shifted_block(&self, plane: Plane, br: usize, bc: usize) -> [i16; 64] {
        self.block(plane, br, bc).map(|v| v as i16 - 128)
    }
}

/// Chroma plane size for a subsampled image; (0, 0) for 4:0:0.
pub fn chroma_dims(width: usize, height: usize, subsampling: Subsampling) -> (usize, usize) {
    if subsampling == Subsampling::S400 {
        return (0, 0);
    }
    let (sx, sy) = subsampling.chroma_step();
    (width.div_ceil(sx), height.div_ceil(sy))
}

/// Byte order of decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    /// What the classic MJPEG decoder wrote for its display backends.
    Bgr,
}

/// Write one pixel from reconstructed luma and scaled chroma.
///
/// `cb` is `1.772 * (Cb - 128)` and `cr` is `1.402 * (Cr - 128)`, as the
/// chroma inverse transform produces them. Green uses
/// `(50 * cb + 130 * cr + 128) >> 8`, which folds the remaining BT.601
/// weights (0.344/1.772 and 0.714/1.402).
#[inline]
pub fn pack_pixel(y: i16, cb: i16, cr: i16, order: ChannelOrder, out: &mut [u8]) {
    let (y, cb, cr) = (y as i32, cb as i32, cr as i32);
    let cg = (50 * cb + 130 * cr + 128) >> 8;
    let r = clip(y + cr);
    let g = clip(y - cg);
    let b = clip(y + cb);
    match order {
        ChannelOrder::Rgb => out[..3].copy_from_slice(&[r, g, b]),
        ChannelOrder::Bgr => out[..3].copy_from_slice(&[b, g, r]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(format: PixelFormat, bytes: &[u8], w: usize, h: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..(w * h) {
            out.extend_from_slice(bytes);
        }
        assert_eq!(out.len(), format.frame_len(w, h));
        out
    }

    #[test]
    fn transform_endpoints() {
        assert_eq!(rgb_to_y(0, 0, 0), 0);
        assert_eq!(rgb_to_y(255, 255, 255), 255);
        assert_eq!(rgb_to_cbcr(128, 128, 128), (128, 128));
        assert_eq!(rgb_to_cbcr(255, 255, 255), (128, 128));
        assert_eq!(rgb_to_cbcr(0, 0, 255), (255, 107));
        assert_eq!(rgb_to_cbcr(255, 0, 0), (85, 255));
    }

    #[test]
    fn packed_formats_agree() {
        let (w, h) = (3, 2);
        let (r, g, b) = (200u8, 100u8, 40u8);
        let rgb = solid(PixelFormat::Rgb24, &[r, g, b], w, h);
        let bgr = solid(PixelFormat::Bgr24, &[b, g, r], w, h);
        let xrgb = solid(PixelFormat::Xrgb32, &[b, g, r, 0xEE], w, h);

        let expect = YccImage::convert(&rgb, PixelFormat::Rgb24, w, h, Subsampling::S444).unwrap();
        for (px, fmt) in [(bgr, PixelFormat::Bgr24), (xrgb, PixelFormat::Xrgb32)] {
            let got = YccImage::convert(&px, fmt, w, h, Subsampling::S444).unwrap();
            for plane in [Plane::Luma, Plane::Cb, Plane::Cr] {
                assert_eq!(got.plane(plane), expect.plane(plane), "{fmt:?}");
            }
        }
    }

    #[test]
    fn rgb565_widens_channels() {
        // r=31, g=0, b=31 → (248, 0, 248)
        let v: u16 = (31 << 11) | 31;
        let px = solid(PixelFormat::Rgb565, &v.to_le_bytes(), 2, 1);
        let img = YccImage::convert(&px, PixelFormat::Rgb565, 2, 1, Subsampling::S444).unwrap();
        assert_eq!(img.plane(Plane::Luma).0, &[rgb_to_y(248, 0, 248); 2]);
        let (cb, cr) = rgb_to_cbcr(248, 0, 248);
        assert_eq!(img.plane(Plane::Cb).0, &[cb; 2]);
        assert_eq!(img.plane(Plane::Cr).0, &[cr; 2]);
    }

    #[test]
    fn chroma_from_top_left_of_cluster() {
        // 2x2 image, each pixel a different color.
        let px = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let img = YccImage::convert(&px, PixelFormat::Rgb24, 2, 2, Subsampling::S420).unwrap();
        let (cb, cr) = rgb_to_cbcr(255, 0, 0);
        assert_eq!(img.plane(Plane::Cb), (&[cb][..], 1, 1));
        assert_eq!(img.plane(Plane::Cr).0, &[cr]);
        assert_eq!(img.plane(Plane::Luma).0.len(), 4);
    }

    #[test]
    fn planar_yuv_passes_through() {
        // 4x2 4:2:0 → chroma 2x1
        let mut px: Vec<u8> = (0..8).collect();
        px.extend_from_slice(&[100, 110, 200, 210]);
        let img = YccImage::convert(&px, PixelFormat::Yuv420p, 4, 2, Subsampling::S420).unwrap();
        assert_eq!(img.plane(Plane::Luma).0, &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(img.plane(Plane::Cb).0, &[100, 110]);
        assert_eq!(img.plane(Plane::Cr).0, &[200, 210]);

        // Same source resampled to 4:4:4 repeats each chroma sample.
        let full = YccImage::convert(&px, PixelFormat::Yuv420p, 4, 2, Subsampling::S444).unwrap();
        assert_eq!(full.plane(Plane::Cb).0, &[100, 100, 110, 110, 100, 100, 110, 110]);
    }

    #[test]
    fn yuyv_unpacks_pairs() {
        let px = [10, 128, 20, 130, 30, 140, 40, 150];
        let img = YccImage::convert(&px, PixelFormat::Yuyv, 4, 1, Subsampling::S422).unwrap();
        assert_eq!(img.plane(Plane::Luma).0, &[10, 20, 30, 40]);
        assert_eq!(img.plane(Plane::Cb).0, &[128, 140]);
        assert_eq!(img.plane(Plane::Cr).0, &[130, 150]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = YccImage::convert(&[0; 10], PixelFormat::Rgb24, 2, 2, Subsampling::S420).unwrap_err();
        assert_eq!(err, JpegError::BufferSize { expected: 12, actual: 10 });
        assert_eq!(PixelFormat::Yuv420p.frame_len(5, 3), 15 + 2 * 6);
        assert_eq!(PixelFormat::Yuyv.frame_len(5, 1), 12);
    }

    #[test]
    fn edge_blocks_replicate_last_row_and_column() {
        // 10x10 gradient: luma value = 10 * row + col, fed as planar 4:4:4.
        let (w, h) = (10, 10);
        let mut px: Vec<u8> = (0..h).flat_map(|r| (0..w).map(move |c| (10 * r + c) as u8)).collect();
        px.extend(std::iter::repeat(128).take(2 * w * h));
        let img = YccImage::convert(&px, PixelFormat::Yuv444p, w, h, Subsampling::S420).unwrap();

        // The 16x16 MCU covers blocks (0,0), (0,1), (1,0), (1,1).
        let right = img.block(Plane::Luma, 0, 1);
        for r in 0..8 {
            assert_eq!(right[r * 8], (10 * r + 8) as u8);
            for c in 1..8 {
                assert_eq!(right[r * 8 + c], (10 * r + 9) as u8, "row {r} col {c}");
            }
        }
        let bottom_right = img.block(Plane::Luma, 1, 1);
        assert_eq!(bottom_right[0], 88);
        assert!(bottom_right[1..].iter().all(|&v| v == 99 || v == 98 || v == 89));
        assert!(bottom_right[9..16].iter().all(|&v| v == 99));
        assert_eq!(bottom_right[63], 99);

        // Chroma plane is 5x5; its single block repeats column/row 4.
        assert_eq!(img.plane(Plane::Cb).1, 5);
        assert!(img.block(Plane::Cb, 0, 0).iter().all(|&v| v == 128));
    }

    #[test]
    fn shifted_block_is_centered() {
        let px = vec![128u8; 8 * 8 * 3];
        let img = YccImage::convert(&px, PixelFormat::Rgb24, 8, 8, Subsampling::S444).unwrap();
        assert!(img.shifted_block(Plane::Luma, 0, 0).iter().all(|&v| v == 0));
    }

    #[test]
    fn pack_pixel_grey_and_order() {
        let mut out = [0u8; 3];
        pack_pixel(128, 0, 0, ChannelOrder::Rgb, &mut out);
        assert_eq!(out, [128, 128, 128]);

        // Pure red: Y=76, Cb'≈-43, Cr'≈128 (scaled 1.772, 1.402).
        pack_pixel(76, -76, 179, ChannelOrder::Rgb, &mut out);
        assert!(out[0] == 255 && out[1] < 5 && out[2] == 0, "{out:?}");
        pack_pixel(76, -76, 179, ChannelOrder::Bgr, &mut out);
        assert_eq!(out[2], 255);
        assert_eq!(out[0], 0);
    }
}
