// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! JPEG frame header (SOF0) parsing and writing.
//!
//! Extracts image dimensions, component information, and sampling factors
//! from the Start of Frame marker segment, and classifies the component
//! layout into one of the supported chroma subsampling profiles.

use super::error::{JpegError, Result};

/// Chroma subsampling layout of a frame.
///
/// Determines the MCU footprint: 8×8 for 4:0:0 and 4:4:4, 16×8 for 4:2:2
/// and 16×16 for 4:2:0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Subsampling {
    /// Luma only.
    S400,
    /// Chroma halved in both directions.
    #[default]
    S420,
    /// Chroma halved horizontally.
    S422,
    /// Full-resolution chroma.
    S444,
}

impl Subsampling {
    /// Luma sampling byte as written in SOF0 (`h << 4 | v`).
    pub fn luma_sampling(self) -> u8 {
        match self {
            Self::S400 | Self::S444 => 0x11,
            Self::S420 => 0x22,
            Self::S422 => 0x21,
        }
    }

    /// Number of frame components (1 for 4:0:0, otherwise 3).
    pub fn num_components(self) -> usize {
        match self {
            Self::S400 => 1,
            _ => 3,
        }
    }

    /// MCU size in pixels, (width, height).
    pub fn mcu_size(self) -> (usize, usize) {
        let hv = self.luma_sampling();
        (8 * (hv >> 4) as usize, 8 * (hv & 0x0F) as usize)
    }

    /// Chroma decimation factors, (horizontal, vertical).
    pub fn chroma_step(self) -> (usize, usize) {
        let (w, h) = self.mcu_size();
        (w / 8, h / 8)
    }
}

/// Information about one image component from SOF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Component ID (1=Y, 2=Cb, 3=Cr).
    pub id: u8,
    /// Horizontal sampling factor (1–3).
    pub h_sampling: u8,
    /// Vertical sampling factor (1–3).
    pub v_sampling: u8,
    /// Quantization table ID (0–3).
    pub quant_table_id: u8,
}

impl Component {
    fn sampling(&self) -> u8 {
        (self.h_sampling << 4) | self.v_sampling
    }
}

/// Frame information parsed from (or written to) the SOF0 marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Sample precision in bits (always 8).
    pub precision: u8,
    /// Image height in pixels.
    pub height: u16,
    /// Image width in pixels.
    pub width: u16,
    /// Components in the frame.
    pub components: Vec<Component>,
    /// Maximum horizontal sampling factor across all components.
    pub max_h_sampling: u8,
    /// Maximum vertical sampling factor across all components.
    pub max_v_sampling: u8,
    /// MCU width in pixels (= max_h_sampling * 8).
    pub mcu_width: u16,
    /// MCU height in pixels (= max_v_sampling * 8).
    pub mcu_height: u16,
    /// Number of MCUs horizontally.
    pub mcus_wide: u16,
    /// Number of MCUs vertically.
    pub mcus_tall: u16,
}

impl FrameInfo {
    /// Frame layout the encoder writes for `subsampling`.
    ///
    /// Y uses quantization table 0, Cb and Cr share table 1.
    pub fn for_encode(width: u16, height: u16, subsampling: Subsampling) -> Self {
        let luma = subsampling.luma_sampling();
        let mut components = vec![Component {
            id: 1,
            h_sampling: luma >> 4,
            v_sampling: luma & 0x0F,
            quant_table_id: 0,
        }];
        if subsampling != Subsampling::S400 {
            for id in [2, 3] {
                components.push(Component {
                    id,
                    h_sampling: 1,
                    v_sampling: 1,
                    quant_table_id: 1,
                });
            }
        }
        Self::with_components(width, height, components)
    }

    fn with_components(width: u16, height: u16, components: Vec<Component>) -> Self {
        let max_h = components.iter().map(|c| c.h_sampling).max().unwrap_or(1);
        let max_v = components.iter().map(|c| c.v_sampling).max().unwrap_or(1);
        let mcu_width = (max_h as u16) * 8;
        let mcu_height = (max_v as u16) * 8;
        let mcus_wide = width.div_ceil(mcu_width);
        let mcus_tall = height.div_ceil(mcu_height);

        Self {
            precision: 8,
            height,
            width,
            components,
            max_h_sampling: max_h,
            max_v_sampling: max_v,
            mcu_width,
            mcu_height,
            mcus_wide,
            mcus_tall,
        }
    }

    /// Number of 8×8 blocks wide for a given component.
    pub fn blocks_wide(&self, comp_idx: usize) -> usize {
        let comp = &self.components[comp_idx];
        (self.mcus_wide as usize) * (comp.h_sampling as usize)
    }

    /// Number of 8×8 blocks tall for a given component.
    pub fn blocks_tall(&self, comp_idx: usize) -> usize {
        let comp = &self.components[comp_idx];
        (self.mcus_tall as usize) * (comp.v_sampling as usize)
    }

    /// Index into `components` of the component with the given ID.
    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    /// Whether both dimensions are whole multiples of the MCU size.
    pub fn is_mcu_aligned(&self) -> bool {
        self.width % self.mcu_width == 0 && self.height % self.mcu_height == 0
    }

    /// Classify the component layout for decoding.
    ///
    /// Only YCbCr with component IDs 1, 2, 3 in that order, chroma sampled
    /// 1×1 and luma sampled 2×2 (4:2:0) or 2×1 (4:2:2) is decodable.
    pub fn decodable_subsampling(&self) -> Result<Subsampling> {
        let ids: Vec<u8> = self.components.iter().map(|c| c.id).collect();
        if ids != [1, 2, 3] {
            return Err(JpegError::NotYcbcr("component IDs must be 1, 2, 3"));
        }
        if self.components[1].sampling() != 0x11 || self.components[2].sampling() != 0x11 {
            return Err(JpegError::NotYcbcr("chroma must be sampled 1x1"));
        }
        match self.components[0].sampling() {
            0x22 => Ok(Subsampling::S420),
            0x21 => Ok(Subsampling::S422),
            _ => Err(JpegError::NotYcbcr("luma sampling must be 2x2 or 2x1")),
        }
    }
}

/// Parse a SOF0 marker segment body (after the 2-byte length).
pub fn parse_sof(data: &[u8]) -> Result<FrameInfo> {
    if data.len() < 6 {
        return Err(JpegError::UnexpectedEof);
    }

    let precision = data[0];
    if precision != 8 {
        return Err(JpegError::NotEightBit(precision));
    }

    let height = u16::from_be_bytes([data[1], data[2]]);
    let width = u16::from_be_bytes([data[3], data[4]]);
    let num_components = data[5];

    if width == 0 || height == 0 {
        return Err(JpegError::BadWidthOrHeight { width, height });
    }
    if num_components > 3 {
        return Err(JpegError::TooManyComponents(num_components));
    }
    if num_components < 3 {
        return Err(JpegError::NotYcbcr("frame must have three components"));
    }
    let num_components = num_components as usize;
    if data.len() < 6 + num_components * 3 {
        return Err(JpegError::UnexpectedEof);
    }

    let mut components = Vec::with_capacity(num_components);
    for chunk in data[6..6 + num_components * 3].chunks_exact(3) {
        let sampling = chunk[1];
        let h_sampling = sampling >> 4;
        let v_sampling = sampling & 0x0F;
        let quant_table_id = chunk[2];

        if !(1..=3).contains(&h_sampling) || !(1..=3).contains(&v_sampling) {
            return Err(JpegError::IllegalHv(sampling));
        }
        if quant_table_id > 3 {
            return Err(JpegError::QuantTableSelector(quant_table_id));
        }

        components.push(Component {
            id: chunk[0],
            h_sampling,
            v_sampling,
            quant_table_id,
        });
    }

    Ok(FrameInfo::with_components(width, height, components))
}

/// Write a SOF0 marker segment (including 0xFFC0 and length).
pub fn write_sof(frame: &FrameInfo) -> Vec<u8> {
    let length = 8 + 3 * frame.components.len();
    let mut out = Vec::with_capacity(2 + length);
    out.extend_from_slice(&[0xFF, 0xC0]);
    out.extend_from_slice(&(length as u16).to_be_bytes());
    out.push(frame.precision);
    out.extend_from_slice(&frame.height.to_be_bytes());
    out.extend_from_slice(&frame.width.to_be_bytes());
    out.push(frame.components.len() as u8);
    for comp in &frame.components {
        out.extend_from_slice(&[comp.id, comp.sampling(), comp.quant_table_id]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ycbcr_420() {
        let data = [
            8, 1, 0xE0, 2, 0x80, 3, // precision, height=480, width=640, 3 comps
            1, 0x22, 0, // Y: 2x2, qt=0
            2, 0x11, 1, // Cb: 1x1, qt=1
            3, 0x11, 1, // Cr: 1x1, qt=1
        ];

        let fi = parse_sof(&data).unwrap();
        assert_eq!(fi.height, 480);
        assert_eq!(fi.width, 640);
        assert_eq!(fi.components.len(), 3);
        assert_eq!(fi.mcu_width, 16);
        assert_eq!(fi.mcu_height, 16);
        assert_eq!(fi.mcus_wide, 40);
        assert_eq!(fi.mcus_tall, 30);
        assert_eq!(fi.blocks_wide(0), 80);
        assert_eq!(fi.blocks_tall(0), 60);
        assert_eq!(fi.blocks_wide(1), 40);
        assert_eq!(fi.blocks_tall(1), 30);
        assert_eq!(fi.decodable_subsampling().unwrap(), Subsampling::S420);
        assert!(fi.is_mcu_aligned());
    }

    #[test]
    fn non_mcu_aligned_rounds_up() {
        let fi = FrameInfo::for_encode(10, 10, Subsampling::S420);
        assert_eq!(fi.mcus_wide, 1);
        assert_eq!(fi.mcus_tall, 1);
        assert!(!fi.is_mcu_aligned());

        let fi = FrameInfo::for_encode(17, 9, Subsampling::S422);
        assert_eq!((fi.mcus_wide, fi.mcus_tall), (2, 2));
    }

    #[test]
    fn encode_layouts() {
        let expect: [(Subsampling, &[u8]); 4] = [
            (Subsampling::S400, &[0x00, 0x0B, 8, 0, 16, 0, 32, 1, 1, 0x11, 0]),
            (
                Subsampling::S420,
                &[0x00, 0x11, 8, 0, 16, 0, 32, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1],
            ),
            (
                Subsampling::S422,
                &[0x00, 0x11, 8, 0, 16, 0, 32, 3, 1, 0x21, 0, 2, 0x11, 1, 3, 0x11, 1],
            ),
            (
                Subsampling::S444,
                &[0x00, 0x11, 8, 0, 16, 0, 32, 3, 1, 0x11, 0, 2, 0x11, 1, 3, 0x11, 1],
            ),
        ];
        for (sub, body) in expect {
            let sof = write_sof(&FrameInfo::for_encode(32, 16, sub));
            assert_eq!(&sof[..2], &[0xFF, 0xC0]);
            assert_eq!(&sof[2..], body, "{sub:?}");
        }
    }

    #[test]
    fn written_header_parses_back() {
        let fi = FrameInfo::for_encode(48, 24, Subsampling::S422);
        let sof = write_sof(&fi);
        assert_eq!(parse_sof(&sof[4..]).unwrap(), fi);
    }

    #[test]
    fn reject_12bit() {
        let data = [12, 0, 8, 0, 8, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1];
        assert_eq!(parse_sof(&data), Err(JpegError::NotEightBit(12)));
    }

    #[test]
    fn reject_four_components() {
        let data = [8, 0, 16, 0, 16, 4, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1, 4, 0x11, 1];
        assert_eq!(parse_sof(&data), Err(JpegError::TooManyComponents(4)));
    }

    #[test]
    fn reject_grayscale_and_zero_size() {
        let gray = [8, 0, 8, 0, 8, 1, 1, 0x11, 0];
        assert!(matches!(parse_sof(&gray), Err(JpegError::NotYcbcr(_))));
        let empty = [8, 0, 0, 0, 8, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1];
        assert_eq!(
            parse_sof(&empty),
            Err(JpegError::BadWidthOrHeight { width: 8, height: 0 })
        );
    }

    #[test]
    fn reject_bad_sampling_and_selector() {
        let hv = [8, 0, 16, 0, 16, 3, 1, 0x41, 0, 2, 0x11, 1, 3, 0x11, 1];
        assert_eq!(parse_sof(&hv), Err(JpegError::IllegalHv(0x41)));
        let zero = [8, 0, 16, 0, 16, 3, 1, 0x20, 0, 2, 0x11, 1, 3, 0x11, 1];
        assert_eq!(parse_sof(&zero), Err(JpegError::IllegalHv(0x20)));
        let tq = [8, 0, 16, 0, 16, 3, 1, 0x22, 0, 2, 0x11, 4, 3, 0x11, 1];
        assert_eq!(parse_sof(&tq), Err(JpegError::QuantTableSelector(4)));
    }

    #[test]
    fn only_420_and_422_are_decodable() {
        let s444 = FrameInfo::for_encode(16, 16, Subsampling::S444);
        assert!(matches!(s444.decodable_subsampling(), Err(JpegError::NotYcbcr(_))));
        let s422 = FrameInfo::for_encode(16, 16, Subsampling::S422);
        assert_eq!(s422.decodable_subsampling().unwrap(), Subsampling::S422);

        let mut swapped = FrameInfo::for_encode(16, 16, Subsampling::S420);
        swapped.components.swap(1, 2);
        assert!(matches!(swapped.decodable_subsampling(), Err(JpegError::NotYcbcr(_))));
    }

    #[test]
    fn mcu_geometry() {
        assert_eq!(Subsampling::S420.mcu_size(), (16, 16));
        assert_eq!(Subsampling::S422.mcu_size(), (16, 8));
        assert_eq!(Subsampling::S444.mcu_size(), (8, 8));
        assert_eq!(Subsampling::S400.mcu_size(), (8, 8));
        assert_eq!(Subsampling::S422.chroma_step(), (2, 1));
    }
}
