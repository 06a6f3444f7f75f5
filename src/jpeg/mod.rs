// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Pure-Rust baseline JPEG codec.
//!
//! Encodes raw camera frames into baseline sequential JPEG and decodes
//! the 4:2:0/4:2:2 streams typical of MJPEG cameras back into RGB.
//!
//! Encoder supports:
//! - RGB24, BGR24, RGB565, XRGB32, planar YUV 4:2:0/4:2:2/4:4:4 and YUYV input
//! - 4:0:0, 4:2:0, 4:2:2 and 4:4:4 output
//! - Standard (Annex K) quantization and Huffman tables, quality 1–100
//! - Optional restart intervals (DRI/RSTn)
//!
//! Decoder supports:
//! - Baseline sequential DCT (SOF0), 8-bit precision, Huffman coding
//! - Three-component YCbCr with 4:2:0 or 4:2:2 sampling
//! - Restart intervals, checked strictly
//! - Streams without DHT (standard tables substituted)
//!
//! Does NOT support:
//! - Progressive, lossless, hierarchical or arithmetic-coded frames
//! - 12-bit precision, 16-bit quantization tables
//! - Grayscale or 4:4:4 input on the decode side

pub mod error;
pub mod zigzag;
pub mod quant;
pub mod dct;
pub mod bitio;
pub mod huffman;
pub mod tables;
pub mod frame;
pub mod marker;
pub mod scan;
pub mod pixels;
pub mod encoder;
pub mod decoder;

pub use decoder::{decode, DecodeOptions, DecodedFrame, Decoder};
pub use encoder::{encode, EncodeOptions};
pub use error::{JpegError, Result};
pub use frame::Subsampling;
pub use pixels::{ChannelOrder, PixelFormat};
