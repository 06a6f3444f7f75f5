// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! # mjpg-core
//!
//! Baseline JPEG codec for MJPEG camera streaming, written from scratch
//! without an external JPEG library.
//!
//! - **Encoder**: raw RGB/YUV frames → JPEG with fixed-point color
//!   conversion, DCT and the standard Huffman tables.
//! - **Decoder**: 4:2:0/4:2:2 baseline JPEG → interleaved RGB or BGR,
//!   with strict header validation and a stable error taxonomy
//!   ([`JpegError::code`]).
//! - **MJPEG helpers** (`mjpeg` module): restore the Huffman tables that
//!   cameras omit and split frame buffers at EOI.
//!
//! Every call owns its working state, so encoders and decoders can run
//! concurrently on separate threads. With the default `parallel` feature,
//! block transforms inside one call are spread over the rayon pool.
//!
//! # Quick start
//!
//! ```rust
//! use mjpg_core::{decode, encode, EncodeOptions, PixelFormat};
//!
//! let rgb = vec![128u8; 32 * 16 * 3];
//! let jpeg = encode(&rgb, PixelFormat::Rgb24, 32, 16, &EncodeOptions::default()).unwrap();
//! let frame = decode(&jpeg).unwrap();
//! assert_eq!((frame.width, frame.height), (32, 16));
//! ```

pub mod jpeg;
pub mod mjpeg;

pub use jpeg::error::{JpegError, Result as JpegResult};
pub use jpeg::{decode, encode, ChannelOrder, DecodeOptions, DecodedFrame, Decoder, EncodeOptions};
pub use jpeg::{PixelFormat, Subsampling};
pub use mjpeg::{frame_length, frames, has_huffman_tables, insert_huffman_tables};
