// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `pixelflow` developers
//! # Pixel buffers
//!
//! Pixel encodings and the memory they live in.
//!
//! This library is strictly `no_std`. It offers two layers that image processing is written
//! against, without fixing the concrete in-memory representation:
//!
//! - A [`Pixel`] capability set. Every concrete encoding converts to and from a normalized
//!   four component vector and packs into bytes in several channel orders. Algorithms are generic
//!   over it and monomorphized, there is no dynamic dispatch per pixel.
//! - A [`PackedBuffer`] abstraction. Elements are only accessible one partition at a time, so a
//!   buffer may store them verbatim ([`DirectBuffer`]) or transcoded into a compact form with a
//!   constant bit rate ([`CompressedBuffer`]).
//!
//! ## Usage
//!
//! ```
//! use pixelflow_texel::{CompressedBuffer, FloatToByte, PackedBuffer};
//!
//! // 1000 floats, stored as one byte each, accessed 128 at a time.
//! let mut buffer = CompressedBuffer::<f32, FloatToByte>::new(1000, 128);
//!
//! buffer.write_partitions().for_each(|partition, span| {
//!     for (offset, value) in span.iter_mut().enumerate() {
//!         *value = ((partition.start() + offset) % 256) as f32;
//!     }
//! });
//!
//! let mut sum = 0.0;
//! buffer.read_partitions().for_each(|_, span| sum += span.iter().sum::<f32>());
//! assert_eq!(buffer.as_compressed_bytes().len(), 1000);
//! # assert!(sum > 0.0);
//! ```
// Be std for doctests, avoids a weird warning about missing allocator.
#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]
extern crate alloc;

mod buffer;
mod compression;
mod error;
mod matrix;
pub mod partition;
mod pixel;
mod pixels;

pub use self::buffer::{
    CompressedBuffer, DirectBuffer, PackedBuffer, PartitionMut, PartitionRef, ReadPartitions,
    WritePartitions,
};
pub use self::compression::{ConstantBitRate, FloatToByte, FloatToU16, Uncompressed};
pub use self::error::BufferError;
pub use self::matrix::{PixelBuffer, PixelBufferReuseError};
pub use self::partition::{Partition, PartitionLayout};
pub use self::pixel::{
    clamp_unit, clamp_vector, u16_to_unit, u8_to_unit, unit_to_u16, unit_to_u8, Pixel, Vector4,
};

/// Concrete pixel encodings.
pub mod formats {
    pub use crate::pixels::*;
}

pub use self::pixels::{Alpha8, Bgr24, Bgr565, Bgra32, Rgb24, Rgba32, Rgba64, RgbaVector};
