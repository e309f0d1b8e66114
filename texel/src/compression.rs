// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `pixelflow` developers
//! Constant bit rate codecs for the elements of a [`CompressedBuffer`].
//!
//! [`CompressedBuffer`]: crate::CompressedBuffer
use core::marker::PhantomData;
use core::mem;

/// A fixed-ratio encoding of elements of type `T` into bytes.
///
/// Every element occupies exactly [`COMPRESSED_ELEMENT_SIZE`] bytes in the compressed store,
/// independent of its value. This is what allows a buffer to locate the compressed bytes of any
/// partition without decoding its predecessors.
///
/// Implementations should be cheap, stateless values. The round trip
/// `decompress(compress(x))` must reproduce `x` within the precision the implementation
/// documents; lossy schemes are allowed and expected.
///
/// [`COMPRESSED_ELEMENT_SIZE`]: ConstantBitRate::COMPRESSED_ELEMENT_SIZE
pub trait ConstantBitRate<T> {
    /// How many bytes a single element occupies once compressed.
    ///
    /// A value of zero is a programming error; buffers refuse to be constructed with it.
    const COMPRESSED_ELEMENT_SIZE: usize;

    /// Encode `source` into `destination`.
    ///
    /// The destination holds exactly `source.len() * COMPRESSED_ELEMENT_SIZE` bytes.
    fn compress(&self, source: &[T], destination: &mut [u8]);

    /// Decode `source` into `destination`.
    ///
    /// The source holds exactly `destination.len() * COMPRESSED_ELEMENT_SIZE` bytes.
    fn decompress(&self, source: &[u8], destination: &mut [T]);
}

/// Stores the native bytes of each element. Lossless.
pub struct Uncompressed<T>(PhantomData<fn(T) -> T>);

/// Stores `f32` values of the range `[0, 255]` as one rounded byte each.
///
/// Values outside the range are clamped and the fractional part is lost. The round trip error
/// is at most `0.5` for values inside the range. This is the intended trade of precision for a
/// quarter of the memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatToByte;

/// Stores `f32` values of the range `[0, 65535]` as one rounded `u16` each, native endian.
///
/// Values outside the range are clamped. The round trip error is at most `0.5` for values inside
/// the range.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatToU16;

impl<T: bytemuck::Pod> ConstantBitRate<T> for Uncompressed<T> {
    const COMPRESSED_ELEMENT_SIZE: usize = mem::size_of::<T>();

    fn compress(&self, source: &[T], destination: &mut [u8]) {
        destination.copy_from_slice(bytemuck::cast_slice(source));
    }

    fn decompress(&self, source: &[u8], destination: &mut [T]) {
        bytemuck::cast_slice_mut::<T, u8>(destination).copy_from_slice(source);
    }
}

impl ConstantBitRate<f32> for FloatToByte {
    const COMPRESSED_ELEMENT_SIZE: usize = 1;

    fn compress(&self, source: &[f32], destination: &mut [u8]) {
        for (byte, &value) in destination.iter_mut().zip(source) {
            // NaN saturates to zero in the cast.
            *byte = (value.clamp(0.0, 255.0) + 0.5) as u8;
        }
    }

    fn decompress(&self, source: &[u8], destination: &mut [f32]) {
        for (value, &byte) in destination.iter_mut().zip(source) {
            *value = f32::from(byte);
        }
    }
}

impl ConstantBitRate<f32> for FloatToU16 {
    const COMPRESSED_ELEMENT_SIZE: usize = 2;

    fn compress(&self, source: &[f32], destination: &mut [u8]) {
        for (bytes, &value) in destination.chunks_exact_mut(2).zip(source) {
            let quantized = (value.clamp(0.0, 65535.0) + 0.5) as u16;
            bytes.copy_from_slice(&quantized.to_ne_bytes());
        }
    }

    fn decompress(&self, source: &[u8], destination: &mut [f32]) {
        for (value, bytes) in destination.iter_mut().zip(source.chunks_exact(2)) {
            *value = f32::from(u16::from_ne_bytes([bytes[0], bytes[1]]));
        }
    }
}

impl<T> Uncompressed<T> {
    pub const fn new() -> Self {
        Uncompressed(PhantomData)
    }
}

impl<T> Default for Uncompressed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Uncompressed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Uncompressed<T> {}

impl<T> core::fmt::Debug for Uncompressed<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("Uncompressed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_compression_rounds_and_clamps() {
        let source = [0.0, 0.4, 0.6, 127.5, 254.6, 255.0, 300.0, -4.0];
        let mut bytes = [0u8; 8];
        FloatToByte.compress(&source, &mut bytes);
        assert_eq!(bytes, [0, 0, 1, 128, 255, 255, 255, 0]);

        let mut back = [0.0f32; 8];
        FloatToByte.decompress(&bytes, &mut back);
        assert_eq!(back, [0.0, 0.0, 1.0, 128.0, 255.0, 255.0, 255.0, 0.0]);
    }

    #[test]
    fn u16_compression_is_within_half_a_step() {
        let source = [0.0, 1.25, 1000.7, 65535.0];
        let mut bytes = [0u8; 8];
        FloatToU16.compress(&source, &mut bytes);

        let mut back = [0.0f32; 4];
        FloatToU16.decompress(&bytes, &mut back);
        for (a, b) in source.iter().zip(&back) {
            assert!((a - b).abs() <= 0.5, "{} vs {}", a, b);
        }
    }

    #[test]
    fn uncompressed_is_exact() {
        let source = [1.5f32, -0.0, f32::MAX, 1e-30];
        let mut bytes = [0u8; 16];
        let codec = Uncompressed::<f32>::new();
        codec.compress(&source, &mut bytes);

        let mut back = [0.0f32; 4];
        codec.decompress(&bytes, &mut back);
        for (a, b) in source.iter().zip(&back) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
