//! A single still picture, owning its pixels.
use std::ops::{Index, IndexMut};

use pixelflow_texel::{BufferError, CompressedBuffer, FloatToByte, Pixel, PixelBuffer};

use crate::error::SwapError;
use crate::geometry::{Rectangle, Size};
use crate::metadata::FrameMetadata;

/// One frame of a possibly animated image.
///
/// A frame owns exactly one [`PixelBuffer`] of fixed dimensions. Rows are handed out as slices
/// that borrow the frame, so a slice can not outlive a swap of the pixel buffer: holding a row
/// while calling [`Frame::swap_pixels`] does not compile.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame<P> {
    pixels: PixelBuffer<P>,
    metadata: FrameMetadata,
}

/// A frame stored with its channels compressed to bytes.
///
/// The channels are kept as `0..=255` scaled floats in a [`CompressedBuffer`] with one byte per
/// channel. Unpacking is exact for 8-bit formats and loses precision for wider ones.
#[derive(Debug)]
pub struct PackedFrame {
    size: Size,
    channels: CompressedBuffer<f32, FloatToByte>,
    metadata: FrameMetadata,
}

impl<P: Pixel> Frame<P> {
    /// Allocate a frame of default pixels.
    ///
    /// # Panics
    /// When the dimensions can not be described in memory.
    pub fn new(width: usize, height: usize) -> Self {
        Frame::from_pixels(PixelBuffer::new(width, height))
    }

    pub fn try_new(width: usize, height: usize) -> Result<Self, BufferError> {
        PixelBuffer::try_new(width, height).map(Frame::from_pixels)
    }

    /// Allocate a frame with every pixel set to `pixel`.
    pub fn filled(width: usize, height: usize, pixel: P) -> Result<Self, BufferError> {
        PixelBuffer::filled(width, height, pixel).map(Frame::from_pixels)
    }

    pub fn from_pixels(pixels: PixelBuffer<P>) -> Self {
        Frame {
            pixels,
            metadata: FrameMetadata::default(),
        }
    }

    /// Decode tightly packed 8-bit `r, g, b, a` data.
    pub fn from_rgba_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self, BufferError> {
        let expected = width
            .checked_mul(height)
            .and_then(|len| len.checked_mul(4))
            .ok_or(BufferError::LayoutOverflow { width, height })?;
        if bytes.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                found: bytes.len(),
            });
        }

        let pixels = bytes
            .chunks_exact(4)
            .map(|c| P::from_bytes(c[0], c[1], c[2], c[3]))
            .collect();
        let pixels = PixelBuffer::from_vec(width, height, pixels)?;
        Ok(Frame::from_pixels(pixels))
    }

    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// The rectangle `(0, 0, width, height)`.
    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_size(self.size())
    }

    /// The pixels of row `y`.
    ///
    /// # Panics
    /// When `y` is not smaller than the height.
    pub fn row(&self, y: usize) -> &[P] {
        self.pixels.row(y)
    }

    /// The pixels of row `y`, mutably.
    ///
    /// # Panics
    /// When `y` is not smaller than the height.
    pub fn row_mut(&mut self, y: usize) -> &mut [P] {
        self.pixels.row_mut(y)
    }

    /// The memory of row `y` in the pixel type's own layout.
    ///
    /// # Panics
    /// When `y` is not smaller than the height.
    pub fn row_bytes(&self, y: usize) -> &[u8] {
        bytemuck::cast_slice(self.pixels.row(y))
    }

    pub fn pixels(&self) -> &PixelBuffer<P> {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut PixelBuffer<P> {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> PixelBuffer<P> {
        self.pixels
    }

    pub fn metadata(&self) -> &FrameMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut FrameMetadata {
        &mut self.metadata
    }

    /// Replace the whole pixel buffer, returning the previous one.
    ///
    /// The replacement must have the dimensions of the frame. Otherwise the frame is unchanged and
    /// the replacement is returned inside the error.
    pub fn swap_pixels(&mut self, pixels: PixelBuffer<P>) -> Result<PixelBuffer<P>, SwapError<P>> {
        if pixels.width() != self.width() || pixels.height() != self.height() {
            return Err(SwapError::new(pixels, self.size()));
        }

        Ok(std::mem::replace(&mut self.pixels, pixels))
    }

    /// Replace the pixel buffer with one of any dimensions.
    ///
    /// The image owning the frame keeps all of its frames the same size.
    pub(crate) fn replace_pixels(&mut self, pixels: PixelBuffer<P>) -> PixelBuffer<P> {
        std::mem::replace(&mut self.pixels, pixels)
    }

    /// Encode as tightly packed 8-bit `r, g, b, a` data.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; self.pixels.len() * 4];
        for (index, pixel) in self.pixels.as_slice().iter().enumerate() {
            pixel.to_xyzw_bytes(&mut bytes, index * 4);
        }
        bytes
    }

    /// Encode as tightly packed 8-bit `b, g, r, a` data.
    pub fn to_bgra_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; self.pixels.len() * 4];
        for (index, pixel) in self.pixels.as_slice().iter().enumerate() {
            pixel.to_zyxw_bytes(&mut bytes, index * 4);
        }
        bytes
    }

    /// Encode as tightly packed 8-bit `r, g, b` data, dropping alpha.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; self.pixels.len() * 3];
        for (index, pixel) in self.pixels.as_slice().iter().enumerate() {
            pixel.to_xyz_bytes(&mut bytes, index * 3);
        }
        bytes
    }

    /// Convert every pixel into another format.
    pub fn convert<Q: Pixel>(&self) -> Frame<Q> {
        Frame {
            pixels: self.pixels.convert(),
            metadata: self.metadata,
        }
    }

    /// Store the pixels compressed to one byte per channel.
    pub fn pack(&self, preferred_partition_len: usize) -> Result<PackedFrame, BufferError> {
        let channels = self
            .pixels
            .pack_vectors::<FloatToByte>(preferred_partition_len, 255.0)?;
        Ok(PackedFrame {
            size: self.size(),
            channels,
            metadata: self.metadata,
        })
    }
}

impl PackedFrame {
    pub fn size(&self) -> Size {
        self.size
    }

    /// The number of bytes the compressed channels occupy.
    pub fn compressed_len(&self) -> usize {
        self.channels.as_compressed_bytes().len()
    }

    /// Restore the frame in any pixel format.
    pub fn unpack<P: Pixel>(&self) -> Result<Frame<P>, BufferError> {
        let pixels =
            PixelBuffer::unpack_vectors(self.size.width, self.size.height, &self.channels, 255.0)?;
        Ok(Frame {
            pixels,
            metadata: self.metadata,
        })
    }
}

impl<P: Pixel> Index<(usize, usize)> for Frame<P> {
    type Output = P;

    fn index(&self, index: (usize, usize)) -> &P {
        &self.pixels[index]
    }
}

impl<P: Pixel> IndexMut<(usize, usize)> for Frame<P> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut P {
        &mut self.pixels[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelflow_texel::{Bgra32, Rgba32, Rgba64};

    #[test]
    fn swap_requires_matching_dimensions() {
        let mut frame = Frame::<Rgba32>::filled(3, 2, Rgba32::WHITE).unwrap();
        let replacement = PixelBuffer::filled(2, 3, Rgba32::BLACK).unwrap();

        let error = frame.swap_pixels(replacement).unwrap_err();
        assert_eq!(error.expected(), Size::new(3, 2));
        assert_eq!(frame[(0, 0)], Rgba32::WHITE);

        let rejected = error.into_buffer();
        assert_eq!((rejected.width(), rejected.height()), (2, 3));

        let fitting = PixelBuffer::filled(3, 2, Rgba32::BLACK).unwrap();
        let previous = frame.swap_pixels(fitting).unwrap();
        assert_eq!(previous[(2, 1)], Rgba32::WHITE);
        assert_eq!(frame.row(1), &[Rgba32::BLACK; 3]);
    }

    #[test]
    fn byte_import_and_export() {
        let bytes = [1, 2, 3, 4, 5, 6, 7, 8];
        let frame = Frame::<Bgra32>::from_rgba_bytes(2, 1, &bytes).unwrap();
        assert_eq!(frame.to_rgba_bytes(), bytes);
        assert_eq!(frame.to_bgra_bytes(), [3, 2, 1, 4, 7, 6, 5, 8]);
        assert_eq!(frame.to_rgb_bytes(), [1, 2, 3, 5, 6, 7]);
        assert_eq!(frame.row_bytes(0), &[3, 2, 1, 4, 7, 6, 5, 8]);

        let short = Frame::<Rgba32>::from_rgba_bytes(2, 2, &bytes);
        assert_eq!(
            short.unwrap_err(),
            BufferError::LengthMismatch {
                expected: 16,
                found: 8
            }
        );
    }

    #[test]
    fn packing_is_exact_for_bytes() {
        let bytes: Vec<u8> = (0..64).map(|v| (v * 4) as u8).collect();
        let mut frame = Frame::<Rgba32>::from_rgba_bytes(4, 4, &bytes).unwrap();
        frame.metadata_mut().frame_delay = 7;

        let packed = frame.pack(10).unwrap();
        assert_eq!(packed.compressed_len(), 64);
        assert_eq!(packed.unpack::<Rgba32>().unwrap(), frame);
    }

    #[test]
    fn packing_is_lossy_for_wide_channels() {
        let mut frame = Frame::<Rgba64>::new(1, 1);
        frame[(0, 0)] = Rgba64 {
            r: 1000,
            g: 30000,
            b: 65535,
            a: 65535,
        };

        let restored = frame.pack(4).unwrap().unpack::<Rgba64>().unwrap();
        let restored = restored[(0, 0)];
        assert_ne!(restored.r, 1000);
        // Within half a byte step of the original.
        assert!((i32::from(restored.r) - 1000).abs() <= 129);
        assert!((i32::from(restored.g) - 30000).abs() <= 129);
        assert_eq!(restored.b, 65535);
    }
}
