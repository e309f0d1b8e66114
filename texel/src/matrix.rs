// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `pixelflow` developers
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Index, IndexMut};

use crate::buffer::{CompressedBuffer, DirectBuffer, PackedBuffer};
use crate::compression::ConstantBitRate;
use crate::pixel::Pixel;
use crate::pixels::RgbaVector;
use crate::BufferError;

/// A 2d, row-major grid of pixels.
///
/// The pixels are always stored without holes, row `y` occupies the elements
/// `y * width..(y + 1) * width` of the backing [`DirectBuffer`]. Any cropping or sub-rectangle
/// access is done by the layer above, which clips its loops against `width` and `height`.
///
/// There are two ways to allocate. `new` panics when the dimensions can not be described in the
/// address space, which is fine for trusted inputs. `try_new` reports the same condition as a
/// [`BufferError`] without allocating, for dimensions that come from untrusted input such as a
/// decoder header.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer<P> {
    width: usize,
    height: usize,
    data: DirectBuffer<P>,
}

/// Error representation for pixels that do not match the requested dimensions.
///
/// Emitted by [`PixelBuffer::from_vec`]. The rejected pixels can be retrieved with `into_vec`.
///
/// ```
/// # use pixelflow_texel::{PixelBuffer, Rgba32};
/// let pixels = vec![Rgba32::WHITE; 5];
/// let error = PixelBuffer::from_vec(2, 2, pixels).unwrap_err();
/// assert_eq!(error.into_vec().len(), 5);
/// ```
#[derive(PartialEq)]
pub struct PixelBufferReuseError<P> {
    data: Vec<P>,
    expected: usize,
}

impl<P: Pixel> PixelBuffer<P> {
    /// Allocate a grid of default pixels.
    ///
    /// # Panics
    /// When `width * height` pixels can not be described in memory.
    pub fn new(width: usize, height: usize) -> Self {
        Self::try_new(width, height).expect("Pixel layout can not fit into memory")
    }

    /// Allocate a grid of default pixels, checking the dimensions first.
    pub fn try_new(width: usize, height: usize) -> Result<Self, BufferError> {
        Self::filled(width, height, P::default())
    }

    /// Allocate a grid with every pixel set to `pixel`.
    pub fn filled(width: usize, height: usize, pixel: P) -> Result<Self, BufferError> {
        let len = Self::checked_len(width, height)?;
        let data = DirectBuffer::from_vec(alloc::vec![pixel; len]);
        Ok(PixelBuffer {
            width,
            height,
            data,
        })
    }

    /// Interpret existing pixels as a grid.
    pub fn from_vec(
        width: usize,
        height: usize,
        data: Vec<P>,
    ) -> Result<Self, PixelBufferReuseError<P>> {
        match Self::checked_len(width, height) {
            Ok(expected) if expected == data.len() => Ok(PixelBuffer {
                width,
                height,
                data: DirectBuffer::from_vec(data),
            }),
            Ok(expected) => Err(PixelBufferReuseError { data, expected }),
            Err(_) => Err(PixelBufferReuseError {
                data,
                expected: usize::MAX,
            }),
        }
    }

    fn checked_len(width: usize, height: usize) -> Result<usize, BufferError> {
        width
            .checked_mul(height)
            .filter(|len| len.checked_mul(core::mem::size_of::<P>()).is_some())
            .ok_or(BufferError::LayoutOverflow { width, height })
    }

    /// The number of pixels, `width * height`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The pixels of row `y`.
    ///
    /// # Panics
    /// When `y` is not smaller than the height.
    pub fn row(&self, y: usize) -> &[P] {
        assert!(y < self.height, "Row {} out of bounds for height {}", y, self.height);
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// The pixels of row `y`, mutably.
    ///
    /// # Panics
    /// When `y` is not smaller than the height.
    pub fn row_mut(&mut self, y: usize) -> &mut [P] {
        assert!(y < self.height, "Row {} out of bounds for height {}", y, self.height);
        let width = self.width;
        &mut self.data[y * width..(y + 1) * width]
    }

    pub fn as_slice(&self) -> &[P] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [P] {
        self.data.as_mut_slice()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data.as_slice())
    }

    /// The partitioned backing store.
    pub fn buffer(&self) -> &DirectBuffer<P> {
        &self.data
    }

    pub fn buffer_mut(&mut self) -> &mut DirectBuffer<P> {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<P> {
        self.data.into_vec()
    }

    /// Apply a function to all pixels, producing a grid of the same dimensions.
    pub fn map<Q: Pixel>(&self, f: impl FnMut(&P) -> Q) -> PixelBuffer<Q> {
        PixelBuffer {
            width: self.width,
            height: self.height,
            data: DirectBuffer::from_vec(self.data.iter().map(f).collect()),
        }
    }

    /// Convert into another pixel format through the normalized vector form.
    pub fn convert<Q: Pixel>(&self) -> PixelBuffer<Q> {
        self.map(|pixel| Q::from_vector4(pixel.to_vector4()))
    }

    /// Expand every pixel into its `f32` components.
    pub fn to_vectors(&self) -> PixelBuffer<RgbaVector> {
        self.map(|pixel| RgbaVector::from_array(pixel.to_vector4()))
    }

    /// Store the components of all pixels, multiplied by `scale`, in a compressed buffer.
    ///
    /// The buffer holds `4 * len` elements in `r, g, b, a` order per pixel. It is filled one
    /// partition at a time, so the expanded form never exists as a whole.
    pub fn pack_vectors<C>(
        &self,
        preferred_partition_len: usize,
        scale: f32,
    ) -> Result<CompressedBuffer<f32, C>, BufferError>
    where
        C: ConstantBitRate<f32> + Default,
    {
        let len = self
            .len()
            .checked_mul(4)
            .ok_or(BufferError::LayoutOverflow {
                width: self.width,
                height: self.height,
            })?;

        let mut packed = CompressedBuffer::try_new(len, preferred_partition_len)?;
        let mut components = self
            .data
            .iter()
            .flat_map(|pixel| pixel.to_vector4())
            .map(|component| component * scale);

        packed.write_partitions().for_each(|_, span| {
            for (slot, component) in span.iter_mut().zip(&mut components) {
                *slot = component;
            }
        });

        Ok(packed)
    }

    /// Restore a grid from components stored by [`pack_vectors`].
    ///
    /// Every component is divided by `scale` and clamped on packing, so a lossy compression
    /// stays within the representable range.
    ///
    /// [`pack_vectors`]: PixelBuffer::pack_vectors
    pub fn unpack_vectors(
        width: usize,
        height: usize,
        packed: &impl PackedBuffer<f32>,
        scale: f32,
    ) -> Result<Self, BufferError> {
        let len = Self::checked_len(width, height)?;
        let expected = len
            .checked_mul(4)
            .ok_or(BufferError::LayoutOverflow { width, height })?;
        if packed.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                found: packed.len(),
            });
        }

        let mut data = Vec::with_capacity(len);
        let mut vector = [0.0; 4];
        let mut filled = 0;
        packed.read_partitions().for_each(|_, span| {
            for &component in span {
                vector[filled] = component / scale;
                filled += 1;
                if filled == 4 {
                    data.push(P::from_vector4(vector));
                    filled = 0;
                }
            }
        });

        Ok(PixelBuffer {
            width,
            height,
            data: DirectBuffer::from_vec(data),
        })
    }
}

impl<P> PixelBuffer<P> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

impl<P> PixelBufferReuseError<P> {
    /// The number of pixels the dimensions required.
    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn into_vec(self) -> Vec<P> {
        self.data
    }
}

impl<P: Pixel> Index<(usize, usize)> for PixelBuffer<P> {
    type Output = P;

    fn index(&self, (x, y): (usize, usize)) -> &P {
        &self.row(y)[x]
    }
}

impl<P: Pixel> IndexMut<(usize, usize)> for PixelBuffer<P> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut P {
        &mut self.row_mut(y)[x]
    }
}

impl<P> From<PixelBufferReuseError<P>> for BufferError {
    fn from(error: PixelBufferReuseError<P>) -> Self {
        BufferError::LengthMismatch {
            expected: error.expected,
            found: error.data.len(),
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for PixelBuffer<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("content", &&self.data[..])
            .finish()
    }
}

impl<P> fmt::Debug for PixelBufferReuseError<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PixelBufferReuseError")
            .field("expected", &self.expected)
            .field("found", &self.data.len())
            .finish()
    }
}

impl<P> fmt::Display for PixelBufferReuseError<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} pixels can not form a grid of {} pixels",
            self.data.len(),
            self.expected
        )
    }
}

impl<P> core::error::Error for PixelBufferReuseError<P> {}
