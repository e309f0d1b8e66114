//! Multi-frame images over packed pixel buffers, and a staged processor pipeline.
//!
//! An [`Image`] owns a root [`Frame`] and an ordered list of further frames, each holding a
//! [`PixelBuffer`] of one concrete [`Pixel`] format. Transformations are
//! [`ImageProcessor`](processing::ImageProcessor)s: descriptors that are handed the image and a
//! target rectangle for each stage of an application and that can be written once for every
//! pixel format.
//!
//! # Usage
//!
//! Run a sequence of operations on an image:
//!
//! ```
//! use pixelflow::{Image, Rectangle, Rgba32};
//! use pixelflow::processing::{EdgeDetection, Quantization};
//!
//! let mut image = Image::<Rgba32>::new(32, 32);
//! image.mutate(|ops| {
//!     ops.within(Rectangle::new(8, 8, 16, 16))
//!         .detect_edges(EdgeDetection::Sobel)?
//!         .whole_image()
//!         .quantize(Quantization::Octree, 16)?;
//!     Ok(())
//! })?;
//! # Ok::<_, pixelflow::ProcessingError>(())
//! ```
//!
//! Frames can be packed into compressed buffers while they are not being edited:
//!
//! ```
//! use pixelflow::{Image, Rgba32};
//!
//! let image = Image::<Rgba32>::new(64, 64);
//! let packed = image.pack()?;
//! assert_eq!(packed.compressed_len(), 64 * 64 * 4);
//!
//! let restored = packed.unpack::<Rgba32>()?;
//! assert_eq!(restored.root(), image.root());
//! # Ok::<_, pixelflow::BufferError>(())
//! ```
#![deny(unsafe_code)]

mod config;
mod dynamic;
mod error;
mod frame;
mod geometry;
mod image;
mod math;
mod metadata;
/// Processors and the protocol applying them.
pub mod processing;


pub use self::config::{Configuration, DEFAULT_PARTITION_LENGTH};
pub use self::dynamic::{AnyPixelProcessor, DynamicImage, PixelFormat};
pub use self::error::{BoxError, ImageError, ProcessingError, Stage, SwapError};
pub use self::frame::{Frame, PackedFrame};
pub use self::geometry::{Point, Rectangle, Region, Size};
pub use self::image::{Image, PackedImage};
pub use self::metadata::{
    FrameMetadata, ImageMetadata, ImageProperty, PropertyTag, PropertyValue, DEFAULT_RESOLUTION,
};

pub use pixelflow_texel::{
    Alpha8, Bgr24, Bgr565, Bgra32, BufferError, Pixel, PixelBuffer, PixelBufferReuseError, Rgb24,
    Rgba32, Rgba64, RgbaVector, Vector4,
};

/// The buffer layer, re-exported.
pub mod buffer {
    pub use pixelflow_texel::{
        CompressedBuffer, ConstantBitRate, DirectBuffer, FloatToByte, FloatToU16, PackedBuffer,
        Partition, PartitionLayout, PartitionMut, PartitionRef, ReadPartitions, Uncompressed,
        WritePartitions,
    };
}
