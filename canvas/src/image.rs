//! Images made of an ordered list of frames.
use pixelflow_texel::{BufferError, Pixel, PixelBuffer};

use crate::config::Configuration;
use crate::error::{ImageError, ProcessingError};
use crate::frame::{Frame, PackedFrame};
use crate::geometry::{Rectangle, Size};
use crate::metadata::ImageMetadata;
use crate::processing::{self, ImageProcessor, Operations};

/// A possibly animated image.
///
/// The image owns a root frame and an ordered list of further frames; together they form the
/// animation sequence. All frames share the pixel format and the dimensions of the root frame,
/// which is enforced whenever a frame is added.
///
/// Processors are applied to the root frame first and then to every further frame in order. See
/// [`ImageProcessor`] for the stages.
///
/// ```
/// use pixelflow::{Image, Rgba32};
/// use pixelflow::processing::GrayscaleMode;
///
/// let mut image = Image::<Rgba32>::new(16, 16);
/// image.root_mut().pixels_mut().as_mut_slice().fill(Rgba32::rgb(0xff, 0, 0));
///
/// image.mutate(|ops| {
///     ops.grayscale(GrayscaleMode::Bt709)?.invert()?;
///     Ok(())
/// })?;
/// # Ok::<_, pixelflow::ProcessingError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Image<P> {
    root: Frame<P>,
    frames: Vec<Frame<P>>,
    metadata: ImageMetadata,
    config: Configuration,
}

/// An image with every frame compressed to one byte per channel.
///
/// Created by [`Image::pack`].
#[derive(Debug)]
pub struct PackedImage {
    frames: Vec<PackedFrame>,
    metadata: ImageMetadata,
    config: Configuration,
}

impl<P: Pixel> Image<P> {
    /// Allocate an image with a single frame of default pixels.
    ///
    /// # Panics
    /// When the dimensions can not be described in memory.
    pub fn new(width: usize, height: usize) -> Self {
        Image::from_frame(Frame::new(width, height))
    }

    pub fn try_new(width: usize, height: usize) -> Result<Self, BufferError> {
        Frame::try_new(width, height).map(Image::from_frame)
    }

    /// Allocate an image with a single frame, using a custom configuration.
    pub fn with_config(config: Configuration, width: usize, height: usize) -> Self {
        let mut image = Image::new(width, height);
        image.config = config;
        image
    }

    /// Create an image whose root frame is `root`.
    pub fn from_frame(root: Frame<P>) -> Self {
        Image {
            root,
            frames: Vec::new(),
            metadata: ImageMetadata::default(),
            config: Configuration::default(),
        }
    }

    pub fn from_pixels(pixels: PixelBuffer<P>) -> Self {
        Image::from_frame(Frame::from_pixels(pixels))
    }

    pub fn width(&self) -> usize {
        self.root.width()
    }

    pub fn height(&self) -> usize {
        self.root.height()
    }

    pub fn size(&self) -> Size {
        self.root.size()
    }

    /// The rectangle `(0, 0, width, height)`.
    pub fn bounds(&self) -> Rectangle {
        self.root.bounds()
    }

    pub fn root(&self) -> &Frame<P> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Frame<P> {
        &mut self.root
    }

    /// The frames following the root frame, in animation order.
    pub fn frames(&self) -> &[Frame<P>] {
        &self.frames
    }

    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Frame<P>> {
        self.frames.get_mut(index)
    }

    /// The number of frames including the root frame.
    pub fn frame_count(&self) -> usize {
        1 + self.frames.len()
    }

    /// All frames, the root frame first.
    pub fn all_frames(&self) -> impl Iterator<Item = &Frame<P>> {
        std::iter::once(&self.root).chain(&self.frames)
    }

    /// Append a frame to the animation.
    pub fn push_frame(&mut self, frame: Frame<P>) -> Result<(), ImageError> {
        self.check_size(&frame)?;
        self.frames.push(frame);
        Ok(())
    }

    /// Insert a frame before the frame at `index` of [`Image::frames`].
    pub fn insert_frame(&mut self, index: usize, frame: Frame<P>) -> Result<(), ImageError> {
        if index > self.frames.len() {
            return Err(ImageError::FrameIndex {
                index,
                count: self.frames.len(),
            });
        }

        self.check_size(&frame)?;
        self.frames.insert(index, frame);
        Ok(())
    }

    /// Remove the frame at `index` of [`Image::frames`]. The root frame always stays.
    pub fn remove_frame(&mut self, index: usize) -> Result<Frame<P>, ImageError> {
        if index >= self.frames.len() {
            return Err(ImageError::FrameIndex {
                index,
                count: self.frames.len(),
            });
        }

        Ok(self.frames.remove(index))
    }

    fn check_size(&self, frame: &Frame<P>) -> Result<(), ImageError> {
        if frame.size() != self.size() {
            return Err(ImageError::FrameSize {
                expected: self.size(),
                found: frame.size(),
            });
        }

        Ok(())
    }

    /// Replace the pixels of every frame, possibly changing the size of the image.
    ///
    /// `map` is called for the root frame and then for every further frame. All replacements must
    /// share their dimensions, which become the new size of the image. Otherwise no frame is
    /// changed.
    pub fn reshape_frames(
        &mut self,
        map: impl FnMut(&Frame<P>) -> PixelBuffer<P>,
    ) -> Result<(), ImageError> {
        let replacements: Vec<_> = self.all_frames().map(map).collect();
        let size_of = |pixels: &PixelBuffer<P>| Size::new(pixels.width(), pixels.height());

        let mut sizes = replacements.iter().map(size_of);
        if let Some(expected) = sizes.next() {
            if let Some(found) = sizes.find(|&size| size != expected) {
                return Err(ImageError::FrameSize { expected, found });
            }
        }

        let frames = std::iter::once(&mut self.root).chain(self.frames.iter_mut());
        for (frame, pixels) in frames.zip(replacements) {
            frame.replace_pixels(pixels);
        }

        Ok(())
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ImageMetadata {
        &mut self.metadata
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn set_config(&mut self, config: Configuration) {
        self.config = config;
    }

    /// Every frame mutably, the root first, next to the configuration.
    pub(crate) fn frames_with_config(
        &mut self,
    ) -> (impl Iterator<Item = &mut Frame<P>>, &Configuration) {
        let frames = std::iter::once(&mut self.root).chain(self.frames.iter_mut());
        (frames, &self.config)
    }

    /// Convert all frames into another pixel format.
    pub fn convert<Q: Pixel>(&self) -> Image<Q> {
        Image {
            root: self.root.convert(),
            frames: self.frames.iter().map(Frame::convert).collect(),
            metadata: self.metadata.clone(),
            config: self.config.clone(),
        }
    }

    /// Apply a processor to the whole image.
    pub fn apply(&mut self, processor: &(impl ImageProcessor<P> + ?Sized)) -> Result<(), ProcessingError> {
        let bounds = self.bounds();
        processing::apply_to_image(processor, self, bounds)
    }

    /// Apply a processor to a rectangle of the image.
    pub fn apply_to(
        &mut self,
        processor: &(impl ImageProcessor<P> + ?Sized),
        rect: Rectangle,
    ) -> Result<(), ProcessingError> {
        processing::apply_to_image(processor, self, rect)
    }

    /// Run a sequence of operations on this image.
    ///
    /// Operations are applied in the order they are called. The first failure ends the sequence;
    /// operations that completed before it stay applied.
    pub fn mutate(
        &mut self,
        operations: impl FnOnce(&mut Operations<'_, P>) -> Result<(), ProcessingError>,
    ) -> Result<(), ProcessingError> {
        let mut ops = Operations::new(self);
        operations(&mut ops)
    }

    /// Run a sequence of operations on a copy of this image.
    pub fn generate(
        &self,
        operations: impl FnOnce(&mut Operations<'_, P>) -> Result<(), ProcessingError>,
    ) -> Result<Image<P>, ProcessingError> {
        let mut copy = self.clone();
        copy.mutate(operations)?;
        Ok(copy)
    }

    /// Compress every frame to one byte per channel.
    ///
    /// Partitions have the preferred length of the configuration.
    pub fn pack(&self) -> Result<PackedImage, BufferError> {
        let partition_len = self.config.preferred_partition_length();
        let frames = self
            .all_frames()
            .map(|frame| frame.pack(partition_len))
            .collect::<Result<_, _>>()?;
        log::trace!("packed {} frames of {}", self.frame_count(), self.size());

        Ok(PackedImage {
            frames,
            metadata: self.metadata.clone(),
            config: self.config.clone(),
        })
    }
}

impl PackedImage {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The number of bytes all compressed frames occupy.
    pub fn compressed_len(&self) -> usize {
        self.frames.iter().map(PackedFrame::compressed_len).sum()
    }

    /// Restore the image in any pixel format.
    pub fn unpack<P: Pixel>(&self) -> Result<Image<P>, BufferError> {
        let mut frames = self.frames.iter().map(PackedFrame::unpack);
        let root = match frames.next() {
            Some(root) => root?,
            None => Frame::new(0, 0),
        };

        Ok(Image {
            root,
            frames: frames.collect::<Result<_, _>>()?,
            metadata: self.metadata.clone(),
            config: self.config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelflow_texel::Rgba32;

    #[test]
    fn frames_must_match_the_root() {
        let mut image = Image::<Rgba32>::new(4, 3);
        image.push_frame(Frame::new(4, 3)).unwrap();
        assert_eq!(
            image.push_frame(Frame::new(3, 4)),
            Err(ImageError::FrameSize {
                expected: Size::new(4, 3),
                found: Size::new(3, 4),
            })
        );

        assert_eq!(
            image.insert_frame(5, Frame::new(4, 3)),
            Err(ImageError::FrameIndex { index: 5, count: 1 })
        );
        image
            .insert_frame(0, Frame::filled(4, 3, Rgba32::WHITE).unwrap())
            .unwrap();
        assert_eq!(image.frame_count(), 3);
        assert_eq!(image.frames()[0][(0, 0)], Rgba32::WHITE);

        let removed = image.remove_frame(0).unwrap();
        assert_eq!(removed[(3, 2)], Rgba32::WHITE);
        assert!(image.remove_frame(1).is_err());
        assert_eq!(image.frame_count(), 2);
    }

    #[test]
    fn reshaping_keeps_frames_uniform() {
        let mut image = Image::<Rgba32>::new(4, 3);
        image.push_frame(Frame::filled(4, 3, Rgba32::WHITE).unwrap()).unwrap();

        image
            .reshape_frames(|frame| PixelBuffer::filled(2, 5, frame[(0, 0)]).unwrap())
            .unwrap();
        assert_eq!(image.size(), Size::new(2, 5));
        assert_eq!(image.frames()[0].size(), Size::new(2, 5));
        assert_eq!(image.frames()[0][(1, 4)], Rgba32::WHITE);

        let mut calls = 0;
        let mismatch = image.reshape_frames(|_| {
            calls += 1;
            PixelBuffer::new(calls, 1)
        });
        assert_eq!(
            mismatch,
            Err(ImageError::FrameSize {
                expected: Size::new(1, 1),
                found: Size::new(2, 1),
            })
        );
        assert_eq!(image.size(), Size::new(2, 5));
        assert_eq!(image.push_frame(Frame::new(2, 5)), Ok(()));
    }

    #[test]
    fn pack_and_unpack_all_frames() {
        let mut image = Image::from_frame(Frame::filled(5, 5, Rgba32::rgb(10, 20, 30)).unwrap());
        image.push_frame(Frame::filled(5, 5, Rgba32::WHITE).unwrap()).unwrap();
        image.metadata_mut().repeat_count = 3;
        image.set_config(Configuration::new().with_preferred_partition_length(16));

        let packed = image.pack().unwrap();
        assert_eq!(packed.frame_count(), 2);
        assert_eq!(packed.compressed_len(), 2 * 5 * 5 * 4);

        let restored = packed.unpack::<Rgba32>().unwrap();
        assert_eq!(restored.root(), image.root());
        assert_eq!(restored.frames(), image.frames());
        assert_eq!(restored.metadata().repeat_count, 3);
    }

    #[test]
    fn zero_partition_length_fails_packing() {
        let mut image = Image::<Rgba32>::new(2, 2);
        image.set_config(Configuration::new().with_preferred_partition_length(0));
        assert!(matches!(
            image.pack(),
            Err(BufferError::InvalidPartitionLength { preferred: 0, .. })
        ));
    }
}
