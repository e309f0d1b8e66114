//! The staged processor protocol and the algorithms built on it.
//!
//! A processor is a descriptor of one transformation. It owns no image data, it is handed the
//! image and a target rectangle for each stage of one application:
//!
//! 1. [`before_image_apply`] once, with the whole image.
//! 2. For the root frame and then every further frame in order: [`before_apply`],
//!    [`on_apply`] and [`after_apply`].
//! 3. [`after_image_apply`] once, with the whole image.
//!
//! The first stage that fails ends the application. Its error is wrapped in a
//! [`ProcessingError`] naming the processor, the stage, the rectangle and the frame.
//!
//! [`before_image_apply`]: ImageProcessor::before_image_apply
//! [`before_apply`]: ImageProcessor::before_apply
//! [`on_apply`]: ImageProcessor::on_apply
//! [`after_apply`]: ImageProcessor::after_apply
//! [`after_image_apply`]: ImageProcessor::after_image_apply
use pixelflow_texel::{Pixel, Vector4};
use rayon::prelude::*;

use crate::config::Configuration;
use crate::error::{BoxError, ProcessingError, Stage};
use crate::frame::Frame;
use crate::geometry::{Rectangle, Region};
use crate::image::Image;

mod binarization;
mod color_matrix;
mod convolution;
mod effects;
mod overlays;
mod quantize;
mod transforms;

pub use self::binarization::{
    BinaryThreshold, ErrorDiffuser, ErrorDiffusion, OrderedDither, OrderedDitherMatrix,
};
pub use self::color_matrix::{
    ColorBlindness, ColorMatrix, ColorMatrixProcessor, GrayscaleMode, Lomograph, Polaroid,
};
pub use self::convolution::{
    Convolution, Convolution2D, ConvolutionTwoPass, EdgeDetection, EdgeDetector, GaussianBlur,
    GaussianSharpen, Kernel,
};
pub use self::effects::{Alpha, BackgroundColor, Brightness, Invert, Pixelate};
pub use self::overlays::{Glow, Vignette};
pub use self::quantize::{
    OctreeQuantizer, PaletteQuantizer, Quantization, QuantizeProcessor, QuantizedFrame, Quantizer,
    WuQuantizer,
};
pub use self::transforms::{AutoOrient, Crop, EntropyCrop, FlipMode, RotateFlip, RotateMode};

/// One transformation, applied through the staged protocol.
///
/// Only [`on_apply`] is required. The rectangle is passed unclipped to every stage; per-pixel
/// loops clip it with [`Region::clip`].
///
/// [`on_apply`]: ImageProcessor::on_apply
pub trait ImageProcessor<P: Pixel>: Sync {
    /// The name reported in failures and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Prepare with the whole image, before any frame is processed.
    fn before_image_apply(&self, _image: &mut Image<P>, _rect: Rectangle) -> Result<(), BoxError> {
        Ok(())
    }

    /// Prepare a frame.
    fn before_apply(
        &self,
        _frame: &mut Frame<P>,
        _rect: Rectangle,
        _config: &Configuration,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// The per-pixel work on a frame.
    fn on_apply(
        &self,
        frame: &mut Frame<P>,
        rect: Rectangle,
        config: &Configuration,
    ) -> Result<(), BoxError>;

    /// Finish a frame.
    fn after_apply(
        &self,
        _frame: &mut Frame<P>,
        _rect: Rectangle,
        _config: &Configuration,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Finish with the whole image, after every frame was processed.
    fn after_image_apply(&self, _image: &mut Image<P>, _rect: Rectangle) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Wraps a closure that runs once with the whole image.
///
/// Created by [`Operations::run`].
pub struct DelegateProcessor<F>(pub F);

/// A sequence of processor applications on one image.
///
/// Every operation is applied to the current target rectangle, the whole image unless
/// [`within`] selected another one. Algorithms add one method each, for example
/// [`grayscale`] or [`quantize`].
///
/// [`within`]: Operations::within
/// [`grayscale`]: Operations::grayscale
/// [`quantize`]: Operations::quantize
pub struct Operations<'img, P: Pixel> {
    image: &'img mut Image<P>,
    region: Option<Rectangle>,
}

/// Apply all stages of a processor to an image.
pub fn apply_to_image<P, T>(
    processor: &T,
    image: &mut Image<P>,
    rect: Rectangle,
) -> Result<(), ProcessingError>
where
    P: Pixel,
    T: ImageProcessor<P> + ?Sized,
{
    let name = processor.name();
    let diagnostics = image.config().diagnostics();
    let fail = |stage, frame, cause| ProcessingError::new(name, stage, rect, frame, cause, diagnostics);

    log::debug!(
        "applying {} to {} of a {} image with {} frames",
        name,
        rect,
        image.size(),
        image.frame_count()
    );

    log::trace!("{}: {}", name, Stage::BeforeImageApply);
    processor
        .before_image_apply(image, rect)
        .map_err(|cause| fail(Stage::BeforeImageApply, None, cause))?;

    let (frames, config) = image.frames_with_config();
    for (index, frame) in frames.enumerate() {
        run_frame_stages(processor, frame, rect, config)
            .map_err(|(stage, cause)| fail(stage, Some(index), cause))?;
    }

    log::trace!("{}: {}", name, Stage::AfterImageApply);
    processor
        .after_image_apply(image, rect)
        .map_err(|cause| fail(Stage::AfterImageApply, None, cause))
}

/// Apply the per-frame stages of a processor to a single frame.
pub fn apply_to_frame<P, T>(
    processor: &T,
    frame: &mut Frame<P>,
    rect: Rectangle,
    config: &Configuration,
) -> Result<(), ProcessingError>
where
    P: Pixel,
    T: ImageProcessor<P> + ?Sized,
{
    let name = processor.name();
    log::debug!("applying {} to {} of a {} frame", name, rect, frame.size());
    run_frame_stages(processor, frame, rect, config).map_err(|(stage, cause)| {
        ProcessingError::new(name, stage, rect, None, cause, config.diagnostics())
    })
}

fn run_frame_stages<P, T>(
    processor: &T,
    frame: &mut Frame<P>,
    rect: Rectangle,
    config: &Configuration,
) -> Result<(), (Stage, BoxError)>
where
    P: Pixel,
    T: ImageProcessor<P> + ?Sized,
{
    processor
        .before_apply(frame, rect, config)
        .map_err(|cause| (Stage::BeforeApply, cause))?;
    processor
        .on_apply(frame, rect, config)
        .map_err(|cause| (Stage::OnApply, cause))?;
    processor
        .after_apply(frame, rect, config)
        .map_err(|cause| (Stage::AfterApply, cause))
}

/// Run `op` on the clipped span of every selected row, rows in parallel.
///
/// The arguments are the column of the first pixel of the span, the row, and the span. Rows are
/// disjoint slices of the frame, no two calls see the same pixel.
pub(crate) fn for_each_row<P, F>(frame: &mut Frame<P>, rect: Rectangle, config: &Configuration, op: F)
where
    P: Pixel,
    F: Fn(usize, usize, &mut [P]) + Sync,
{
    let width = frame.width();
    let Region { columns, rows } = Region::clip(rect, width, frame.height());
    if columns.is_empty() {
        return;
    }

    let pixels = &mut frame.pixels_mut().as_mut_slice()[rows.start * width..rows.end * width];
    config.install(|| {
        pixels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(offset, row)| op(columns.start, rows.start + offset, &mut row[columns.clone()]));
    });
}

/// Replace every selected pixel by a function of its position and its normalized components.
pub(crate) fn map_vectors<P, F>(frame: &mut Frame<P>, rect: Rectangle, config: &Configuration, map: F)
where
    P: Pixel,
    F: Fn(usize, usize, Vector4) -> Vector4 + Sync,
{
    for_each_row(frame, rect, config, |x, y, span| {
        for (offset, pixel) in span.iter_mut().enumerate() {
            let vector = map(x + offset, y, pixel.to_vector4());
            pixel.pack_from_vector4(vector);
        }
    });
}

impl<P, F> ImageProcessor<P> for DelegateProcessor<F>
where
    P: Pixel,
    F: Fn(&mut Image<P>) -> Result<(), BoxError> + Sync,
{
    fn name(&self) -> &str {
        "delegate"
    }

    fn before_image_apply(&self, image: &mut Image<P>, _: Rectangle) -> Result<(), BoxError> {
        (self.0)(image)
    }

    fn on_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<'img, P: Pixel> Operations<'img, P> {
    pub(crate) fn new(image: &'img mut Image<P>) -> Self {
        Operations {
            image,
            region: None,
        }
    }

    /// The image as modified by the operations so far.
    pub fn image(&self) -> &Image<P> {
        &*self.image
    }

    /// Apply the following operations only to `rect`.
    pub fn within(&mut self, rect: Rectangle) -> &mut Self {
        self.region = Some(rect);
        self
    }

    /// Apply the following operations to the whole image again.
    pub fn whole_image(&mut self) -> &mut Self {
        self.region = None;
        self
    }

    /// The rectangle the next operation applies to.
    pub fn target(&self) -> Rectangle {
        self.region.unwrap_or_else(|| self.image.bounds())
    }

    pub fn apply_processor(
        &mut self,
        processor: &(impl ImageProcessor<P> + ?Sized),
    ) -> Result<&mut Self, ProcessingError> {
        let rect = self.target();
        apply_to_image(processor, self.image, rect)?;
        Ok(self)
    }

    /// Apply processors one after another, stopping at the first failure.
    pub fn apply_processors(
        &mut self,
        processors: &[&dyn ImageProcessor<P>],
    ) -> Result<&mut Self, ProcessingError> {
        for processor in processors {
            self.apply_processor(*processor)?;
        }
        Ok(self)
    }

    /// Run a closure with the whole image as one operation of the sequence.
    pub fn run(
        &mut self,
        op: impl Fn(&mut Image<P>) -> Result<(), BoxError> + Sync,
    ) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&DelegateProcessor(op))
    }
}
