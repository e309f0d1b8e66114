//! Processors changing the geometry of an image.
//!
//! These work on the image as a whole: every frame is replaced in `before_image_apply`, the new
//! buffers all share one size which becomes the size of the image. Rotation and flipping always
//! cover the whole image, cropping selects its own rectangle.
use pixelflow_texel::{Pixel, PixelBuffer, Rgba32};
use rayon::prelude::*;

use crate::config::Configuration;
use crate::error::{BoxError, ProcessingError};
use crate::frame::Frame;
use crate::geometry::{Rectangle, Region};
use crate::image::Image;
use crate::metadata::{PropertyTag, PropertyValue};
use crate::processing::{
    apply_to_frame, BinaryThreshold, EdgeDetection, EdgeDetector, ImageProcessor, Operations,
};

/// Clockwise rotation by a multiple of a quarter turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RotateMode {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FlipMode {
    #[default]
    None,
    /// Mirror the columns.
    Horizontal,
    /// Mirror the rows.
    Vertical,
}

/// Rotates, then flips every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RotateFlip {
    pub rotate: RotateMode,
    pub flip: FlipMode,
}

/// Cuts every frame down to a rectangle.
///
/// The rectangle is intersected with the image. An intersection without pixels fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crop(pub Rectangle);

/// Crops to the area containing edges.
///
/// A copy of each frame is run through Sobel edge detection and a binary threshold within the
/// target rectangle. The image is then cropped to the box around every pixel above the threshold
/// in any frame. Images without such pixels are left unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntropyCrop {
    pub threshold: f32,
}

/// Rotates and flips the image upright according to its EXIF orientation.
///
/// The orientation property is reset to `1` afterwards. Missing or unknown orientations leave
/// the image unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutoOrient;

impl RotateFlip {
    pub fn new(rotate: RotateMode, flip: FlipMode) -> Self {
        RotateFlip { rotate, flip }
    }

    fn transform<P: Pixel>(&self, pixels: &PixelBuffer<P>, config: &Configuration) -> PixelBuffer<P> {
        let rotated = rotate_pixels(pixels, self.rotate, config);
        match self.flip {
            FlipMode::None => rotated,
            flip => flip_pixels(&rotated, flip, config),
        }
    }

    fn apply<P: Pixel>(&self, image: &mut Image<P>) -> Result<(), BoxError> {
        let config = image.config().clone();
        image.reshape_frames(|frame| self.transform(frame.pixels(), &config))?;
        Ok(())
    }
}

/// Fill a new buffer by reading each of its pixels from `position(x, y)` of the source.
fn remap<P, F>(
    source: &PixelBuffer<P>,
    width: usize,
    height: usize,
    config: &Configuration,
    position: F,
) -> PixelBuffer<P>
where
    P: Pixel,
    F: Fn(usize, usize) -> (usize, usize) + Sync,
{
    let mut target = PixelBuffer::new(width, height);
    if target.is_empty() {
        return target;
    }

    config.install(|| {
        target
            .as_mut_slice()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = source[position(x, y)];
                }
            });
    });
    target
}

fn rotate_pixels<P: Pixel>(pixels: &PixelBuffer<P>, mode: RotateMode, config: &Configuration) -> PixelBuffer<P> {
    let (width, height) = (pixels.width(), pixels.height());
    match mode {
        RotateMode::None => pixels.clone(),
        RotateMode::Rotate90 => remap(pixels, height, width, config, |x, y| (y, height - 1 - x)),
        RotateMode::Rotate180 => {
            remap(pixels, width, height, config, |x, y| (width - 1 - x, height - 1 - y))
        }
        RotateMode::Rotate270 => remap(pixels, height, width, config, |x, y| (width - 1 - y, x)),
    }
}

fn flip_pixels<P: Pixel>(pixels: &PixelBuffer<P>, mode: FlipMode, config: &Configuration) -> PixelBuffer<P> {
    let (width, height) = (pixels.width(), pixels.height());
    match mode {
        FlipMode::None => pixels.clone(),
        FlipMode::Horizontal => remap(pixels, width, height, config, |x, y| (width - 1 - x, y)),
        FlipMode::Vertical => remap(pixels, width, height, config, |x, y| (x, height - 1 - y)),
    }
}

fn crop_pixels<P: Pixel>(pixels: &PixelBuffer<P>, region: &Region, config: &Configuration) -> PixelBuffer<P> {
    let (left, top) = (region.columns.start, region.rows.start);
    remap(pixels, region.width(), region.height(), config, |x, y| (x + left, y + top))
}

/// Replace every frame by the pixels of `region`.
fn crop_image<P: Pixel>(image: &mut Image<P>, region: &Region) -> Result<(), BoxError> {
    log::debug!(
        "cropping a {} image to {}x{} at ({}, {})",
        image.size(),
        region.width(),
        region.height(),
        region.columns.start,
        region.rows.start
    );

    let config = image.config().clone();
    image.reshape_frames(|frame| crop_pixels(frame.pixels(), region, &config))?;
    Ok(())
}

impl<P: Pixel> ImageProcessor<P> for RotateFlip {
    fn name(&self) -> &str {
        "rotate flip"
    }

    fn before_image_apply(&self, image: &mut Image<P>, _: Rectangle) -> Result<(), BoxError> {
        self.apply(image)
    }

    fn on_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<P: Pixel> ImageProcessor<P> for Crop {
    fn name(&self) -> &str {
        "crop"
    }

    fn before_image_apply(&self, image: &mut Image<P>, _: Rectangle) -> Result<(), BoxError> {
        let clipped = self.0.intersect(image.bounds());
        if clipped.is_empty() {
            let size = image.size();
            return Err(format!("crop rectangle {} selects no pixels of a {} image", self.0, size).into());
        }

        // Intersected with the bounds, so both edges are within `0..=size`.
        let region = Region {
            columns: clipped.left() as usize..clipped.right() as usize,
            rows: clipped.top() as usize..clipped.bottom() as usize,
        };
        crop_image(image, &region)
    }

    fn on_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        Ok(())
    }
}

impl EntropyCrop {
    pub fn new(threshold: f32) -> Self {
        EntropyCrop { threshold }
    }

    /// The columns and rows of `frame` holding edges.
    fn edges<P: Pixel>(
        &self,
        frame: &Frame<P>,
        rect: Rectangle,
        config: &Configuration,
    ) -> Result<Option<Region>, BoxError> {
        let mut edges = frame.clone();
        apply_to_frame(&EdgeDetector::new(EdgeDetection::Sobel), &mut edges, rect, config)?;
        apply_to_frame(&BinaryThreshold::new(self.threshold), &mut edges, rect, config)?;

        let background = P::from_vector4(Rgba32::BLACK.to_vector4());
        let Region { columns, rows } = Region::clip(rect, edges.width(), edges.height());
        let mut found: Option<Region> = None;
        for y in rows {
            let row = &edges.row(y)[columns.clone()];
            let first = row.iter().position(|&pixel| pixel != background);
            let last = row.iter().rposition(|&pixel| pixel != background);
            if let (Some(first), Some(last)) = (first, last) {
                let line = Region {
                    columns: columns.start + first..columns.start + last + 1,
                    rows: y..y + 1,
                };
                found = Some(match found {
                    Some(region) => union(&region, &line),
                    None => line,
                });
            }
        }

        Ok(found)
    }
}

fn union(a: &Region, b: &Region) -> Region {
    Region {
        columns: a.columns.start.min(b.columns.start)..a.columns.end.max(b.columns.end),
        rows: a.rows.start.min(b.rows.start)..a.rows.end.max(b.rows.end),
    }
}

impl Default for EntropyCrop {
    fn default() -> Self {
        EntropyCrop::new(0.5)
    }
}

impl<P: Pixel> ImageProcessor<P> for EntropyCrop {
    fn name(&self) -> &str {
        "entropy crop"
    }

    fn before_image_apply(&self, image: &mut Image<P>, rect: Rectangle) -> Result<(), BoxError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!("threshold {} is outside of [0, 1]", self.threshold).into());
        }

        let mut found: Option<Region> = None;
        for frame in image.all_frames() {
            if let Some(edges) = self.edges(frame, rect, image.config())? {
                found = Some(match found {
                    Some(region) => union(&region, &edges),
                    None => edges,
                });
            }
        }

        match found {
            Some(region) if region != Region::clip(image.bounds(), image.width(), image.height()) => {
                crop_image(image, &region)
            }
            _ => Ok(()),
        }
    }

    fn on_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        Ok(())
    }
}

impl AutoOrient {
    /// The transformation making an image with EXIF `orientation` upright.
    pub fn for_orientation(orientation: i64) -> Option<RotateFlip> {
        use self::{FlipMode as F, RotateMode as R};

        let (rotate, flip) = match orientation {
            1 => (R::None, F::None),
            2 => (R::None, F::Horizontal),
            3 => (R::Rotate180, F::None),
            4 => (R::None, F::Vertical),
            5 => (R::Rotate90, F::Horizontal),
            6 => (R::Rotate90, F::None),
            7 => (R::Rotate90, F::Vertical),
            8 => (R::Rotate270, F::None),
            _ => return None,
        };

        Some(RotateFlip::new(rotate, flip))
    }
}

impl<P: Pixel> ImageProcessor<P> for AutoOrient {
    fn name(&self) -> &str {
        "auto orient"
    }

    fn before_image_apply(&self, image: &mut Image<P>, _: Rectangle) -> Result<(), BoxError> {
        let orientation = match image.metadata().property(&PropertyTag::ORIENTATION) {
            Some(&PropertyValue::Integer(orientation)) => orientation,
            _ => return Ok(()),
        };

        let Some(transform) = AutoOrient::for_orientation(orientation) else {
            log::debug!("ignoring unknown orientation {}", orientation);
            return Ok(());
        };

        transform.apply(image)?;
        image
            .metadata_mut()
            .set_property(PropertyTag::ORIENTATION, PropertyValue::Integer(1));
        Ok(())
    }

    fn on_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<P: Pixel> Operations<'_, P> {
    pub fn rotate(&mut self, mode: RotateMode) -> Result<&mut Self, ProcessingError> {
        self.rotate_flip(mode, FlipMode::None)
    }

    pub fn flip(&mut self, mode: FlipMode) -> Result<&mut Self, ProcessingError> {
        self.rotate_flip(RotateMode::None, mode)
    }

    pub fn rotate_flip(&mut self, rotate: RotateMode, flip: FlipMode) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&RotateFlip::new(rotate, flip))
    }

    pub fn crop(&mut self, rect: Rectangle) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Crop(rect))
    }

    /// Crop to the edges found with `threshold`, within the current target.
    pub fn entropy_crop(&mut self, threshold: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&EntropyCrop::new(threshold))
    }

    pub fn auto_orient(&mut self) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&AutoOrient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    /// Every pixel records its own position.
    fn numbered(width: usize, height: usize) -> Image<Rgba32> {
        let mut image = Image::new(width, height);
        for y in 0..height {
            for x in 0..width {
                image.root_mut()[(x, y)] = Rgba32::rgb(x as u8, y as u8, 0);
            }
        }
        image
    }

    fn at(x: u8, y: u8) -> Rgba32 {
        Rgba32::rgb(x, y, 0)
    }

    #[test]
    fn quarter_turns() {
        let mut image = numbered(3, 2);
        image.apply(&RotateFlip::new(RotateMode::Rotate90, FlipMode::None)).unwrap();
        assert_eq!(image.size(), Size::new(2, 3));
        assert_eq!(image.root()[(0, 0)], at(0, 1));
        assert_eq!(image.root()[(1, 0)], at(0, 0));
        assert_eq!(image.root()[(0, 2)], at(2, 1));

        let mut image = numbered(3, 2);
        image.apply(&RotateFlip::new(RotateMode::Rotate270, FlipMode::None)).unwrap();
        assert_eq!(image.size(), Size::new(2, 3));
        assert_eq!(image.root()[(0, 0)], at(2, 0));
        assert_eq!(image.root()[(1, 2)], at(0, 1));

        let mut image = numbered(3, 2);
        image.apply(&RotateFlip::new(RotateMode::Rotate180, FlipMode::None)).unwrap();
        assert_eq!(image.root()[(0, 0)], at(2, 1));
        assert_eq!(image.root()[(2, 1)], at(0, 0));
    }

    #[test]
    fn flips_mirror() {
        let mut image = numbered(3, 2);
        image.apply(&RotateFlip::new(RotateMode::None, FlipMode::Horizontal)).unwrap();
        assert_eq!(image.root()[(0, 1)], at(2, 1));

        image.apply(&RotateFlip::new(RotateMode::None, FlipMode::Vertical)).unwrap();
        assert_eq!(image.root()[(0, 0)], at(2, 1));
        assert_eq!(image.size(), Size::new(3, 2));
    }

    #[test]
    fn rotation_covers_every_frame() {
        let mut image = numbered(4, 1);
        image.push_frame(Frame::filled(4, 1, Rgba32::WHITE).unwrap()).unwrap();
        image.apply(&RotateFlip::new(RotateMode::Rotate90, FlipMode::Vertical)).unwrap();

        assert_eq!(image.size(), Size::new(1, 4));
        assert_eq!(image.frames()[0].size(), Size::new(1, 4));
        assert_eq!(image.root()[(0, 0)], at(3, 0));
    }

    #[test]
    fn crop_intersects_the_image() {
        let mut image = numbered(5, 5);
        image.apply(&Crop(Rectangle::new(3, -2, 10, 4))).unwrap();
        assert_eq!(image.size(), Size::new(2, 2));
        assert_eq!(image.root()[(0, 0)], at(3, 0));
        assert_eq!(image.root()[(1, 1)], at(4, 1));

        let err = image.apply(&Crop(Rectangle::new(9, 9, 2, 2))).unwrap_err();
        assert_eq!(err.processor(), "crop");
        assert_eq!(image.size(), Size::new(2, 2));
    }

    #[test]
    fn entropy_crop_keeps_the_edges() {
        let mut image = Image::from_frame(Frame::filled(10, 10, Rgba32::BLACK).unwrap());
        for (x, y) in [(4, 3), (5, 3), (4, 4), (5, 4)] {
            image.root_mut()[(x, y)] = Rgba32::WHITE;
        }

        image.apply(&EntropyCrop::default()).unwrap();
        // The square and the ring of pixels whose neighborhood reaches it.
        assert_eq!(image.size(), Size::new(4, 4));
        assert_eq!(image.root()[(1, 1)], Rgba32::WHITE);
        assert_eq!(image.root()[(0, 0)], Rgba32::BLACK);
    }

    #[test]
    fn entropy_crop_looks_only_at_the_target() {
        let mut image = Image::from_frame(Frame::filled(10, 10, Rgba32::BLACK).unwrap());
        for (x, y) in [(4, 3), (5, 3), (4, 4), (5, 4), (0, 9)] {
            image.root_mut()[(x, y)] = Rgba32::WHITE;
        }

        image
            .mutate(|ops| {
                ops.within(Rectangle::new(2, 1, 8, 7)).entropy_crop(0.5)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(image.size(), Size::new(4, 4));
    }

    #[test]
    fn entropy_crop_without_edges() {
        let mut image = Image::from_frame(Frame::filled(6, 4, Rgba32::rgb(40, 40, 40)).unwrap());
        image.apply(&EntropyCrop::default()).unwrap();
        assert_eq!(image.size(), Size::new(6, 4));

        assert!(image.apply(&EntropyCrop::new(1.5)).is_err());
    }

    #[test]
    fn orientation_is_applied_once() {
        let mut image = numbered(3, 2);
        image
            .metadata_mut()
            .set_property(PropertyTag::ORIENTATION, PropertyValue::Integer(6));

        image.apply(&AutoOrient).unwrap();
        assert_eq!(image.size(), Size::new(2, 3));
        assert_eq!(image.root()[(1, 0)], at(0, 0));
        assert_eq!(
            image.metadata().property(&PropertyTag::ORIENTATION),
            Some(&PropertyValue::Integer(1))
        );

        image.apply(&AutoOrient).unwrap();
        assert_eq!(image.size(), Size::new(2, 3));
    }

    #[test]
    fn transposing_orientations() {
        // Orientation 5 mirrors along the main diagonal.
        let mut image = numbered(3, 2);
        image.apply(&AutoOrient::for_orientation(5).unwrap()).unwrap();
        assert_eq!(image.root()[(1, 2)], at(2, 1));
        assert_eq!(image.root()[(0, 1)], at(1, 0));

        assert_eq!(AutoOrient::for_orientation(0), None);
        assert_eq!(AutoOrient::for_orientation(9), None);
    }
}
