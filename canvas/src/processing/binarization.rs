//! Reduction to two colors: thresholds, ordered dithering and error diffusion.
use pixelflow_texel::{Pixel, Rgba32, Vector4};

use crate::config::Configuration;
use crate::error::{BoxError, ProcessingError};
use crate::frame::Frame;
use crate::geometry::{Rectangle, Region};
use crate::math;
use crate::processing::{for_each_row, ColorMatrixProcessor, GrayscaleMode, ImageProcessor, Operations};

/// Pixels with a luma at or above `threshold` become `upper`, all others `lower`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinaryThreshold {
    /// In `[0, 1]`.
    pub threshold: f32,
    pub upper: Rgba32,
    pub lower: Rgba32,
}

/// The threshold patterns of [`OrderedDither`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OrderedDitherMatrix {
    Bayer2x2,
    #[default]
    Bayer4x4,
    Bayer8x8,
    /// The classic 3×3 ordered pattern.
    Ordered3x3,
}

/// Compares one byte channel of every pixel against a tiled threshold pattern.
///
/// A pixel whose channel value is at most the pattern entry becomes `lower`, otherwise `upper`.
/// Each pixel is decided on its own, rows are processed in parallel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderedDither {
    pub matrix: OrderedDitherMatrix,
    /// The channel compared, `0..=3` in `r, g, b, a` order. Formats without color channels
    /// always compare alpha.
    pub index: usize,
    pub upper: Rgba32,
    pub lower: Rgba32,
}

/// The diffusion matrices of [`ErrorDiffusion`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ErrorDiffuser {
    Atkinson,
    Burks,
    #[default]
    FloydSteinberg,
    JarvisJudiceNinke,
    Sierra2,
    Sierra3,
    SierraLite,
    Stucki,
}

/// Thresholds pixels in raster order and spreads the error of each decision to the neighbors
/// that have not been visited yet.
///
/// The scan is sequential: the result for a pixel depends on every pixel before it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ErrorDiffusion {
    pub diffuser: ErrorDiffuser,
    /// In `[0, 1]`.
    pub threshold: f32,
    pub upper: Rgba32,
    pub lower: Rgba32,
}

fn grayscale<P: Pixel>(frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
    let gray = ColorMatrixProcessor::grayscale(GrayscaleMode::Bt709);
    ImageProcessor::<P>::on_apply(&gray, frame, rect, config)
}

fn check_threshold(threshold: f32) -> Result<(), BoxError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(format!("threshold {} is outside of [0, 1]", threshold).into())
    }
}

impl BinaryThreshold {
    pub fn new(threshold: f32) -> Self {
        BinaryThreshold {
            threshold,
            upper: Rgba32::WHITE,
            lower: Rgba32::BLACK,
        }
    }
}

impl<P: Pixel> ImageProcessor<P> for BinaryThreshold {
    fn name(&self) -> &str {
        "binary threshold"
    }

    fn before_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        check_threshold(self.threshold)?;
        grayscale(frame, rect, config)
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let upper = P::from_vector4(self.upper.to_vector4());
        let lower = P::from_vector4(self.lower.to_vector4());

        for_each_row(frame, rect, config, |_, _, span| {
            for pixel in span {
                let luma = math::luma(pixel.to_vector4());
                *pixel = if luma >= self.threshold { upper } else { lower };
            }
        });

        Ok(())
    }
}

impl OrderedDitherMatrix {
    /// The side length of the pattern.
    pub fn size(self) -> usize {
        match self {
            OrderedDitherMatrix::Bayer2x2 => 2,
            OrderedDitherMatrix::Bayer4x4 => 4,
            OrderedDitherMatrix::Bayer8x8 => 8,
            OrderedDitherMatrix::Ordered3x3 => 3,
        }
    }

    /// The byte thresholds, row by row.
    pub fn thresholds(self) -> Vec<u8> {
        match self {
            OrderedDitherMatrix::Ordered3x3 => vec![28, 255, 57, 142, 113, 227, 170, 198, 85],
            bayer => {
                let size = bayer.size();
                let cells = (size * size) as u32;
                bayer_indices(size)
                    .into_iter()
                    .map(|index| ((index + 1) * 256 / cells - 1) as u8)
                    .collect()
            }
        }
    }
}

/// The Bayer index matrix of a power of two side length, row by row.
fn bayer_indices(size: usize) -> Vec<u32> {
    if size <= 1 {
        return vec![0];
    }

    let half = size / 2;
    let inner = bayer_indices(half);
    let mut out = vec![0; size * size];
    for y in 0..size {
        for x in 0..size {
            let quadrant = match (x >= half, y >= half) {
                (false, false) => 0,
                (true, false) => 2,
                (false, true) => 3,
                (true, true) => 1,
            };
            out[y * size + x] = 4 * inner[(y % half) * half + x % half] + quadrant;
        }
    }

    out
}

impl OrderedDither {
    pub fn new(matrix: OrderedDitherMatrix) -> Self {
        OrderedDither {
            matrix,
            index: 0,
            upper: Rgba32::WHITE,
            lower: Rgba32::BLACK,
        }
    }
}

impl<P: Pixel> ImageProcessor<P> for OrderedDither {
    fn name(&self) -> &str {
        "ordered dither"
    }

    fn before_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        if self.index > 3 {
            return Err(format!("channel index {} is outside of 0..=3", self.index).into());
        }
        grayscale(frame, rect, config)
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let upper = P::from_vector4(self.upper.to_vector4());
        let lower = P::from_vector4(self.lower.to_vector4());
        let index = if P::HAS_COLOR { self.index } else { 3 };
        let size = self.matrix.size();
        let thresholds = self.matrix.thresholds();

        for_each_row(frame, rect, config, |x_start, y, span| {
            let pattern = &thresholds[(y % size) * size..][..size];
            let mut bytes = [0u8; 4];
            for (offset, pixel) in span.iter_mut().enumerate() {
                pixel.to_xyzw_bytes(&mut bytes, 0);
                let threshold = pattern[(x_start + offset) % size];
                *pixel = if threshold >= bytes[index] { lower } else { upper };
            }
        });

        Ok(())
    }
}

#[rustfmt::skip]
impl ErrorDiffuser {
    /// The coefficients, row by row with the current pixel in the first row, and the divisor.
    ///
    /// The current pixel sits just before the first nonzero coefficient of the first row.
    pub fn matrix(self) -> (&'static [&'static [f32]], f32) {
        match self {
            ErrorDiffuser::Atkinson => (&[
                &[0.0, 0.0, 1.0, 1.0],
                &[1.0, 1.0, 1.0, 0.0],
                &[0.0, 1.0, 0.0, 0.0],
            ], 8.0),
            ErrorDiffuser::Burks => (&[
                &[0.0, 0.0, 0.0, 8.0, 4.0],
                &[2.0, 4.0, 8.0, 4.0, 2.0],
            ], 32.0),
            ErrorDiffuser::FloydSteinberg => (&[
                &[0.0, 0.0, 7.0],
                &[3.0, 5.0, 1.0],
            ], 16.0),
            ErrorDiffuser::JarvisJudiceNinke => (&[
                &[0.0, 0.0, 0.0, 7.0, 5.0],
                &[3.0, 5.0, 7.0, 5.0, 3.0],
                &[1.0, 3.0, 5.0, 3.0, 1.0],
            ], 48.0),
            ErrorDiffuser::Sierra2 => (&[
                &[0.0, 0.0, 0.0, 4.0, 3.0],
                &[1.0, 2.0, 3.0, 2.0, 1.0],
            ], 16.0),
            ErrorDiffuser::Sierra3 => (&[
                &[0.0, 0.0, 0.0, 5.0, 3.0],
                &[2.0, 4.0, 5.0, 4.0, 2.0],
                &[0.0, 2.0, 3.0, 2.0, 0.0],
            ], 32.0),
            ErrorDiffuser::SierraLite => (&[
                &[0.0, 0.0, 2.0],
                &[1.0, 1.0, 0.0],
            ], 4.0),
            ErrorDiffuser::Stucki => (&[
                &[0.0, 0.0, 0.0, 8.0, 4.0],
                &[2.0, 4.0, 8.0, 4.0, 2.0],
                &[1.0, 2.0, 4.0, 2.0, 1.0],
            ], 42.0),
        }
    }
}

impl ErrorDiffusion {
    pub fn new(diffuser: ErrorDiffuser, threshold: f32) -> Self {
        ErrorDiffusion {
            diffuser,
            threshold,
            upper: Rgba32::WHITE,
            lower: Rgba32::BLACK,
        }
    }
}

impl<P: Pixel> ImageProcessor<P> for ErrorDiffusion {
    fn name(&self) -> &str {
        "error diffusion"
    }

    fn before_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        check_threshold(self.threshold)?;
        grayscale(frame, rect, config)
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        let region = Region::clip(rect, frame.width(), frame.height());
        if region.is_empty() {
            return Ok(());
        }

        let (matrix, divisor) = self.diffuser.matrix();
        let origin = matrix[0]
            .iter()
            .position(|&c| c != 0.0)
            .map_or(0, |first| first.saturating_sub(1));
        let upper = self.upper.to_vector4();
        let lower = self.lower.to_vector4();

        // Accumulated values are kept unclamped until the pixel is decided.
        let (width, height) = (region.width(), region.height());
        let mut working: Vec<Vector4> = Vec::with_capacity(width * height);
        for y in region.rows.clone() {
            let row = &frame.row(y)[region.columns.clone()];
            working.extend(row.iter().map(|p| p.to_vector4()));
        }

        for y in 0..height {
            for x in 0..width {
                let source = working[y * width + x];
                let chosen = if math::luma(source) >= self.threshold { upper } else { lower };

                let error = [source[0] - chosen[0], source[1] - chosen[1], source[2] - chosen[2]];
                working[y * width + x] = chosen;

                for (dy, coefficients) in matrix.iter().enumerate() {
                    let ny = y + dy;
                    if ny >= height {
                        break;
                    }

                    for (dx, &coefficient) in coefficients.iter().enumerate() {
                        let nx = match (x + dx).checked_sub(origin) {
                            Some(nx) if nx < width => nx,
                            _ => continue,
                        };
                        if coefficient == 0.0 || (dy == 0 && nx <= x) {
                            continue;
                        }

                        let weight = coefficient / divisor;
                        let target = &mut working[ny * width + nx];
                        for (target, error) in target[..3].iter_mut().zip(error) {
                            *target += error * weight;
                        }
                    }
                }
            }
        }

        for (offset, y) in region.rows.clone().enumerate() {
            let row = &mut frame.row_mut(y)[region.columns.clone()];
            for (pixel, &vector) in row.iter_mut().zip(&working[offset * width..][..width]) {
                pixel.pack_from_vector4(vector);
            }
        }

        Ok(())
    }
}

impl<P: Pixel> Operations<'_, P> {
    /// Reduce to black and white at `threshold`.
    pub fn binary_threshold(&mut self, threshold: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&BinaryThreshold::new(threshold))
    }

    /// Dither to black and white with a tiled pattern.
    pub fn dither(&mut self, matrix: OrderedDitherMatrix) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&OrderedDither::new(matrix))
    }

    /// Dither to black and white by error diffusion.
    pub fn diffuse(&mut self, diffuser: ErrorDiffuser, threshold: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&ErrorDiffusion::new(diffuser, threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(processor: &dyn ImageProcessor<Rgba32>, frame: &mut Frame<Rgba32>) {
        let rect = frame.bounds();
        crate::processing::apply_to_frame(processor, frame, rect, &Configuration::new()).unwrap();
    }

    fn gradient(width: usize, height: usize) -> Frame<Rgba32> {
        let mut frame = Frame::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y * width) * 255 / (width * height - 1)) as u8;
                frame[(x, y)] = Rgba32::rgb(v, v, v);
            }
        }
        frame
    }

    #[test]
    fn bayer_thresholds() {
        assert_eq!(OrderedDitherMatrix::Bayer2x2.thresholds(), [63, 191, 255, 127]);

        let bayer4 = OrderedDitherMatrix::Bayer4x4.thresholds();
        assert_eq!(bayer4.len(), 16);
        // Every index appears exactly once.
        let mut sorted = bayer4.clone();
        sorted.sort_unstable();
        let expected: Vec<u8> = (1..=16).map(|i| (i * 16 - 1) as u8).collect();
        assert_eq!(sorted, expected);

        assert_eq!(OrderedDitherMatrix::Bayer8x8.thresholds().len(), 64);
    }

    #[test]
    fn threshold_splits_by_luma() {
        let mut frame = gradient(4, 1);
        run(&BinaryThreshold::new(0.5), &mut frame);
        let row: Vec<_> = frame.row(0).to_vec();
        assert_eq!(row, [Rgba32::BLACK, Rgba32::BLACK, Rgba32::WHITE, Rgba32::WHITE]);
    }

    #[test]
    fn threshold_is_validated() {
        let mut frame = gradient(2, 2);
        let rect = frame.bounds();
        let err = crate::processing::apply_to_frame(&BinaryThreshold::new(1.5), &mut frame, rect, &Configuration::new())
            .unwrap_err();
        assert_eq!(err.stage(), crate::error::Stage::BeforeApply);
    }

    #[test]
    fn ordered_dither_produces_two_colors() {
        let mut frame = gradient(8, 8);
        run(&OrderedDither::new(OrderedDitherMatrix::Bayer4x4), &mut frame);
        assert!(frame
            .pixels()
            .as_slice()
            .iter()
            .all(|&p| p == Rgba32::BLACK || p == Rgba32::WHITE));
        assert_eq!(frame[(0, 0)], Rgba32::BLACK);
        assert_eq!(frame[(7, 7)], Rgba32::WHITE);
    }

    #[test]
    fn diffusion_preserves_average_intensity() {
        let mut frame = Frame::filled(16, 16, Rgba32::rgb(128, 128, 128)).unwrap();
        run(&ErrorDiffusion::new(ErrorDiffuser::FloydSteinberg, 0.5), &mut frame);

        let white = frame.pixels().as_slice().iter().filter(|&&p| p == Rgba32::WHITE).count();
        let black = frame.pixels().as_slice().iter().filter(|&&p| p == Rgba32::BLACK).count();
        assert_eq!(white + black, 256);
        assert!((100..=156).contains(&white), "{} white pixels", white);
    }

    #[test]
    fn diffusion_stays_inside_the_region() {
        let mut frame = Frame::filled(6, 6, Rgba32::rgb(100, 100, 100)).unwrap();
        let rect = Rectangle::new(1, 1, 3, 3);
        let diffusion = ErrorDiffusion::new(ErrorDiffuser::Stucki, 0.5);
        crate::processing::apply_to_frame(&diffusion, &mut frame, rect, &Configuration::new()).unwrap();

        assert_eq!(frame[(0, 0)], Rgba32::rgb(100, 100, 100));
        assert_eq!(frame[(4, 4)], Rgba32::rgb(100, 100, 100));
        assert!(frame[(2, 2)] == Rgba32::BLACK || frame[(2, 2)] == Rgba32::WHITE);
    }

    #[test]
    fn every_diffuser_is_anchored() {
        for diffuser in [
            ErrorDiffuser::Atkinson,
            ErrorDiffuser::Burks,
            ErrorDiffuser::FloydSteinberg,
            ErrorDiffuser::JarvisJudiceNinke,
            ErrorDiffuser::Sierra2,
            ErrorDiffuser::Sierra3,
            ErrorDiffuser::SierraLite,
            ErrorDiffuser::Stucki,
        ] {
            let (matrix, divisor) = diffuser.matrix();
            let sum: f32 = matrix.iter().flat_map(|row| row.iter()).sum();
            assert!(sum <= divisor, "{:?}", diffuser);
            assert!(matrix[0].iter().any(|&c| c != 0.0));
        }
    }
}
