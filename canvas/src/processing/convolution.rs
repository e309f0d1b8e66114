//! Convolution filters, Gaussian kernels and edge detection.
//!
//! Every filter reads from a snapshot of the frame taken before it writes, so the result does
//! not depend on the order in which rows are processed. Samples outside the frame are clamped to
//! the nearest border pixel.
use pixelflow_texel::{Pixel, PixelBuffer, RgbaVector, Vector4};
use rayon::prelude::*;

use crate::config::Configuration;
use crate::error::{BoxError, ProcessingError};
use crate::frame::Frame;
use crate::geometry::{Rectangle, Region};
use crate::math;
use crate::processing::{map_vectors, ColorMatrixProcessor, GrayscaleMode, ImageProcessor, Operations};

/// A rectangular matrix of weights, stored row by row.
///
/// The element at `(width / 2, height / 2)` lies over the destination pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

/// Convolves the color channels with one kernel. Alpha is kept.
#[derive(Clone, Debug, PartialEq)]
pub struct Convolution(pub Kernel);

/// Convolves the color channels with two kernels and takes the magnitude of the two responses.
/// Alpha is kept.
#[derive(Clone, Debug, PartialEq)]
pub struct Convolution2D {
    pub x: Kernel,
    pub y: Kernel,
}

/// A separable convolution of all four channels, a horizontal pass followed by a vertical one.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvolutionTwoPass {
    /// A kernel of height one.
    pub horizontal: Kernel,
    /// A kernel of width one.
    pub vertical: Kernel,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianBlur {
    pub sigma: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianSharpen {
    pub sigma: f32,
}

/// The edge detection operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeDetection {
    Laplacian3x3,
    Laplacian5x5,
    LaplacianOfGaussian,
    Kayyali,
    Kirsch,
    Prewitt,
    RobertsCross,
    Robinson,
    Scharr,
    Sobel,
}

/// Highlights edges with one of the [`EdgeDetection`] operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeDetector {
    pub kind: EdgeDetection,
    /// Convert to BT.709 grayscale before detecting.
    pub grayscale: bool,
}

enum EdgeOperator {
    Single(Kernel),
    Pair(Kernel, Kernel),
}

impl Kernel {
    /// Create a kernel from its rows.
    ///
    /// # Panics
    ///
    /// When either dimension is zero.
    pub fn from_rows<const W: usize, const H: usize>(rows: [[f32; W]; H]) -> Self {
        assert!(W > 0 && H > 0, "Kernel dimensions must be positive");
        Kernel {
            width: W,
            height: H,
            values: rows.iter().flatten().copied().collect(),
        }
    }

    /// A kernel of height one.
    pub fn row(values: Vec<f32>) -> Option<Self> {
        (!values.is_empty()).then(|| Kernel {
            width: values.len(),
            height: 1,
            values,
        })
    }

    /// A kernel of width one.
    pub fn column(values: Vec<f32>) -> Option<Self> {
        (!values.is_empty()).then(|| Kernel {
            width: 1,
            height: values.len(),
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Transpose a row kernel into a column kernel and vice versa.
    pub fn transposed(&self) -> Self {
        let mut values = Vec::with_capacity(self.values.len());
        for x in 0..self.width {
            for y in 0..self.height {
                values.push(self.get(x, y));
            }
        }

        Kernel {
            width: self.height,
            height: self.width,
            values,
        }
    }

    /// Weighted sum of the samples around `(x, y)`, all four channels.
    fn convolve(&self, source: &PixelBuffer<RgbaVector>, x: usize, y: usize) -> Vector4 {
        let (radius_x, radius_y) = (self.width / 2, self.height / 2);
        let (width, height) = (source.width(), source.height());
        let mut sum = [0.0f32; 4];

        for ky in 0..self.height {
            let sy = (y + ky).saturating_sub(radius_y).min(height - 1);
            for kx in 0..self.width {
                let weight = self.get(kx, ky);
                if weight == 0.0 {
                    continue;
                }

                let sx = (x + kx).saturating_sub(radius_x).min(width - 1);
                let sample = source[(sx, sy)].to_array();
                for (s, v) in sum.iter_mut().zip(sample) {
                    *s += weight * v;
                }
            }
        }

        sum
    }
}

fn snapshot<P: Pixel>(frame: &Frame<P>) -> PixelBuffer<RgbaVector> {
    frame.pixels().to_vectors()
}

impl<P: Pixel> ImageProcessor<P> for Convolution {
    fn name(&self) -> &str {
        "convolution"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let source = snapshot(frame);
        map_vectors(frame, rect, config, |x, y, original| {
            let mut out = self.0.convolve(&source, x, y);
            out[3] = original[3];
            out
        });
        Ok(())
    }
}

impl<P: Pixel> ImageProcessor<P> for Convolution2D {
    fn name(&self) -> &str {
        "convolution 2d"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let source = snapshot(frame);
        map_vectors(frame, rect, config, |x, y, original| {
            let gx = self.x.convolve(&source, x, y);
            let gy = self.y.convolve(&source, x, y);
            let mut out = original;
            for ((out, x), y) in out[..3].iter_mut().zip(gx).zip(gy) {
                *out = math::sqrtf(x * x + y * y);
            }
            out
        });
        Ok(())
    }
}

impl<P: Pixel> ImageProcessor<P> for ConvolutionTwoPass {
    fn name(&self) -> &str {
        "convolution two pass"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let Region { columns, .. } = Region::clip(rect, frame.width(), frame.height());
        if columns.is_empty() {
            return Ok(());
        }

        // The vertical pass reads rows above and below the region, so the horizontal pass covers
        // every row of the selected columns.
        let source = snapshot(frame);
        let mut first = source.clone();
        let horizontal = &self.horizontal;
        let width = source.width();
        config.install(|| {
            first
                .as_mut_slice()
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for x in columns.clone() {
                        row[x] = RgbaVector::from_array(horizontal.convolve(&source, x, y));
                    }
                });
        });

        map_vectors(frame, rect, config, |x, y, _| self.vertical.convolve(&first, x, y));
        Ok(())
    }
}

impl GaussianBlur {
    pub const DEFAULT_SIGMA: f32 = 3.0;

    /// The normalized one-dimensional kernel, `2 * ceil(sigma) + 1` weights.
    pub fn kernel(&self) -> Option<Kernel> {
        let weights = gaussian_weights(self.sigma)?;
        let sum: f32 = weights.iter().sum();
        Kernel::row(weights.into_iter().map(|w| w / sum).collect())
    }
}

impl Default for GaussianBlur {
    fn default() -> Self {
        GaussianBlur {
            sigma: GaussianBlur::DEFAULT_SIGMA,
        }
    }
}

impl GaussianSharpen {
    pub const DEFAULT_SIGMA: f32 = 3.0;

    /// The one-dimensional kernel: the negated Gaussian with a boosted center, summing to one.
    pub fn kernel(&self) -> Option<Kernel> {
        let mut weights = gaussian_weights(self.sigma)?;
        let sum: f32 = weights.iter().sum();
        let mid = weights.len() / 2;

        for (i, weight) in weights.iter_mut().enumerate() {
            *weight = (if i == mid { 2.0 * sum - *weight } else { -*weight }) / sum;
        }

        Kernel::row(weights)
    }
}

impl Default for GaussianSharpen {
    fn default() -> Self {
        GaussianSharpen {
            sigma: GaussianSharpen::DEFAULT_SIGMA,
        }
    }
}

/// Unnormalized Gaussian samples at integer offsets from the middle.
fn gaussian_weights(sigma: f32) -> Option<Vec<f32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return None;
    }

    let size = (sigma.ceil() as usize) * 2 + 1;
    let mid = (size / 2) as f32;
    let scale = 1.0 / (math::sqrtf(2.0 * core::f32::consts::PI) * sigma);

    Some(
        (0..size)
            .map(|i| {
                let x = i as f32 - mid;
                scale * math::expf(-(x * x) / (2.0 * sigma * sigma))
            })
            .collect(),
    )
}

fn two_pass(kernel: Option<Kernel>, sigma: f32) -> Result<ConvolutionTwoPass, BoxError> {
    let horizontal = kernel.ok_or_else(|| format!("invalid Gaussian sigma {}", sigma))?;
    Ok(ConvolutionTwoPass {
        vertical: horizontal.transposed(),
        horizontal,
    })
}

impl<P: Pixel> ImageProcessor<P> for GaussianBlur {
    fn name(&self) -> &str {
        "gaussian blur"
    }

    fn before_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        two_pass(self.kernel(), self.sigma).map(drop)
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        ImageProcessor::<P>::on_apply(&two_pass(self.kernel(), self.sigma)?, frame, rect, config)
    }
}

impl<P: Pixel> ImageProcessor<P> for GaussianSharpen {
    fn name(&self) -> &str {
        "gaussian sharpen"
    }

    fn before_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        two_pass(self.kernel(), self.sigma).map(drop)
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        ImageProcessor::<P>::on_apply(&two_pass(self.kernel(), self.sigma)?, frame, rect, config)
    }
}

#[rustfmt::skip]
impl EdgeDetection {
    fn operator(self) -> EdgeOperator {
        use EdgeOperator::{Pair, Single};

        match self {
            EdgeDetection::Laplacian3x3 => Single(Kernel::from_rows([
                [-1.0, -1.0, -1.0],
                [-1.0,  8.0, -1.0],
                [-1.0, -1.0, -1.0],
            ])),
            EdgeDetection::Laplacian5x5 => Single(Kernel::from_rows([
                [-1.0, -1.0, -1.0, -1.0, -1.0],
                [-1.0, -1.0, -1.0, -1.0, -1.0],
                [-1.0, -1.0, 24.0, -1.0, -1.0],
                [-1.0, -1.0, -1.0, -1.0, -1.0],
                [-1.0, -1.0, -1.0, -1.0, -1.0],
            ])),
            EdgeDetection::LaplacianOfGaussian => Single(Kernel::from_rows([
                [ 0.0,  0.0, -1.0,  0.0,  0.0],
                [ 0.0, -1.0, -2.0, -1.0,  0.0],
                [-1.0, -2.0, 16.0, -2.0, -1.0],
                [ 0.0, -1.0, -2.0, -1.0,  0.0],
                [ 0.0,  0.0, -1.0,  0.0,  0.0],
            ])),
            EdgeDetection::Kayyali => Pair(
                Kernel::from_rows([[6.0, 0.0, -6.0], [0.0, 0.0, 0.0], [-6.0, 0.0, 6.0]]),
                Kernel::from_rows([[-6.0, 0.0, 6.0], [0.0, 0.0, 0.0], [6.0, 0.0, -6.0]]),
            ),
            EdgeDetection::Kirsch => Pair(
                Kernel::from_rows([[5.0, 5.0, 5.0], [-3.0, 0.0, -3.0], [-3.0, -3.0, -3.0]]),
                Kernel::from_rows([[5.0, -3.0, -3.0], [5.0, 0.0, -3.0], [5.0, -3.0, -3.0]]),
            ),
            EdgeDetection::Prewitt => Pair(
                Kernel::from_rows([[-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0]]),
                Kernel::from_rows([[1.0, 1.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -1.0, -1.0]]),
            ),
            EdgeDetection::RobertsCross => Pair(
                Kernel::from_rows([[1.0, 0.0], [0.0, -1.0]]),
                Kernel::from_rows([[0.0, 1.0], [-1.0, 0.0]]),
            ),
            EdgeDetection::Robinson => Pair(
                Kernel::from_rows([[1.0, 2.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -2.0, -1.0]]),
                Kernel::from_rows([[1.0, 0.0, -1.0], [2.0, 0.0, -2.0], [1.0, 0.0, -1.0]]),
            ),
            EdgeDetection::Scharr => Pair(
                Kernel::from_rows([[-3.0, 0.0, 3.0], [-10.0, 0.0, 10.0], [-3.0, 0.0, 3.0]]),
                Kernel::from_rows([[3.0, 10.0, 3.0], [0.0, 0.0, 0.0], [-3.0, -10.0, -3.0]]),
            ),
            EdgeDetection::Sobel => Pair(
                Kernel::from_rows([[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]]),
                Kernel::from_rows([[1.0, 2.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -2.0, -1.0]]),
            ),
        }
    }
}

impl EdgeDetector {
    pub fn new(kind: EdgeDetection) -> Self {
        EdgeDetector {
            kind,
            grayscale: true,
        }
    }
}

impl<P: Pixel> ImageProcessor<P> for EdgeDetector {
    fn name(&self) -> &str {
        "edge detection"
    }

    fn before_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        if self.grayscale {
            let gray = ColorMatrixProcessor::grayscale(GrayscaleMode::Bt709);
            ImageProcessor::<P>::on_apply(&gray, frame, rect, config)?;
        }
        Ok(())
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        match self.kind.operator() {
            EdgeOperator::Single(kernel) => {
                ImageProcessor::<P>::on_apply(&Convolution(kernel), frame, rect, config)
            }
            EdgeOperator::Pair(x, y) => {
                ImageProcessor::<P>::on_apply(&Convolution2D { x, y }, frame, rect, config)
            }
        }
    }
}

impl<P: Pixel> Operations<'_, P> {
    pub fn convolve(&mut self, kernel: Kernel) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Convolution(kernel))
    }

    pub fn gaussian_blur(&mut self, sigma: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&GaussianBlur { sigma })
    }

    pub fn gaussian_sharpen(&mut self, sigma: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&GaussianSharpen { sigma })
    }

    /// Detect edges, converting to grayscale first.
    pub fn detect_edges(&mut self, kind: EdgeDetection) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&EdgeDetector::new(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelflow_texel::Rgba32;

    fn run(processor: &dyn ImageProcessor<Rgba32>, frame: &mut Frame<Rgba32>) {
        let rect = frame.bounds();
        crate::processing::apply_to_frame(processor, frame, rect, &Configuration::new()).unwrap();
    }

    #[test]
    fn gaussian_kernels_sum_to_one() {
        for sigma in [0.5, 1.0, 3.0, 4.2] {
            let blur = GaussianBlur { sigma }.kernel().unwrap();
            let sharpen = GaussianSharpen { sigma }.kernel().unwrap();
            assert_eq!(blur.width(), (sigma.ceil() as usize) * 2 + 1);
            assert!((blur.values().iter().sum::<f32>() - 1.0).abs() < 1e-5);
            assert!((sharpen.values().iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }

        assert!(GaussianBlur { sigma: 0.0 }.kernel().is_none());
        assert!(GaussianBlur { sigma: f32::NAN }.kernel().is_none());
    }

    #[test]
    fn magnitude_keeps_alpha() {
        let mut frame = Frame::filled(4, 1, Rgba32::new(0, 0, 0, 100)).unwrap();
        frame[(2, 0)] = Rgba32::new(255, 255, 255, 100);
        frame[(3, 0)] = Rgba32::new(255, 255, 255, 100);

        let sobel = Convolution2D {
            x: Kernel::from_rows([[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]]),
            y: Kernel::from_rows([[1.0, 2.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -2.0, -1.0]]),
        };
        run(&sobel, &mut frame);
        assert_eq!(frame[(0, 0)], Rgba32::new(0, 0, 0, 100));
        assert_eq!(frame[(1, 0)], Rgba32::new(255, 255, 255, 100));
    }

    #[test]
    fn blur_keeps_uniform_frames() {
        let color = Rgba32::new(40, 80, 120, 200);
        let mut frame = Frame::filled(7, 5, color).unwrap();
        run(&GaussianBlur::default(), &mut frame);
        assert!(frame.pixels().as_slice().iter().all(|&p| p == color));

        run(&GaussianSharpen::default(), &mut frame);
        assert!(frame.pixels().as_slice().iter().all(|&p| p == color));
    }

    #[test]
    fn invalid_sigma_fails_before_apply() {
        let mut frame: Frame<Rgba32> = Frame::new(2, 2);
        let rect = frame.bounds();
        let err = crate::processing::apply_to_frame(&GaussianBlur { sigma: -1.0 }, &mut frame, rect, &Configuration::new())
            .unwrap_err();
        assert_eq!(err.stage(), crate::error::Stage::BeforeApply);
    }

    #[test]
    fn flat_frames_have_no_edges() {
        for kind in [
            EdgeDetection::Laplacian3x3,
            EdgeDetection::LaplacianOfGaussian,
            EdgeDetection::Sobel,
            EdgeDetection::RobertsCross,
        ] {
            let mut frame = Frame::filled(5, 5, Rgba32::rgb(90, 90, 90)).unwrap();
            run(&EdgeDetector::new(kind), &mut frame);
            assert_eq!(frame[(2, 2)], Rgba32::BLACK, "{:?}", kind);
        }
    }

    #[test]
    fn sobel_finds_a_vertical_edge() {
        let mut frame = Frame::filled(6, 3, Rgba32::BLACK).unwrap();
        for y in 0..3 {
            for x in 3..6 {
                frame[(x, y)] = Rgba32::WHITE;
            }
        }

        run(&EdgeDetector::new(EdgeDetection::Sobel), &mut frame);
        assert_eq!(frame[(0, 1)], Rgba32::BLACK);
        assert_eq!(frame[(2, 1)], Rgba32::WHITE);
        assert_eq!(frame[(3, 1)], Rgba32::WHITE);
        assert_eq!(frame[(5, 1)], Rgba32::BLACK);
    }

    #[test]
    fn transposing_a_row() {
        let row = Kernel::row(vec![1.0, 2.0, 3.0]).unwrap();
        let column = row.transposed();
        assert_eq!((column.width(), column.height()), (1, 3));
        assert_eq!(column.get(0, 2), 3.0);
        assert!(Kernel::row(Vec::new()).is_none());
    }
}
