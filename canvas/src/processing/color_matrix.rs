//! Affine color transforms.
use pixelflow_texel::{Pixel, Rgba32, Vector4};

use crate::config::Configuration;
use crate::error::{BoxError, ProcessingError};
use crate::frame::Frame;
use crate::geometry::Rectangle;
use crate::math;
use crate::processing::{map_vectors, Glow, ImageProcessor, Operations, Vignette};

/// A 4×4 matrix transforming `[r, g, b, a]` as a row vector.
///
/// Component `j` of the result is `Σ_i v[i] * m[i][j]`. The last row is the translation, scaled
/// by alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorMatrix(pub [[f32; 4]; 4]);

/// Applies a [`ColorMatrix`] to every pixel.
///
/// With `compand` the color channels are expanded from sRGB to linear light before the transform
/// and compressed again afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorMatrixProcessor {
    pub matrix: ColorMatrix,
    pub compand: bool,
}

/// The luma coefficients used by [`ColorMatrix::grayscale`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GrayscaleMode {
    /// ITU-R Recommendation BT.709.
    #[default]
    Bt709,
    /// ITU-R Recommendation BT.601.
    Bt601,
}

/// Simulated color vision deficiencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorBlindness {
    /// Partial color desensitivity.
    Achromatomaly,
    /// Complete color desensitivity, monochrome.
    Achromatopsia,
    /// Green weak.
    Deuteranomaly,
    /// Green blind.
    Deuteranopia,
    /// Red weak.
    Protanomaly,
    /// Red blind.
    Protanopia,
    /// Blue weak.
    Tritanomaly,
    /// Blue blind.
    Tritanopia,
}

/// An old Polaroid print: a color shift, then an orange vignette and glow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Polaroid {
    /// Opacity of the vignette and the glow.
    pub blend: f32,
}

/// A Lomograph print: a color shift, then a dark green vignette.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lomograph {
    /// Opacity of the vignette.
    pub blend: f32,
}

#[rustfmt::skip]
impl ColorMatrix {
    pub const IDENTITY: Self = ColorMatrix([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    /// Every color channel becomes the luma of the pixel.
    pub const fn grayscale(mode: GrayscaleMode) -> Self {
        let [r, g, b] = match mode {
            GrayscaleMode::Bt709 => [0.2126, 0.7152, 0.0722],
            GrayscaleMode::Bt601 => [0.299, 0.587, 0.114],
        };

        ColorMatrix([
            [r,   r,   r,   0.0],
            [g,   g,   g,   0.0],
            [b,   b,   b,   0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotate the hue by `degrees`, preserving luminance.
    pub fn hue(degrees: f32) -> Self {
        let radians = degrees.rem_euclid(360.0).to_radians();
        let (sin, cos) = (libm::sinf(radians), libm::cosf(radians));

        let (lr, lg, lb) = (0.213, 0.715, 0.072);
        let (ir, ig, ib) = (0.787, 0.285, 0.928);

        ColorMatrix([
            [lr + cos * ir - sin * lr, lr - cos * lr - sin * 0.143, lr - cos * lr - sin * ir, 0.0],
            [lg - cos * lg - sin * lg, lg + cos * ig + sin * 0.140, lg - cos * lg + sin * lg, 0.0],
            [lb - cos * lb + sin * ib, lb - cos * lb - sin * 0.283, lb + cos * ib + sin * lb, 0.0],
            [0.0,                      0.0,                         0.0,                      1.0],
        ])
    }

    /// Change the saturation by `amount` percent, clamped to `-100..=100`.
    ///
    /// `-100` is grayscale, `0` the identity.
    pub fn saturation(amount: f32) -> Self {
        let factor = amount.clamp(-100.0, 100.0) / 100.0 + 1.0;
        let complement = 1.0 - factor;
        let (r, g, b) = (0.3086 * complement, 0.6094 * complement, 0.0820 * complement);

        ColorMatrix([
            [r + factor, r,          r,          0.0],
            [g,          g + factor, g,          0.0],
            [b,          b,          b + factor, 0.0],
            [0.0,        0.0,        0.0,        1.0],
        ])
    }

    pub const fn color_blindness(kind: ColorBlindness) -> Self {
        match kind {
            ColorBlindness::Achromatomaly => ColorMatrix([
                [0.618, 0.163, 0.163, 0.0],
                [0.320, 0.775, 0.320, 0.0],
                [0.062, 0.062, 0.516, 0.0],
                [0.0,   0.0,   0.0,   1.0],
            ]),
            ColorBlindness::Achromatopsia => ColorMatrix([
                [0.299, 0.299, 0.299, 0.0],
                [0.587, 0.587, 0.587, 0.0],
                [0.114, 0.114, 0.114, 0.0],
                [0.0,   0.0,   0.0,   1.0],
            ]),
            ColorBlindness::Deuteranomaly => ColorMatrix([
                [0.8, 0.0,   0.0,   0.0],
                [0.2, 0.258, 0.142, 0.0],
                [0.0, 0.742, 0.858, 0.0],
                [0.0, 0.0,   0.0,   1.0],
            ]),
            ColorBlindness::Deuteranopia => ColorMatrix([
                [0.625, 0.7, 0.0, 0.0],
                [0.375, 0.3, 0.3, 0.0],
                [0.0,   0.0, 0.7, 0.0],
                [0.0,   0.0, 0.0, 1.0],
            ]),
            ColorBlindness::Protanomaly => ColorMatrix([
                [0.817, 0.333, 0.0,   0.0],
                [0.183, 0.667, 0.125, 0.0],
                [0.0,   0.0,   0.875, 0.0],
                [0.0,   0.0,   0.0,   1.0],
            ]),
            ColorBlindness::Protanopia => ColorMatrix([
                [0.567, 0.558, 0.0,   0.0],
                [0.433, 0.442, 0.242, 0.0],
                [0.0,   0.0,   0.758, 0.0],
                [0.0,   0.0,   0.0,   1.0],
            ]),
            ColorBlindness::Tritanomaly => ColorMatrix([
                [0.967, 0.0,   0.0,   0.0],
                [0.033, 0.733, 0.183, 0.0],
                [0.0,   0.267, 0.817, 0.0],
                [0.0,   0.0,   0.0,   1.0],
            ]),
            ColorBlindness::Tritanopia => ColorMatrix([
                [0.95, 0.0,   0.0,   0.0],
                [0.05, 0.433, 0.475, 0.0],
                [0.0,  0.567, 0.525, 0.0],
                [0.0,  0.0,   0.0,   1.0],
            ]),
        }
    }

    pub const POLAROID: Self = ColorMatrix([
        [1.538,  -0.062, -0.262,  0.0],
        [-0.022,  1.578, -0.022,  0.0],
        [0.216,  -0.16,   1.5831, 0.0],
        [0.02,   -0.05,  -0.05,   1.0],
    ]);

    pub const LOMOGRAPH: Self = ColorMatrix([
        [1.5,  0.0,  0.0,   0.0],
        [0.0,  1.45, 0.0,   0.0],
        [0.0,  0.0,  1.09,  0.0],
        [-0.1, 0.0,  -0.08, 1.0],
    ]);

    pub fn transform(&self, vector: Vector4) -> Vector4 {
        let m = &self.0;
        let [x, y, z, w] = vector;
        [
            x*m[0][0] + y*m[1][0] + z*m[2][0] + w*m[3][0],
            x*m[0][1] + y*m[1][1] + z*m[2][1] + w*m[3][1],
            x*m[0][2] + y*m[1][2] + z*m[2][2] + w*m[3][2],
            x*m[0][3] + y*m[1][3] + z*m[2][3] + w*m[3][3],
        ]
    }
}

impl ColorMatrixProcessor {
    pub const fn new(matrix: ColorMatrix, compand: bool) -> Self {
        ColorMatrixProcessor { matrix, compand }
    }

    pub const fn grayscale(mode: GrayscaleMode) -> Self {
        ColorMatrixProcessor::new(ColorMatrix::grayscale(mode), false)
    }

    pub fn hue(degrees: f32) -> Self {
        ColorMatrixProcessor::new(ColorMatrix::hue(degrees), true)
    }

    pub fn saturation(amount: f32) -> Self {
        ColorMatrixProcessor::new(ColorMatrix::saturation(amount), true)
    }

    pub const fn color_blindness(kind: ColorBlindness) -> Self {
        ColorMatrixProcessor::new(ColorMatrix::color_blindness(kind), false)
    }

    /// Transform one normalized color.
    pub fn apply_vector(&self, vector: Vector4) -> Vector4 {
        if self.compand {
            math::compress(self.matrix.transform(math::expand(vector)))
        } else {
            self.matrix.transform(vector)
        }
    }
}

impl<P: Pixel> ImageProcessor<P> for ColorMatrixProcessor {
    fn name(&self) -> &str {
        "color matrix"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        map_vectors(frame, rect, config, |_, _, vector| self.apply_vector(vector));
        Ok(())
    }
}

impl Polaroid {
    const VIGNETTE: Rgba32 = Rgba32::rgb(102, 34, 0);
    const GLOW: Rgba32 = Rgba32::new(255, 153, 102, 178);
}

impl Default for Polaroid {
    fn default() -> Self {
        Polaroid { blend: 1.0 }
    }
}

impl<P: Pixel> ImageProcessor<P> for Polaroid {
    fn name(&self) -> &str {
        "polaroid"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let shift = ColorMatrixProcessor::new(ColorMatrix::POLAROID, false);
        ImageProcessor::<P>::on_apply(&shift, frame, rect, config)
    }

    fn after_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let vignette = Vignette::new(Polaroid::VIGNETTE).with_blend(self.blend);
        ImageProcessor::<P>::on_apply(&vignette, frame, rect, config)?;

        let radius = frame.width() as f32 / 4.0;
        let glow = Glow::new(Polaroid::GLOW).with_radius(radius).with_blend(self.blend);
        ImageProcessor::<P>::on_apply(&glow, frame, rect, config)
    }
}

impl Lomograph {
    const VIGNETTE: Rgba32 = Rgba32::rgb(0, 10, 0);
}

impl Default for Lomograph {
    fn default() -> Self {
        Lomograph { blend: 1.0 }
    }
}

impl<P: Pixel> ImageProcessor<P> for Lomograph {
    fn name(&self) -> &str {
        "lomograph"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let shift = ColorMatrixProcessor::new(ColorMatrix::LOMOGRAPH, false);
        ImageProcessor::<P>::on_apply(&shift, frame, rect, config)
    }

    fn after_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let vignette = Vignette::new(Lomograph::VIGNETTE).with_blend(self.blend);
        ImageProcessor::<P>::on_apply(&vignette, frame, rect, config)
    }
}

impl<P: Pixel> Operations<'_, P> {
    pub fn grayscale(&mut self, mode: GrayscaleMode) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&ColorMatrixProcessor::grayscale(mode))
    }

    /// Rotate the hue by `degrees`.
    pub fn hue(&mut self, degrees: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&ColorMatrixProcessor::hue(degrees))
    }

    /// Change the saturation by `amount` percent.
    pub fn saturation(&mut self, amount: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&ColorMatrixProcessor::saturation(amount))
    }

    pub fn color_blindness(&mut self, kind: ColorBlindness) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&ColorMatrixProcessor::color_blindness(kind))
    }

    pub fn color_matrix(&mut self, matrix: ColorMatrix, compand: bool) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&ColorMatrixProcessor::new(matrix, compand))
    }

    pub fn polaroid(&mut self) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Polaroid::default())
    }

    pub fn lomograph(&mut self) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Lomograph::default())
    }
}

#[test]
fn identity_and_gray() {
    let color = [0.2, 0.4, 0.6, 0.8];
    assert_eq!(ColorMatrix::IDENTITY.transform(color), color);

    let gray = ColorMatrix::grayscale(GrayscaleMode::Bt709).transform([1.0, 0.0, 0.0, 1.0]);
    assert_eq!(gray, [0.2126, 0.2126, 0.2126, 1.0]);

    let gray = ColorMatrix::grayscale(GrayscaleMode::Bt601).transform([0.0, 0.0, 1.0, 0.5]);
    assert_eq!(gray, [0.114, 0.114, 0.114, 0.5]);
}

#[test]
fn neutral_parameters() {
    let color = [0.25, 0.5, 0.75, 1.0];
    let close = |a: Vector4, b: Vector4| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4);

    assert!(close(ColorMatrix::hue(0.0).transform(color), color));
    assert!(close(ColorMatrix::hue(360.0).transform(color), color));
    assert!(close(ColorMatrix::saturation(0.0).transform(color), color));

    // Fully desaturated colors have equal channels.
    let [r, g, b, _] = ColorMatrix::saturation(-100.0).transform(color);
    assert!((r - g).abs() < 1e-6 && (g - b).abs() < 1e-6);
    assert_eq!(ColorMatrix::saturation(-500.0), ColorMatrix::saturation(-100.0));
}

#[test]
fn translation_row_scales_with_alpha() {
    let shifted = ColorMatrix::LOMOGRAPH.transform([0.5, 0.5, 0.5, 1.0]);
    assert!((shifted[0] - 0.65).abs() < 1e-6);
    assert!((shifted[2] - 0.465).abs() < 1e-6);
    let transparent = ColorMatrix::LOMOGRAPH.transform([0.5, 0.5, 0.5, 0.0]);
    assert!((transparent[0] - 0.75).abs() < 1e-6);
}
