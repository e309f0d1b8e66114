//! Radial overlays blended over the frame.
use pixelflow_texel::{Pixel, Rgba32, Vector4};

use crate::config::Configuration;
use crate::error::{BoxError, ProcessingError};
use crate::frame::Frame;
use crate::geometry::Rectangle;
use crate::math;
use crate::processing::{map_vectors, ImageProcessor, Operations};

/// Darkens towards the corners of the target rectangle.
///
/// The overlay is transparent at the center and reaches `blend * 0.9` of the color's opacity at
/// the ellipse with radii `radius_x` and `radius_y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vignette {
    pub color: Rgba32,
    /// Zero or negative selects half of the rectangle width.
    pub radius_x: f32,
    /// Zero or negative selects half of the rectangle height.
    pub radius_y: f32,
    pub blend: f32,
}

/// Brightens towards the center of the target rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glow {
    pub color: Rgba32,
    /// Zero or negative selects half of the rectangle width.
    pub radius: f32,
    pub blend: f32,
}

/// Composite `source` over `backdrop`, both straight alpha.
pub(crate) fn source_over(backdrop: Vector4, source: Vector4) -> Vector4 {
    let [sr, sg, sb, sa] = source;
    let [dr, dg, db, da] = backdrop;

    let alpha = sa + da * (1.0 - sa);
    if alpha <= 0.0 {
        return [0.0; 4];
    }

    let under = da * (1.0 - sa);
    [
        (sr * sa + dr * under) / alpha,
        (sg * sa + dg * under) / alpha,
        (sb * sa + db * under) / alpha,
        alpha,
    ]
}

fn radius_or_half(radius: f32, extent: i32) -> f32 {
    let half = extent as f32 * 0.5;
    if radius > 0.0 {
        radius.min(half)
    } else {
        half
    }
}

impl Vignette {
    pub fn new(color: Rgba32) -> Self {
        Vignette {
            color,
            radius_x: 0.0,
            radius_y: 0.0,
            blend: 1.0,
        }
    }

    pub fn with_radii(self, radius_x: f32, radius_y: f32) -> Self {
        Vignette {
            radius_x,
            radius_y,
            ..self
        }
    }

    pub fn with_blend(self, blend: f32) -> Self {
        Vignette { blend, ..self }
    }
}

impl Default for Vignette {
    fn default() -> Self {
        Vignette::new(Rgba32::BLACK)
    }
}

impl<P: Pixel> ImageProcessor<P> for Vignette {
    fn name(&self) -> &str {
        "vignette"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let center = rect.center();
        let center = (center.x as f32, center.y as f32);
        let radius_x = radius_or_half(self.radius_x, rect.width);
        let radius_y = radius_or_half(self.radius_y, rect.height);
        let max_distance = math::sqrtf(radius_x * radius_x + radius_y * radius_y);
        if max_distance <= 0.0 {
            return Ok(());
        }

        let color = self.color.to_vector4();
        map_vectors(frame, rect, config, |x, y, backdrop| {
            let distance = math::distance(center, (x as f32, y as f32));
            let amount = (self.blend * 0.9 * distance / max_distance).clamp(0.0, 1.0);
            let [r, g, b, a] = color;
            source_over(backdrop, [r, g, b, a * amount])
        });

        Ok(())
    }
}

impl Glow {
    pub fn new(color: Rgba32) -> Self {
        Glow {
            color,
            radius: 0.0,
            blend: 1.0,
        }
    }

    pub fn with_radius(self, radius: f32) -> Self {
        Glow { radius, ..self }
    }

    pub fn with_blend(self, blend: f32) -> Self {
        Glow { blend, ..self }
    }
}

impl Default for Glow {
    fn default() -> Self {
        Glow::new(Rgba32::WHITE)
    }
}

impl<P: Pixel> ImageProcessor<P> for Glow {
    fn name(&self) -> &str {
        "glow"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let center = rect.center();
        let center = (center.x as f32, center.y as f32);
        let radius = radius_or_half(self.radius, rect.width);
        if radius <= 0.0 {
            return Ok(());
        }

        let color = self.color.to_vector4();
        map_vectors(frame, rect, config, |x, y, backdrop| {
            let distance = math::distance(center, (x as f32, y as f32));
            let amount = (self.blend * (1.0 - 0.95 * distance / radius)).clamp(0.0, 1.0);
            let [r, g, b, a] = color;
            source_over(backdrop, [r, g, b, a * amount])
        });

        Ok(())
    }
}

impl<P: Pixel> Operations<'_, P> {
    pub fn vignette(&mut self, color: Rgba32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Vignette::new(color))
    }

    pub fn glow(&mut self, color: Rgba32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Glow::new(color))
    }
}

#[test]
fn opaque_source_replaces() {
    let out = source_over([0.2, 0.4, 0.6, 1.0], [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(out, [1.0, 0.0, 0.0, 1.0]);

    let out = source_over([0.2, 0.4, 0.6, 1.0], [1.0, 0.0, 0.0, 0.0]);
    assert_eq!(out, [0.2, 0.4, 0.6, 1.0]);

    assert_eq!(source_over([0.5; 4], [0.0; 4]), [0.5; 4]);
    assert_eq!(source_over([0.0; 4], [0.0; 4]), [0.0; 4]);
}

#[test]
fn vignette_keeps_the_center() {
    let mut frame = Frame::filled(9, 9, Rgba32::WHITE).unwrap();
    let rect = frame.bounds();
    ImageProcessor::on_apply(&Vignette::default(), &mut frame, rect, &Configuration::new()).unwrap();

    assert_eq!(frame[(4, 4)], Rgba32::WHITE);
    // Corners are darkened but keep full opacity.
    let corner = frame[(0, 0)];
    assert!(corner.r < 0xff);
    assert_eq!(corner.a, 0xff);
}

#[test]
fn glow_fades_outwards() {
    let mut frame = Frame::filled(9, 9, Rgba32::BLACK).unwrap();
    let rect = frame.bounds();
    ImageProcessor::on_apply(&Glow::default(), &mut frame, rect, &Configuration::new()).unwrap();

    assert_eq!(frame[(4, 4)], Rgba32::WHITE);
    assert!(frame[(2, 4)].r < 0xff);
    assert!(frame[(2, 4)].r > frame[(0, 0)].r);
}
