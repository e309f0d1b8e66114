//! Simple per-pixel and per-block effects.
use pixelflow_texel::{Pixel, Rgba32};

use crate::config::Configuration;
use crate::error::{BoxError, ProcessingError};
use crate::frame::Frame;
use crate::geometry::{Rectangle, Region};
use crate::processing::overlays::source_over;
use crate::processing::{for_each_row, map_vectors, ImageProcessor, Operations};

/// Multiplies the opacity by a factor in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alpha(pub f32);

/// Places the frame over an opaque color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackgroundColor(pub Rgba32);

/// Adds `amount` percent, clamped to `-100..=100`, to each color channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brightness(pub f32);

/// Inverts the color channels, alpha is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invert;

/// Replaces square blocks of pixels by the color at their center.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pixelate {
    pub size: usize,
}

impl<P: Pixel> ImageProcessor<P> for Alpha {
    fn name(&self) -> &str {
        "alpha"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let factor = self.0.clamp(0.0, 1.0);
        map_vectors(frame, rect, config, |_, _, [r, g, b, a]| [r, g, b, a * factor]);
        Ok(())
    }
}

impl<P: Pixel> ImageProcessor<P> for BackgroundColor {
    fn name(&self) -> &str {
        "background color"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let background = self.0.to_vector4();
        map_vectors(frame, rect, config, |_, _, pixel| source_over(background, pixel));
        Ok(())
    }
}

impl<P: Pixel> ImageProcessor<P> for Brightness {
    fn name(&self) -> &str {
        "brightness"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let offset = self.0.clamp(-100.0, 100.0) / 100.0;
        map_vectors(frame, rect, config, |_, _, [r, g, b, a]| {
            [r + offset, g + offset, b + offset, a]
        });
        Ok(())
    }
}

impl<P: Pixel> ImageProcessor<P> for Invert {
    fn name(&self) -> &str {
        "invert"
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        map_vectors(frame, rect, config, |_, _, [r, g, b, a]| [1.0 - r, 1.0 - g, 1.0 - b, a]);
        Ok(())
    }
}

impl Pixelate {
    pub const DEFAULT_SIZE: usize = 4;
}

impl Default for Pixelate {
    fn default() -> Self {
        Pixelate {
            size: Pixelate::DEFAULT_SIZE,
        }
    }
}

impl<P: Pixel> ImageProcessor<P> for Pixelate {
    fn name(&self) -> &str {
        "pixelate"
    }

    fn before_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        if self.size == 0 {
            return Err("pixelate block size must be positive".into());
        }
        Ok(())
    }

    fn on_apply(&self, frame: &mut Frame<P>, rect: Rectangle, config: &Configuration) -> Result<(), BoxError> {
        let region = Region::clip(rect, frame.width(), frame.height());
        if region.is_empty() || self.size <= 1 {
            return Ok(());
        }

        // Blocks are anchored at the clipped origin, the sample is clamped into the region.
        let source = frame.pixels().clone();
        let size = self.size;
        let Region { columns, rows } = region;
        for_each_row(frame, rect, config, |x_start, y, span| {
            let block_y = rows.start + (y - rows.start) / size * size;
            let sample_y = (block_y + size / 2).min(rows.end - 1);
            for (offset, pixel) in span.iter_mut().enumerate() {
                let x = x_start + offset;
                let block_x = columns.start + (x - columns.start) / size * size;
                let sample_x = (block_x + size / 2).min(columns.end - 1);
                *pixel = source[(sample_x, sample_y)];
            }
        });

        Ok(())
    }
}

impl<P: Pixel> Operations<'_, P> {
    /// Multiply the opacity by `amount`.
    pub fn alpha(&mut self, amount: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Alpha(amount))
    }

    pub fn background_color(&mut self, color: Rgba32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&BackgroundColor(color))
    }

    pub fn brightness(&mut self, amount: f32) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Brightness(amount))
    }

    pub fn invert(&mut self) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Invert)
    }

    /// Pixelate with blocks of `size` by `size` pixels.
    pub fn pixelate(&mut self, size: usize) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&Pixelate { size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(processor: &dyn ImageProcessor<Rgba32>, frame: &mut Frame<Rgba32>) {
        let rect = frame.bounds();
        crate::processing::apply_to_frame(processor, frame, rect, &Configuration::new()).unwrap();
    }

    #[test]
    fn invert_is_an_involution() {
        let mut frame = Frame::filled(3, 2, Rgba32::new(10, 20, 30, 40)).unwrap();
        run(&Invert, &mut frame);
        assert_eq!(frame[(1, 1)], Rgba32::new(245, 235, 225, 40));
        run(&Invert, &mut frame);
        assert_eq!(frame[(1, 1)], Rgba32::new(10, 20, 30, 40));
    }

    #[test]
    fn brightness_saturates() {
        let mut frame = Frame::filled(2, 2, Rgba32::new(200, 100, 0, 255)).unwrap();
        run(&Brightness(500.0), &mut frame);
        assert_eq!(frame[(0, 0)], Rgba32::WHITE);
    }

    #[test]
    fn alpha_scales_opacity() {
        let mut frame = Frame::filled(1, 1, Rgba32::new(1, 2, 3, 200)).unwrap();
        run(&Alpha(0.5), &mut frame);
        assert_eq!(frame[(0, 0)], Rgba32::new(1, 2, 3, 100));
    }

    #[test]
    fn background_fills_transparency() {
        let mut frame = Frame::filled(1, 1, Rgba32::TRANSPARENT).unwrap();
        run(&BackgroundColor(Rgba32::rgb(0, 0, 255)), &mut frame);
        assert_eq!(frame[(0, 0)], Rgba32::rgb(0, 0, 255));
    }

    #[test]
    fn pixelate_blocks() {
        let mut frame: Frame<Rgba32> = Frame::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                frame[(x, y)] = Rgba32::rgb(x as u8, y as u8, 0);
            }
        }

        run(&Pixelate { size: 2 }, &mut frame);
        assert_eq!(frame[(0, 0)], Rgba32::rgb(1, 1, 0));
        assert_eq!(frame[(1, 0)], Rgba32::rgb(1, 1, 0));
        assert_eq!(frame[(2, 3)], Rgba32::rgb(3, 3, 0));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let mut frame: Frame<Rgba32> = Frame::new(2, 2);
        let rect = frame.bounds();
        let err = crate::processing::apply_to_frame(&Pixelate { size: 0 }, &mut frame, rect, &Configuration::new())
            .unwrap_err();
        assert_eq!(err.stage(), crate::error::Stage::BeforeApply);
    }
}
