//! Palette quantization.
//!
//! A quantizer reduces the colors of a frame to a palette of at most 256 entries and describes
//! every pixel by an index into it. [`QuantizeProcessor`] computes the result for all frames of
//! an image first and only then swaps the pixel buffers, so an image is never left half
//! quantized.
use pixelflow_texel::{Pixel, PixelBuffer, Rgba32};

use crate::config::Configuration;
use crate::error::{BoxError, ProcessingError};
use crate::frame::Frame;
use crate::geometry::Rectangle;
use crate::image::Image;
use crate::processing::{ImageProcessor, Operations};

/// The largest palette a quantizer produces.
pub const MAX_COLORS: usize = 256;

/// Computes a palette for a frame and maps every pixel onto it.
pub trait Quantizer<P: Pixel>: Sync {
    /// Quantize to at most `max_colors` colors, `max_colors` is clamped to `1..=256`.
    fn quantize(&self, frame: &Frame<P>, max_colors: usize) -> QuantizedFrame<P>;
}

/// A frame described by a palette and one palette index per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizedFrame<P> {
    width: usize,
    height: usize,
    palette: Vec<P>,
    indices: Vec<u8>,
}

/// The built-in quantizers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quantization {
    #[default]
    Octree,
    Palette,
    Wu,
}

/// Replaces the pixels of every frame by their palette colors.
///
/// The whole of each frame is quantized, the target rectangle does not apply.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizeProcessor<Q = Quantization> {
    pub quantizer: Q,
    pub max_colors: usize,
}

/// Gervautz–Purgathofer octree quantization.
///
/// Colors are sorted into a tree of depth eight by their bits, most significant first. Sibling
/// leaves are merged into their parent, deepest first, until few enough leaves remain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OctreeQuantizer;

/// Maps every pixel onto the nearest color of a fixed palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteQuantizer {
    colors: Vec<Rgba32>,
}

/// Xiaolin Wu's variance minimizing quantization.
///
/// Colors are counted in a histogram of 32 levels per channel. The color cube is then split
/// repeatedly along the plane that reduces the summed variance the most.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WuQuantizer;

impl<P: Pixel> QuantizedFrame<P> {
    /// # Panics
    ///
    /// When the number of indices does not match the dimensions.
    pub fn new(width: usize, height: usize, palette: Vec<P>, indices: Vec<u8>) -> Self {
        assert_eq!(
            Some(indices.len()),
            width.checked_mul(height),
            "Expected one palette index per pixel of a {}x{} frame",
            width,
            height
        );

        QuantizedFrame {
            width,
            height,
            palette,
            indices,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn palette(&self) -> &[P] {
        &self.palette
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// The color of the pixel at `(x, y)`.
    ///
    /// Indices beyond the palette select its last entry.
    pub fn color(&self, x: usize, y: usize) -> P {
        self.lookup(self.indices[y * self.width + x])
    }

    fn lookup(&self, index: u8) -> P {
        let last = self.palette.len().saturating_sub(1);
        self.palette
            .get(usize::from(index).min(last))
            .copied()
            .unwrap_or_default()
    }

    /// Expand into a pixel buffer of palette colors.
    pub fn to_pixels(&self) -> PixelBuffer<P> {
        let mut pixels = PixelBuffer::new(self.width, self.height);
        for (pixel, &index) in pixels.as_mut_slice().iter_mut().zip(&self.indices) {
            *pixel = self.lookup(index);
        }
        pixels
    }
}

impl<P: Pixel> Quantizer<P> for Quantization {
    fn quantize(&self, frame: &Frame<P>, max_colors: usize) -> QuantizedFrame<P> {
        match self {
            Quantization::Octree => OctreeQuantizer.quantize(frame, max_colors),
            Quantization::Palette => PaletteQuantizer::default().quantize(frame, max_colors),
            Quantization::Wu => WuQuantizer.quantize(frame, max_colors),
        }
    }
}

impl<Q> QuantizeProcessor<Q> {
    pub fn new(quantizer: Q, max_colors: usize) -> Self {
        QuantizeProcessor {
            quantizer,
            max_colors,
        }
    }
}

impl Default for QuantizeProcessor {
    fn default() -> Self {
        QuantizeProcessor::new(Quantization::default(), MAX_COLORS)
    }
}

impl<P, Q> ImageProcessor<P> for QuantizeProcessor<Q>
where
    P: Pixel,
    Q: Quantizer<P>,
{
    fn name(&self) -> &str {
        "quantize"
    }

    fn before_image_apply(&self, image: &mut Image<P>, _: Rectangle) -> Result<(), BoxError> {
        let max_colors = self.max_colors.clamp(1, MAX_COLORS);
        let quantized: Vec<PixelBuffer<P>> = image
            .all_frames()
            .enumerate()
            .map(|(index, frame)| {
                let result = self.quantizer.quantize(frame, max_colors);
                log::debug!(
                    "quantized frame {} to a palette of {} colors",
                    index,
                    result.palette().len()
                );
                result.to_pixels()
            })
            .collect();

        let (frames, _) = image.frames_with_config();
        for (frame, pixels) in frames.zip(quantized) {
            frame.swap_pixels(pixels)?;
        }

        Ok(())
    }

    fn on_apply(&self, _: &mut Frame<P>, _: Rectangle, _: &Configuration) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
struct OctreeNode {
    children: [Option<u32>; 8],
    leaf: bool,
    count: u64,
    sum: [u64; 4],
    palette_index: u8,
}

/// Levels below the root, one per bit of a channel.
const OCTREE_DEPTH: usize = 8;

struct Octree {
    nodes: Vec<OctreeNode>,
    /// Internal nodes by level, most recently created last.
    reducible: [Vec<u32>; OCTREE_DEPTH],
    leaves: usize,
}

impl Octree {
    fn new() -> Self {
        let mut reducible: [Vec<u32>; OCTREE_DEPTH] = Default::default();
        reducible[0].push(0);
        Octree {
            nodes: vec![OctreeNode::default()],
            reducible,
            leaves: 0,
        }
    }

    fn child_index([r, g, b, _]: [u8; 4], level: usize) -> usize {
        let shift = 7 - level;
        let bit = |channel: u8| usize::from((channel >> shift) & 1);
        (bit(r) << 2) | (bit(g) << 1) | bit(b)
    }

    fn add(&mut self, color: [u8; 4]) {
        let mut node = 0usize;
        for level in 0..OCTREE_DEPTH {
            if self.nodes[node].leaf {
                break;
            }

            let index = Octree::child_index(color, level);
            node = match self.nodes[node].children[index] {
                Some(child) => child as usize,
                None => {
                    let child = self.nodes.len();
                    let leaf = level + 1 == OCTREE_DEPTH;
                    self.nodes.push(OctreeNode {
                        leaf,
                        ..OctreeNode::default()
                    });
                    if leaf {
                        self.leaves += 1;
                    } else {
                        self.reducible[level + 1].push(child as u32);
                    }
                    self.nodes[node].children[index] = Some(child as u32);
                    child
                }
            };
        }

        let leaf = &mut self.nodes[node];
        leaf.count += 1;
        for (sum, channel) in leaf.sum.iter_mut().zip(color) {
            *sum += u64::from(channel);
        }
    }

    /// Merge the children of the deepest, most recently created internal node.
    fn reduce(&mut self) -> bool {
        let Some(level) = (0..OCTREE_DEPTH).rev().find(|&l| !self.reducible[l].is_empty()) else {
            return false;
        };
        let Some(node) = self.reducible[level].pop() else {
            return false;
        };

        let node = node as usize;
        let children = core::mem::take(&mut self.nodes[node].children);
        let mut merged = 0;
        for child in children.into_iter().flatten() {
            let child = &self.nodes[child as usize];
            let (count, sum) = (child.count, child.sum);

            let parent = &mut self.nodes[node];
            parent.count += count;
            for (total, part) in parent.sum.iter_mut().zip(sum) {
                *total += part;
            }
            merged += 1;
        }

        self.nodes[node].leaf = true;
        self.leaves = self.leaves + 1 - merged;
        true
    }

    /// Assign palette indices to the leaves in tree order and collect their mean colors.
    fn palette(&mut self) -> Vec<[u8; 4]> {
        let mut palette = Vec::with_capacity(self.leaves);
        let mut stack = vec![0usize];
        while let Some(node) = stack.pop() {
            let current = &mut self.nodes[node];
            if current.leaf {
                if current.count > 0 {
                    current.palette_index = palette.len() as u8;
                    let count = current.count;
                    palette.push(current.sum.map(|sum| ((sum + count / 2) / count) as u8));
                }
                continue;
            }

            stack.extend(current.children.iter().rev().flatten().map(|&c| c as usize));
        }

        palette
    }

    fn index_of(&self, color: [u8; 4]) -> u8 {
        let mut node = 0usize;
        for level in 0..OCTREE_DEPTH {
            let current = &self.nodes[node];
            if current.leaf {
                break;
            }
            match current.children[Octree::child_index(color, level)] {
                Some(child) => node = child as usize,
                None => break,
            }
        }
        self.nodes[node].palette_index
    }
}

impl<P: Pixel> Quantizer<P> for OctreeQuantizer {
    fn quantize(&self, frame: &Frame<P>, max_colors: usize) -> QuantizedFrame<P> {
        let max_colors = max_colors.clamp(1, MAX_COLORS);
        let colors: Vec<[u8; 4]> = frame.pixels().as_slice().iter().map(|p| p.to_rgba_bytes()).collect();

        let mut tree = Octree::new();
        for &color in &colors {
            tree.add(color);
        }

        while tree.leaves > max_colors && tree.reduce() {}

        let palette = tree.palette();
        let indices = colors.iter().map(|&color| tree.index_of(color)).collect();
        let palette = palette.into_iter().map(|[r, g, b, a]| P::from_bytes(r, g, b, a)).collect();
        QuantizedFrame::new(frame.width(), frame.height(), palette, indices)
    }
}

impl PaletteQuantizer {
    /// # Panics
    ///
    /// When `colors` is empty.
    pub fn new(colors: Vec<Rgba32>) -> Self {
        assert!(!colors.is_empty(), "A palette needs at least one color");
        PaletteQuantizer { colors }
    }

    /// The 216 colors with every channel a multiple of 51.
    pub fn web_safe() -> Self {
        let levels = [0u8, 51, 102, 153, 204, 255];
        let mut colors = Vec::with_capacity(216);
        for r in levels {
            for g in levels {
                for b in levels {
                    colors.push(Rgba32::rgb(r, g, b));
                }
            }
        }
        PaletteQuantizer { colors }
    }

    pub fn colors(&self) -> &[Rgba32] {
        &self.colors
    }
}

impl Default for PaletteQuantizer {
    fn default() -> Self {
        PaletteQuantizer::web_safe()
    }
}

impl<P: Pixel> Quantizer<P> for PaletteQuantizer {
    /// Uses the first `max_colors` colors of the palette.
    fn quantize(&self, frame: &Frame<P>, max_colors: usize) -> QuantizedFrame<P> {
        let max_colors = max_colors.clamp(1, MAX_COLORS);
        let colors = &self.colors[..self.colors.len().min(max_colors)];
        let targets: Vec<[f32; 4]> = colors.iter().map(|c| c.to_vector4()).collect();

        let indices = frame
            .pixels()
            .as_slice()
            .iter()
            .map(|pixel| {
                let vector = pixel.to_vector4();
                let distance = |target: &[f32; 4]| -> f32 {
                    target.iter().zip(vector).map(|(t, v)| (t - v) * (t - v)).sum()
                };

                // Ties go to the lower index.
                let mut best = (0, f32::INFINITY);
                for (index, target) in targets.iter().enumerate() {
                    let d = distance(target);
                    if d < best.1 {
                        best = (index, d);
                    }
                }
                best.0 as u8
            })
            .collect();

        let palette = colors.iter().map(|c| P::from_vector4(c.to_vector4())).collect();
        QuantizedFrame::new(frame.width(), frame.height(), palette, indices)
    }
}

/// Histogram cells per channel, one more than the levels for the cumulative sums.
const SIDE: usize = 33;

#[derive(Clone, Copy, Debug, Default)]
struct ColorBox {
    // Lower bounds are exclusive, upper bounds inclusive.
    r0: usize,
    r1: usize,
    g0: usize,
    g1: usize,
    b0: usize,
    b1: usize,
    volume: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    Red,
    Green,
    Blue,
}

/// Cumulative color moments over the histogram.
struct Moments {
    weight: Vec<i64>,
    red: Vec<i64>,
    green: Vec<i64>,
    blue: Vec<i64>,
    alpha: Vec<i64>,
    squares: Vec<f64>,
}

fn cell(r: usize, g: usize, b: usize) -> usize {
    (r * SIDE + g) * SIDE + b
}

fn cell_of([r, g, b, _]: [u8; 4]) -> usize {
    cell(usize::from(r >> 3) + 1, usize::from(g >> 3) + 1, usize::from(b >> 3) + 1)
}

impl Moments {
    fn histogram(colors: &[[u8; 4]]) -> Self {
        let cells = SIDE * SIDE * SIDE;
        let mut moments = Moments {
            weight: vec![0; cells],
            red: vec![0; cells],
            green: vec![0; cells],
            blue: vec![0; cells],
            alpha: vec![0; cells],
            squares: vec![0.0; cells],
        };

        for &color in colors {
            let index = cell_of(color);
            let [r, g, b, a] = color.map(i64::from);
            moments.weight[index] += 1;
            moments.red[index] += r;
            moments.green[index] += g;
            moments.blue[index] += b;
            moments.alpha[index] += a;
            moments.squares[index] += (r * r + g * g + b * b) as f64;
        }

        moments.accumulate();
        moments
    }

    /// Turn the histogram into sums over `(0, 0, 0)..=(r, g, b)`.
    fn accumulate(&mut self) {
        fn integrate<T: Copy + Default + core::ops::AddAssign + core::ops::Add<Output = T>>(data: &mut [T]) {
            for r in 1..SIDE {
                let mut area = [T::default(); SIDE];
                for g in 1..SIDE {
                    let mut line = T::default();
                    for b in 1..SIDE {
                        line += data[cell(r, g, b)];
                        area[b] += line;
                        data[cell(r, g, b)] = data[cell(r - 1, g, b)] + area[b];
                    }
                }
            }
        }

        integrate(&mut self.weight);
        integrate(&mut self.red);
        integrate(&mut self.green);
        integrate(&mut self.blue);
        integrate(&mut self.alpha);
        integrate(&mut self.squares);
    }
}

fn volume<T>(cube: &ColorBox, m: &[T]) -> T
where
    T: Copy + core::ops::Add<Output = T> + core::ops::Sub<Output = T>,
{
    m[cell(cube.r1, cube.g1, cube.b1)] - m[cell(cube.r1, cube.g1, cube.b0)] - m[cell(cube.r1, cube.g0, cube.b1)]
        + m[cell(cube.r1, cube.g0, cube.b0)]
        - m[cell(cube.r0, cube.g1, cube.b1)]
        + m[cell(cube.r0, cube.g1, cube.b0)]
        + m[cell(cube.r0, cube.g0, cube.b1)]
        - m[cell(cube.r0, cube.g0, cube.b0)]
}

/// The part of `volume` that does not depend on the cut position along `axis`.
fn bottom(cube: &ColorBox, axis: Axis, m: &[i64]) -> i64 {
    match axis {
        Axis::Red => {
            -m[cell(cube.r0, cube.g1, cube.b1)] + m[cell(cube.r0, cube.g1, cube.b0)] + m[cell(cube.r0, cube.g0, cube.b1)]
                - m[cell(cube.r0, cube.g0, cube.b0)]
        }
        Axis::Green => {
            -m[cell(cube.r1, cube.g0, cube.b1)] + m[cell(cube.r1, cube.g0, cube.b0)] + m[cell(cube.r0, cube.g0, cube.b1)]
                - m[cell(cube.r0, cube.g0, cube.b0)]
        }
        Axis::Blue => {
            -m[cell(cube.r1, cube.g1, cube.b0)] + m[cell(cube.r1, cube.g0, cube.b0)] + m[cell(cube.r0, cube.g1, cube.b0)]
                - m[cell(cube.r0, cube.g0, cube.b0)]
        }
    }
}

/// The part of `volume` that depends on the cut position `at` along `axis`.
fn top(cube: &ColorBox, axis: Axis, at: usize, m: &[i64]) -> i64 {
    match axis {
        Axis::Red => {
            m[cell(at, cube.g1, cube.b1)] - m[cell(at, cube.g1, cube.b0)] - m[cell(at, cube.g0, cube.b1)]
                + m[cell(at, cube.g0, cube.b0)]
        }
        Axis::Green => {
            m[cell(cube.r1, at, cube.b1)] - m[cell(cube.r1, at, cube.b0)] - m[cell(cube.r0, at, cube.b1)]
                + m[cell(cube.r0, at, cube.b0)]
        }
        Axis::Blue => {
            m[cell(cube.r1, cube.g1, at)] - m[cell(cube.r1, cube.g0, at)] - m[cell(cube.r0, cube.g1, at)]
                + m[cell(cube.r0, cube.g0, at)]
        }
    }
}

impl Moments {
    fn variance(&self, cube: &ColorBox) -> f64 {
        let weight = volume(cube, &self.weight);
        if weight == 0 {
            return 0.0;
        }

        let r = volume(cube, &self.red) as f64;
        let g = volume(cube, &self.green) as f64;
        let b = volume(cube, &self.blue) as f64;
        volume(cube, &self.squares) - (r * r + g * g + b * b) / weight as f64
    }

    /// The best cut along `axis` and the resulting reduction measure.
    fn maximize(&self, cube: &ColorBox, axis: Axis, first: usize, last: usize, whole: [i64; 4]) -> Option<(f64, usize)> {
        let base = [
            bottom(cube, axis, &self.red),
            bottom(cube, axis, &self.green),
            bottom(cube, axis, &self.blue),
            bottom(cube, axis, &self.weight),
        ];

        let mut best: Option<(f64, usize)> = None;
        for at in first..last {
            let half = [
                base[0] + top(cube, axis, at, &self.red),
                base[1] + top(cube, axis, at, &self.green),
                base[2] + top(cube, axis, at, &self.blue),
                base[3] + top(cube, axis, at, &self.weight),
            ];
            let rest = [whole[0] - half[0], whole[1] - half[1], whole[2] - half[2], whole[3] - half[3]];
            if half[3] == 0 || rest[3] == 0 {
                continue;
            }

            let energy = |part: [i64; 4]| {
                let (r, g, b) = (part[0] as f64, part[1] as f64, part[2] as f64);
                (r * r + g * g + b * b) / part[3] as f64
            };
            let measure = energy(half) + energy(rest);
            if best.map_or(true, |(max, _)| measure > max) {
                best = Some((measure, at));
            }
        }

        best
    }

    /// Split `cube` in two, returning the upper half, or `None` when it can not be split.
    fn cut(&self, cube: &mut ColorBox) -> Option<ColorBox> {
        let whole = [
            volume(cube, &self.red),
            volume(cube, &self.green),
            volume(cube, &self.blue),
            volume(cube, &self.weight),
        ];

        let candidates = [
            (Axis::Red, self.maximize(cube, Axis::Red, cube.r0 + 1, cube.r1, whole)),
            (Axis::Green, self.maximize(cube, Axis::Green, cube.g0 + 1, cube.g1, whole)),
            (Axis::Blue, self.maximize(cube, Axis::Blue, cube.b0 + 1, cube.b1, whole)),
        ];

        let (axis, at) = candidates
            .into_iter()
            .filter_map(|(axis, best)| best.map(|(measure, at)| (axis, measure, at)))
            .fold(None, |chosen: Option<(Axis, f64, usize)>, candidate| match chosen {
                Some(current) if current.1 >= candidate.1 => Some(current),
                _ => Some(candidate),
            })
            .map(|(axis, _, at)| (axis, at))?;

        let mut upper = *cube;
        match axis {
            Axis::Red => {
                upper.r0 = at;
                cube.r1 = at;
            }
            Axis::Green => {
                upper.g0 = at;
                cube.g1 = at;
            }
            Axis::Blue => {
                upper.b0 = at;
                cube.b1 = at;
            }
        }

        let size = |c: &ColorBox| (c.r1 - c.r0) * (c.g1 - c.g0) * (c.b1 - c.b0);
        cube.volume = size(cube);
        upper.volume = size(&upper);
        Some(upper)
    }
}

impl<P: Pixel> Quantizer<P> for WuQuantizer {
    fn quantize(&self, frame: &Frame<P>, max_colors: usize) -> QuantizedFrame<P> {
        let max_colors = max_colors.clamp(1, MAX_COLORS);
        let colors: Vec<[u8; 4]> = frame.pixels().as_slice().iter().map(|p| p.to_rgba_bytes()).collect();
        let moments = Moments::histogram(&colors);

        let whole = ColorBox {
            r0: 0,
            r1: SIDE - 1,
            g0: 0,
            g1: SIDE - 1,
            b0: 0,
            b1: SIDE - 1,
            volume: (SIDE - 1).pow(3),
        };

        let mut cubes = vec![whole];
        let mut variances = vec![0.0f64];
        let mut next = 0;
        while cubes.len() < max_colors {
            match moments.cut(&mut cubes[next]) {
                Some(upper) => {
                    let spread = |cube: &ColorBox| if cube.volume > 1 { moments.variance(cube) } else { 0.0 };
                    variances[next] = spread(&cubes[next]);
                    variances.push(spread(&upper));
                    cubes.push(upper);
                }
                None => variances[next] = 0.0,
            }

            let (index, &largest) = variances
                .iter()
                .enumerate()
                .fold((0, &f64::MIN), |best, candidate| if candidate.1 > best.1 { candidate } else { best });
            if largest <= 0.0 {
                break;
            }
            next = index;
        }

        // Every histogram cell is tagged with the palette entry of its cube.
        let mut tags = vec![0u8; SIDE * SIDE * SIDE];
        let mut palette = Vec::with_capacity(cubes.len());
        for cube in &cubes {
            let weight = volume(cube, &moments.weight);
            if weight == 0 {
                continue;
            }

            let mean = |m: &[i64]| ((volume(cube, m) + weight / 2) / weight) as u8;
            let entry = palette.len() as u8;
            palette.push(P::from_bytes(
                mean(&moments.red),
                mean(&moments.green),
                mean(&moments.blue),
                mean(&moments.alpha),
            ));

            for r in cube.r0 + 1..=cube.r1 {
                for g in cube.g0 + 1..=cube.g1 {
                    for b in cube.b0 + 1..=cube.b1 {
                        tags[cell(r, g, b)] = entry;
                    }
                }
            }
        }

        let indices = colors.iter().map(|&color| tags[cell_of(color)]).collect();
        QuantizedFrame::new(frame.width(), frame.height(), palette, indices)
    }
}

impl<P: Pixel> Operations<'_, P> {
    /// Quantize every frame to at most `max_colors` colors.
    pub fn quantize(&mut self, mode: Quantization, max_colors: usize) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&QuantizeProcessor::new(mode, max_colors))
    }

    pub fn quantize_with(
        &mut self,
        quantizer: &impl Quantizer<P>,
        max_colors: usize,
    ) -> Result<&mut Self, ProcessingError> {
        self.apply_processor(&QuantizeProcessor::new(quantizer, max_colors))
    }
}

impl<P: Pixel, Q: Quantizer<P> + ?Sized> Quantizer<P> for &'_ Q {
    fn quantize(&self, frame: &Frame<P>, max_colors: usize) -> QuantizedFrame<P> {
        (**self).quantize(frame, max_colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_colors() -> Frame<Rgba32> {
        let mut frame = Frame::new(2, 2);
        frame[(0, 0)] = Rgba32::rgb(255, 0, 0);
        frame[(1, 0)] = Rgba32::rgb(250, 10, 0);
        frame[(0, 1)] = Rgba32::rgb(0, 0, 255);
        frame[(1, 1)] = Rgba32::rgb(0, 10, 250);
        frame
    }

    fn distinct(frame: &QuantizedFrame<Rgba32>) -> Vec<Rgba32> {
        let mut colors: Vec<_> = (0..frame.height())
            .flat_map(|y| (0..frame.width()).map(move |x| (x, y)))
            .map(|(x, y)| frame.color(x, y))
            .collect();
        colors.sort_by_key(|c| c.to_rgba_bytes());
        colors.dedup();
        colors
    }

    #[test]
    fn octree_merges_similar_colors() {
        let quantized = OctreeQuantizer.quantize(&four_colors(), 2);
        let colors = distinct(&quantized);
        assert_eq!(colors.len(), 2);
        assert!(colors.iter().all(|c| quantized.palette().contains(c)));
        assert_eq!(quantized.color(0, 0), quantized.color(1, 0));
        assert_eq!(quantized.color(0, 1), quantized.color(1, 1));
    }

    #[test]
    fn octree_keeps_few_colors_exact() {
        let frame = four_colors();
        let quantized = OctreeQuantizer.quantize(&frame, 256);
        assert_eq!(quantized.palette().len(), 4);
        assert_eq!(quantized.to_pixels(), *frame.pixels());
    }

    #[test]
    fn wu_splits_by_variance() {
        let quantized = WuQuantizer.quantize(&four_colors(), 2);
        assert_eq!(quantized.palette().len(), 2);
        assert_eq!(quantized.color(0, 0), quantized.color(1, 0));
        assert_ne!(quantized.color(0, 0), quantized.color(0, 1));
    }

    #[test]
    fn palette_prefers_lower_index_on_ties() {
        let palette = PaletteQuantizer::new(vec![Rgba32::rgb(0, 0, 0), Rgba32::rgb(2, 2, 2)]);
        let frame = Frame::filled(1, 1, Rgba32::rgb(1, 1, 1)).unwrap();
        assert_eq!(palette.quantize(&frame, 256).indices(), [0]);

        let web = PaletteQuantizer::web_safe();
        assert_eq!(web.colors().len(), 216);
        let frame = Frame::filled(1, 1, Rgba32::rgb(50, 105, 250)).unwrap();
        assert_eq!(web.quantize(&frame, 256).color(0, 0), Rgba32::rgb(51, 102, 255));
    }

    #[test]
    fn out_of_range_indices_select_the_last_color() {
        let frame = QuantizedFrame::new(2, 1, vec![Rgba32::BLACK, Rgba32::WHITE], vec![0, 9]);
        assert_eq!(frame.color(1, 0), Rgba32::WHITE);
        assert_eq!(frame.to_pixels().as_slice(), &[Rgba32::BLACK, Rgba32::WHITE]);

        let empty = QuantizedFrame::<Rgba32>::new(0, 3, vec![Rgba32::WHITE], vec![]);
        assert!(empty.to_pixels().is_empty());
    }

    #[test]
    fn single_color_limit() {
        for mode in [Quantization::Octree, Quantization::Palette, Quantization::Wu] {
            let quantized = mode.quantize(&four_colors(), 0);
            assert_eq!(distinct(&quantized).len(), 1, "{:?}", mode);
        }
    }
}
