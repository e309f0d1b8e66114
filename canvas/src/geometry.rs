//! Rectangles and the clipping shared by every per-pixel loop.
use core::fmt;
use core::ops::Range;

/// A point in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// The dimensions of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

/// An axis aligned rectangle, possibly partially or entirely outside of an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// The columns and rows of a frame that a rectangle selects.
///
/// Computed by [`Region::clip`]. Both ranges lie within the frame and are empty together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub columns: Range<usize>,
    pub rows: Range<usize>,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl Size {
    pub const fn new(width: usize, height: usize) -> Self {
        Size { width, height }
    }

    pub fn area(self) -> usize {
        self.width * self.height
    }
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rectangle {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle `(0, 0, width, height)`, saturating dimensions beyond `i32::MAX`.
    pub fn from_size(size: Size) -> Self {
        let saturate = |v: usize| i32::try_from(v).unwrap_or(i32::MAX);
        Rectangle::new(0, 0, saturate(size.width), saturate(size.height))
    }

    pub fn left(self) -> i32 {
        self.x
    }

    pub fn top(self) -> i32 {
        self.y
    }

    pub fn right(self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// The middle of the rectangle, saturating at the bounds of `i32`.
    pub fn center(self) -> Point {
        Point::new(
            self.x.saturating_add(self.width / 2),
            self.y.saturating_add(self.height / 2),
        )
    }

    pub fn contains(self, point: Point) -> bool {
        (self.left()..self.right()).contains(&point.x) && (self.top()..self.bottom()).contains(&point.y)
    }

    /// The overlap of two rectangles, the default rectangle if they do not overlap.
    pub fn intersect(self, other: Rectangle) -> Rectangle {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return Rectangle::default();
        }

        Rectangle::new(left, top, right - left, bottom - top)
    }
}

impl Region {
    /// Clip a rectangle against a frame of `width` by `height` pixels.
    ///
    /// The loop bounds are the rectangle intersected with the frame. A rectangle whose origin lies
    /// at or before the frame origin does not move the frame, it shifts the origin of the
    /// iteration instead: with `x = -2`, the loop that would have visited columns `0..n` visits
    /// `2..n + 2`, always bounded by the frame width. A rectangle with a positive origin is
    /// visited exactly. A rectangle entirely outside the frame selects nothing.
    pub fn clip(rect: Rectangle, width: usize, height: usize) -> Region {
        let columns = clip_axis(rect.x, rect.width, width);
        let rows = clip_axis(rect.y, rect.height, height);
        if columns.is_empty() || rows.is_empty() {
            return Region {
                columns: 0..0,
                rows: 0..0,
            };
        }

        Region { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

fn clip_axis(start: i32, extent: i32, size: usize) -> Range<usize> {
    let (start, end) = (i64::from(start), i64::from(start) + i64::from(extent.max(0)));
    let size = i64::try_from(size).unwrap_or(i64::MAX);

    let min = start.max(0);
    let max = end.min(size);
    let origin = start.min(0);

    let lo = min - origin;
    let hi = (max - origin).min(size);
    if lo >= hi {
        return 0..0;
    }

    // Both bounds are within `0..=size` here.
    lo as usize..hi as usize
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

impl From<(usize, usize)> for Size {
    fn from((width, height): (usize, usize)) -> Self {
        Size { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_inside() {
        let region = Region::clip(Rectangle::new(1, 2, 3, 4), 10, 10);
        assert_eq!(region.columns, 1..4);
        assert_eq!(region.rows, 2..6);
    }

    #[test]
    fn clip_to_frame() {
        let region = Region::clip(Rectangle::new(5, 5, 100, 100), 8, 6);
        assert_eq!(region.columns, 5..8);
        assert_eq!(region.rows, 5..6);
    }

    #[test]
    fn negative_origin_shifts_iteration() {
        let region = Region::clip(Rectangle::new(-2, 0, 5, 4), 10, 4);
        assert_eq!(region.columns, 2..5);
        assert_eq!(region.rows, 0..4);

        // Bounded by the frame even when shifted past it.
        let region = Region::clip(Rectangle::new(-3, 0, 6, 4), 4, 4);
        assert_eq!(region.columns, 3..4);
    }

    #[test]
    fn outside_selects_nothing() {
        for rect in [
            Rectangle::new(10, 0, 4, 4),
            Rectangle::new(0, 10, 4, 4),
            Rectangle::new(-10, 0, 5, 4),
            Rectangle::new(0, -8, 4, 4),
            Rectangle::new(0, 0, 0, 4),
            Rectangle::new(0, 0, -3, 4),
        ] {
            let region = Region::clip(rect, 4, 4);
            assert!(region.is_empty(), "{}", rect);
            assert_eq!(region.height(), 0);
        }
    }

    #[test]
    fn intersection() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(5, -5, 10, 10);
        assert_eq!(a.intersect(b), Rectangle::new(5, 0, 5, 5));
        assert_eq!(a.intersect(Rectangle::new(20, 20, 1, 1)), Rectangle::default());
        assert_eq!(a.center(), Point::new(5, 5));
        assert!(a.contains(Point::new(9, 0)));
        assert!(!a.contains(Point::new(10, 0)));
    }

    #[test]
    fn center_saturates() {
        let far = Rectangle::new(i32::MAX - 1, i32::MIN, 10, -10);
        assert_eq!(far.center(), Point::new(i32::MAX, i32::MIN));
        assert_eq!(Rectangle::new(-4, 2, 4, 3).center(), Point::new(-2, 3));
    }
}
