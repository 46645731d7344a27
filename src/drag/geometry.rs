//! Screen geometry for drag gestures.

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width; never negative.
    pub width: f64,
    /// Height; never negative.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle. Negative extents are clamped to zero.
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            self.left + self.width / 2.0,
            self.top + self.height / 2.0,
        )
    }

    /// Returns `true` if `point` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Area of the overlap with `other`; zero when disjoint.
    #[must_use]
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let width = self.right().min(other.right()) - self.left.max(other.left);
        let height = self.bottom().min(other.bottom()) - self.top.max(other.top);
        if width > 0.0 && height > 0.0 {
            width * height
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Point::new(0.0, 0.0), true)]
    #[case(Point::new(10.0, 5.0), true)]
    #[case(Point::new(10.1, 5.0), false)]
    #[case(Point::new(-1.0, 2.0), false)]
    fn test_contains_includes_border(#[case] point: Point, #[case] expected: bool) {
        assert_eq!(Rect::new(0.0, 0.0, 10.0, 5.0).contains(point), expected);
    }

    #[rstest]
    fn test_intersection_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection_area(&Rect::new(5.0, 5.0, 10.0, 10.0)), 25.0);
        assert_eq!(a.intersection_area(&Rect::new(10.0, 0.0, 5.0, 5.0)), 0.0);
    }

    #[rstest]
    fn test_negative_extent_is_clamped() {
        assert_eq!(Rect::new(0.0, 0.0, -3.0, 4.0).width, 0.0);
    }
}
