//! Integer rectangles in a node's coordinate space.
//!
//! Coordinate spaces are not anchored at zero: origins may be negative or
//! arbitrarily large, so every rectangle carries an explicit minimum corner.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An axis-aligned integer rectangle `(x, y, width, height)`.
///
/// The rectangle covers `[x, x + width) x [y, y + height)`. A rectangle with
/// a non-positive width or height is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum x coordinate
    pub x: i32,
    /// Minimum y coordinate
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle from its minimum (inclusive) and maximum
    /// (exclusive) corners.
    pub fn from_corners(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Minimum x coordinate (inclusive).
    pub fn min_x(&self) -> i32 {
        self.x
    }

    /// Minimum y coordinate (inclusive).
    pub fn min_y(&self) -> i32 {
        self.y
    }

    /// Maximum x coordinate (exclusive).
    ///
    /// Saturates at `i32::MAX`, which is exact for representable rectangles.
    pub fn max_x(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Maximum y coordinate (exclusive). Saturates like [`Rect::max_x`].
    pub fn max_y(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Whether the maximum corner fits in `i32`.
    pub fn is_representable(&self) -> bool {
        self.x.checked_add(self.width).is_some() && self.y.checked_add(self.height).is_some()
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.width as u64 * self.height as u64
        }
    }

    /// Return a copy shifted by `(dx, dy)`.
    ///
    /// The caller guarantees the result is in range; use
    /// [`Rect::checked_translated`] for untrusted offsets.
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Return a copy shifted by `(dx, dy)`, or `None` if either corner of
    /// the result leaves the `i32` range.
    pub fn checked_translated(&self, dx: i32, dy: i32) -> Option<Self> {
        let r = Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?, self.width, self.height);
        r.is_representable().then_some(r)
    }

    /// Shift by `(dx, dy)` modulo 2^32.
    ///
    /// For storage rectangles that are only ever used through differences
    /// against in-range coordinates.
    pub(crate) fn wrapping_translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy), self.width, self.height)
    }

    /// Whether the point `(px, py)` lies inside.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && py >= self.y && px < self.max_x() && py < self.max_y()
    }

    /// Whether `other` lies entirely inside this rectangle.
    ///
    /// An empty `other` is never contained.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Intersection of two rectangles, `None` if they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::from_corners(
            self.x.max(other.x),
            self.y.max(other.y),
            self.max_x().min(other.max_x()),
            self.max_y().min(other.max_y()),
        );
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    /// Smallest rectangle covering both. Empty operands are ignored.
    ///
    /// `None` if the covering rectangle is wider or taller than `i32::MAX`.
    pub fn union(&self, other: &Rect) -> Option<Rect> {
        if self.is_empty() {
            return Some(*other);
        }
        if other.is_empty() {
            return Some(*self);
        }
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let width = self.max_x().max(other.max_x()).checked_sub(min_x)?;
        let height = self.max_y().max(other.max_y()).checked_sub(min_y)?;
        Some(Rect::new(min_x, min_y, width, height))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(-10, 20, 100, 200);
        assert_eq!(r.max_x(), 90);
        assert_eq!(r.max_y(), 220);
        assert_eq!(r.area(), 20000);
        assert!(!r.is_empty());
        assert!(Rect::new(0, 0, 0, 5).is_empty());
    }

    #[test]
    fn test_translated_does_not_alias() {
        let r = Rect::new(5, 5, 3, 3);
        let moved = r.translated(100, 200);
        assert_eq!(moved, Rect::new(105, 205, 3, 3));
        assert_eq!(r, Rect::new(5, 5, 3, 3));
    }

    #[test]
    fn test_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, -5, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 0, 5, 5)));
        assert_eq!(a.intersection(&Rect::new(10, 0, 5, 5)), None);
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.union(&Rect::default()), Some(a));
        assert_eq!(a.union(&Rect::new(-5, 20, 5, 5)), Some(Rect::new(-5, 0, 15, 25)));
    }

    #[test]
    fn test_union_too_wide() {
        let left = Rect::new(i32::MIN, 0, 10, 10);
        let right = Rect::new(i32::MAX - 10, 0, 10, 10);
        assert_eq!(left.union(&right), None);
    }

    #[test]
    fn test_checked_translated_at_extremes() {
        let r = Rect::new(10, 0, 10, 10);
        assert_eq!(r.checked_translated(i32::MAX - 20, 0), Some(Rect::new(i32::MAX - 10, 0, 10, 10)));
        assert_eq!(r.checked_translated(i32::MAX - 15, 0), None);
        assert_eq!(r.checked_translated(i32::MIN, 0), Some(Rect::new(i32::MIN + 10, 0, 10, 10)));
        assert_eq!(Rect::new(-1, 0, 1, 1).checked_translated(i32::MIN, 0), None);
        assert_eq!(r.checked_translated(-10, i32::MIN), Some(Rect::new(0, i32::MIN, 10, 10)));
    }

    #[test]
    fn test_edges_near_max() {
        let r = Rect::new(i32::MAX - 4, i32::MAX - 4, 4, 4);
        assert!(r.is_representable());
        assert_eq!(r.max_x(), i32::MAX);
        assert!(r.contains(i32::MAX - 1, i32::MAX - 1));
        assert!(!Rect::new(i32::MAX - 4, 0, 5, 1).is_representable());

        let past_end = Rect::new(i32::MAX - 2, i32::MAX - 2, 8, 8);
        assert_eq!(r.intersection(&past_end), Some(Rect::new(i32::MAX - 2, i32::MAX - 2, 2, 2)));
    }

    #[test]
    fn test_contains_rect() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.contains_rect(&Rect::new(2, 2, 8, 8)));
        assert!(!a.contains_rect(&Rect::new(2, 2, 9, 8)));
        assert!(!a.contains_rect(&Rect::new(2, 2, 0, 0)));
        assert!(a.contains(9, 9));
        assert!(!a.contains(10, 9));
    }
}
