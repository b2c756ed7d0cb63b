//! Screen-space geometry.

/// Axis-aligned rectangle in screen pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// Construct from origin and size.
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Construct from edges as reported by `RECT`-style APIs.
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// True if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// True if both sides are at least `min` pixels.
    pub fn at_least(&self, min: i32) -> bool {
        self.width >= min && self.height >= min
    }

    /// Number of pixels covered; 0 for empty rectangles.
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_and_emptiness() {
        let r = Rect::from_edges(10, 20, 40, 44);
        assert_eq!(r, Rect::new(10, 20, 30, 24));
        assert!(!r.is_empty());
        assert!(r.at_least(24));
        assert!(!r.at_least(25));
        assert_eq!(r.area(), 720);
        assert!(Rect::default().is_empty());
        assert!(Rect::from_edges(5, 5, 3, 9).is_empty());
        assert_eq!(Rect::new(0, 0, -2, 4).area(), 0);
    }
}
