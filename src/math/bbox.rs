//! 2D axis aligned boxes for tracking and clamping UVs.

use std::ops::AddAssign;

use nalgebra::Vector2;

/// Axis aligned 2D box over UV space.
///
/// A freshly constructed box is empty (min > max) and is not valid until a
/// point has been added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvBox {
    min: Vector2<f32>,
    max: Vector2<f32>,
}

impl Default for UvBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl UvBox {
    /// An empty box.
    pub fn empty() -> Self {
        Self {
            min: Vector2::new(f32::MAX, f32::MAX),
            max: Vector2::new(-f32::MAX, -f32::MAX),
        }
    }

    /// A box spanning `min..=max`.
    pub fn new(min: Vector2<f32>, max: Vector2<f32>) -> Self {
        Self { min, max }
    }

    /// Reset to the empty state.
    pub fn reset(&mut self) {
        *self = Self::empty();
    }

    /// True unless min exceeds max on either axis.
    pub fn is_valid(&self) -> bool {
        !(self.min.x > self.max.x) && !(self.min.y > self.max.y)
    }

    /// Min corner.
    #[inline]
    pub fn min(&self) -> Vector2<f32> {
        self.min
    }

    /// Max corner.
    #[inline]
    pub fn max(&self) -> Vector2<f32> {
        self.max
    }

    /// Grow to include `point`.
    pub fn expand(&mut self, point: &Vector2<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// Grow to include `other`.
    pub fn union(&mut self, other: &UvBox) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
    }

    /// Clamp `point` into the box. An invalid box leaves the point untouched.
    pub fn clamp(&self, point: &mut Vector2<f32>) {
        if !self.is_valid() {
            return;
        }
        point.x = point.x.clamp(self.min.x, self.max.x);
        point.y = point.y.clamp(self.min.y, self.max.y);
    }

    /// Clamp `point` into the box grown by `fraction / 2` of its extent on
    /// every side.
    pub fn clamp_padded(&self, point: &mut Vector2<f32>, fraction: f32) {
        if !self.is_valid() {
            return;
        }
        let half = 0.5 * fraction;
        let pad_x = half * (self.max.x - self.min.x);
        let pad_y = half * (self.max.y - self.min.y);

        point.x = point.x.clamp(self.min.x - pad_x, self.max.x + pad_x);
        point.y = point.y.clamp(self.min.y - pad_y, self.max.y + pad_y);
    }

    /// True if `point` lies within the box grown by `fraction / 2` of its
    /// extent on every side (with a small absolute slack).
    pub fn contains_padded(&self, point: &Vector2<f32>, fraction: f32) -> bool {
        let half = 0.5 * fraction;
        let pad_x = half * (self.max.x - self.min.x) + 1e-6;
        let pad_y = half * (self.max.y - self.min.y) + 1e-6;
        point.x >= self.min.x - pad_x
            && point.x <= self.max.x + pad_x
            && point.y >= self.min.y - pad_y
            && point.y <= self.max.y + pad_y
    }
}

impl AddAssign<&UvBox> for UvBox {
    fn add_assign(&mut self, rhs: &UvBox) {
        self.union(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_box_is_invalid() {
        let b = UvBox::empty();
        assert!(!b.is_valid());

        // Clamping with an invalid box is a no-op.
        let mut p = Vector2::new(5.0, -5.0);
        b.clamp(&mut p);
        assert_eq!(p, Vector2::new(5.0, -5.0));
    }

    #[test]
    fn test_expand_and_union() {
        let mut a = UvBox::empty();
        a.expand(&Vector2::new(0.0, 0.0));
        a.expand(&Vector2::new(1.0, 0.5));
        assert!(a.is_valid());

        let mut b = UvBox::empty();
        b.expand(&Vector2::new(-1.0, 2.0));

        a += &b;
        assert_eq!(a.min(), Vector2::new(-1.0, 0.0));
        assert_eq!(a.max(), Vector2::new(1.0, 2.0));
    }

    #[test]
    fn test_clamp_padded() {
        let b = UvBox::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0));

        let mut p = Vector2::new(2.0, -2.0);
        b.clamp(&mut p);
        assert_eq!(p, Vector2::new(1.0, 0.0));

        let mut q = Vector2::new(2.0, -2.0);
        b.clamp_padded(&mut q, 0.2);
        assert!((q.x - 1.1).abs() < 1e-6);
        assert!((q.y + 0.1).abs() < 1e-6);
        assert!(b.contains_padded(&q, 0.2));
    }
}
