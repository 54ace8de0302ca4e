#![forbid(unsafe_code)]

//! Vertical geometry primitives.
//!
//! Scroll activation only cares about the vertical axis: every observed
//! region is reduced to a [`VerticalSpan`] in viewport coordinates (CSS
//! pixels, origin at the top edge of the viewport, growing downward).

/// A vertical extent `[top, bottom]` in viewport coordinates.
///
/// Values come straight from `getBoundingClientRect()` and may be negative
/// (region above the viewport) or larger than the viewport height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VerticalSpan {
    /// Top edge offset.
    pub top: f64,
    /// Bottom edge offset.
    pub bottom: f64,
}

impl VerticalSpan {
    /// Create a new span. `top` and `bottom` are normalized so that
    /// `top <= bottom`.
    #[must_use]
    pub fn new(top: f64, bottom: f64) -> Self {
        if top <= bottom {
            Self { top, bottom }
        } else {
            Self {
                top: bottom,
                bottom: top,
            }
        }
    }

    /// Height of the span (never negative).
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }

    /// Midpoint between top and bottom.
    #[inline]
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Absolute distance between the midpoint and a horizontal line at `y`.
    #[inline]
    #[must_use]
    pub fn distance_to(&self, y: f64) -> f64 {
        (self.midpoint() - y).abs()
    }

    /// Whether all coordinates are finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.top.is_finite() && self.bottom.is_finite()
    }

    /// Overlap with another span, or `None` if they do not overlap.
    ///
    /// Touching edges count as no overlap.
    #[must_use]
    pub fn intersection(&self, other: &VerticalSpan) -> Option<VerticalSpan> {
        let top = self.top.max(other.top);
        let bottom = self.bottom.min(other.bottom);
        (top < bottom).then_some(VerticalSpan { top, bottom })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_order() {
        let span = VerticalSpan::new(200.0, 100.0);
        assert_eq!(span.top, 100.0);
        assert_eq!(span.bottom, 200.0);
    }

    #[test]
    fn midpoint_and_distance() {
        let span = VerticalSpan::new(300.0, 400.0);
        assert_eq!(span.midpoint(), 350.0);
        assert_eq!(span.distance_to(400.0), 50.0);
        assert_eq!(VerticalSpan::new(0.0, 100.0).distance_to(400.0), 350.0);
    }

    #[test]
    fn intersection_overlap() {
        let a = VerticalSpan::new(0.0, 100.0);
        let b = VerticalSpan::new(50.0, 150.0);
        assert_eq!(a.intersection(&b), Some(VerticalSpan::new(50.0, 100.0)));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = VerticalSpan::new(0.0, 100.0);
        let b = VerticalSpan::new(100.0, 150.0);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn non_finite_detected() {
        assert!(!VerticalSpan::new(f64::NAN, 1.0).is_finite());
        assert!(VerticalSpan::new(-1.0, 1.0).is_finite());
    }
}
