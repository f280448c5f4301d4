use egui::{Pos2, Rect, Vec2};

use crate::stroke::StrokeSegment;

/// Distance below which two points are treated as the same point
const DEGENERATE_EPSILON: f32 = 1e-3;

/// Factor converting view-space lengths into bitmap-space lengths.
///
/// Only the width is compared; the view is expected to keep the bitmap's
/// aspect ratio. An empty view maps one to one.
pub fn scale_ratio(bitmap_size: Vec2, view_size: Vec2) -> f32 {
    if view_size.x > 0.0 && view_size.x.is_finite() {
        bitmap_size.x / view_size.x
    } else {
        1.0
    }
}

/// Cubic Bézier in a single coordinate space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCurve {
    pub start: Pos2,
    pub control1: Pos2,
    pub control2: Pos2,
    pub end: Pos2,
}

impl CubicCurve {
    /// Fits the velocity-handle curve through a segment, in view space
    pub fn from_segment(segment: &StrokeSegment) -> Self {
        let (control1, control2) = segment.control_points();
        Self {
            start: segment.start.position,
            control1,
            control2,
            end: segment.end.position,
        }
    }

    /// Multiplies every point by `ratio`
    pub fn scaled(&self, ratio: f32) -> Self {
        let scale = |p: Pos2| Pos2::new(p.x * ratio, p.y * ratio);
        Self {
            start: scale(self.start),
            control1: scale(self.control1),
            control2: scale(self.control2),
            end: scale(self.end),
        }
    }

    fn points(&self) -> [Pos2; 4] {
        [self.start, self.control1, self.control2, self.end]
    }

    /// True when all four points coincide, i.e. the curve is a single point
    pub fn is_degenerate(&self) -> bool {
        self.points()
            .iter()
            .all(|p| p.distance(self.start) < DEGENERATE_EPSILON)
    }

    /// Bounding box of the control polygon grown by `padding` on every side.
    /// The curve never leaves its control polygon's hull.
    pub fn bounds(&self, padding: f32) -> Rect {
        Rect::from_points(&self.points()).expand(padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::PointerSample;

    #[test]
    fn test_scale_ratio() {
        assert_eq!(scale_ratio(Vec2::new(1920.0, 1080.0), Vec2::new(960.0, 540.0)), 2.0);
        assert_eq!(scale_ratio(Vec2::new(1920.0, 1080.0), Vec2::ZERO), 1.0);
    }

    #[test]
    fn test_resting_segment_is_straight() {
        let segment = StrokeSegment::new(
            PointerSample::at_rest(Pos2::new(0.0, 0.0)),
            PointerSample::at_rest(Pos2::new(100.0, 0.0)),
        );
        let curve = CubicCurve::from_segment(&segment);
        // Zero velocity puts both handles on their endpoints
        assert_eq!(curve.control1, curve.start);
        assert_eq!(curve.control2, curve.end);
        assert!(!curve.is_degenerate());
    }

    #[test]
    fn test_tap_is_degenerate() {
        let curve = CubicCurve::from_segment(&StrokeSegment::dot(Pos2::new(4.0, 4.0)));
        assert!(curve.is_degenerate());
    }

    #[test]
    fn test_bounds_cover_padding() {
        let curve = CubicCurve::from_segment(&StrokeSegment::dot(Pos2::new(10.0, 10.0)))
            .scaled(2.0);
        let bounds = curve.bounds(3.0);
        assert_eq!(bounds.min, Pos2::new(17.0, 17.0));
        assert_eq!(bounds.max, Pos2::new(23.0, 23.0));
    }
}
