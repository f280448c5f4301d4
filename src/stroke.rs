use egui::{Color32, Pos2, Vec2};
use serde::{Deserialize, Serialize};

/// Divisor turning a pointer velocity into a Bézier handle length.
/// Typical pointer speeds (a few hundred points per second) give handles of a
/// couple of points, which keeps the curve gently bent between samples.
pub const SMOOTHING_RATIO: f32 = 250.0;

/// One pointer-move sample in view space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: Pos2,
    /// Points per second; zero for discrete taps
    pub velocity: Vec2,
}

impl PointerSample {
    pub fn new(position: Pos2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }

    /// A sample without motion, as produced by a tap
    pub fn at_rest(position: Pos2) -> Self {
        Self::new(position, Vec2::ZERO)
    }

    /// Length of the tangent handle derived from this sample's speed
    pub fn handle_length(&self) -> f32 {
        self.velocity.length() / SMOOTHING_RATIO
    }

    /// Point reached by walking `handle_length` along the direction of motion.
    /// A negative length walks backwards.
    pub fn control_point(&self, handle_length: f32) -> Pos2 {
        let direction = Vec2::angled(self.velocity.angle());
        self.position + direction * handle_length
    }
}

/// Ordered pair of samples; the smallest unit the renderer draws
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeSegment {
    pub start: PointerSample,
    pub end: PointerSample,
}

impl StrokeSegment {
    pub fn new(start: PointerSample, end: PointerSample) -> Self {
        Self { start, end }
    }

    /// Zero-length segment used to render a tap as a dot
    pub fn dot(position: Pos2) -> Self {
        let sample = PointerSample::at_rest(position);
        Self::new(sample, sample)
    }

    /// Bézier control points `(control1, control2)` in view space.
    ///
    /// The first handle leaves `start` along its velocity; the second is
    /// flipped so the curve arrives at `end` along the end velocity.
    pub fn control_points(&self) -> (Pos2, Pos2) {
        let control1 = self.start.control_point(self.start.handle_length());
        let control2 = self.end.control_point(-self.end.handle_length());
        (control1, control2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapStyle {
    Butt,
    Round,
    Square,
}

impl From<CapStyle> for tiny_skia::LineCap {
    fn from(cap: CapStyle) -> Self {
        match cap {
            CapStyle::Butt => tiny_skia::LineCap::Butt,
            CapStyle::Round => tiny_skia::LineCap::Round,
            CapStyle::Square => tiny_skia::LineCap::Square,
        }
    }
}

/// Immutable brush snapshot shared by every segment of one stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfiguration {
    pub cap_style: CapStyle,
    pub color: Color32,
    /// In `[0, 1]`, multiplied into the colour's alpha
    pub opacity: f32,
    /// View-space width, always positive
    pub line_width: f32,
}

impl Default for BrushConfiguration {
    fn default() -> Self {
        Self {
            cap_style: CapStyle::Round,
            color: Color32::BLACK,
            opacity: 1.0,
            line_width: 5.0,
        }
    }
}

impl BrushConfiguration {
    /// Smallest width a brush can be set to
    pub const MIN_LINE_WIDTH: f32 = 0.1;

    /// Returns a copy with opacity and width forced into their valid ranges
    pub fn sanitized(mut self) -> Self {
        self.opacity = if self.opacity.is_finite() {
            self.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if !self.line_width.is_finite() || self.line_width < Self::MIN_LINE_WIDTH {
            self.line_width = Self::MIN_LINE_WIDTH;
        }
        self
    }

    /// Paint colour with opacity folded into the alpha channel
    pub fn paint_color(&self) -> tiny_skia::Color {
        let [r, g, b, a] = self.color.to_srgba_unmultiplied();
        let alpha = (a as f32 * self.opacity.clamp(0.0, 1.0)).round() as u8;
        tiny_skia::Color::from_rgba8(r, g, b, alpha)
    }
}
