use egui::{Color32, Pos2, Rect, Vec2};
use tiny_skia::{FillRule, LineJoin, Paint, PathBuilder, PixmapPaint, Stroke, Transform};

use crate::bitmap::{self, Bitmap};
use crate::error::CanvasResult;
use crate::geometry::{CubicCurve, scale_ratio};
use crate::stroke::{BrushConfiguration, CapStyle, StrokeSegment};

/// Turns stroke segments into pixels on a bitmap-sized scratch raster
#[derive(Debug, Clone)]
pub struct StrokeRenderer {
    width: u32,
    height: u32,
    view_size: Vec2,
    background: Color32,
}

/// State of one in-flight stroke.
///
/// Holds the brush snapshot taken when the stroke began and the scratch
/// raster every segment is composited onto.
#[derive(Debug)]
pub struct StrokeContext {
    config: BrushConfiguration,
    ratio: f32,
    scratch: Bitmap,
    segments: usize,
}

impl StrokeContext {
    pub fn config(&self) -> &BrushConfiguration {
        &self.config
    }

    /// The raster as drawn so far, for live display only
    pub fn preview(&self) -> &Bitmap {
        &self.scratch
    }

    /// Number of segments drawn since the stroke began
    pub fn segment_count(&self) -> usize {
        self.segments
    }
}

impl StrokeRenderer {
    /// Creates a renderer whose view initially matches the bitmap one to one
    pub fn new(width: u32, height: u32, background: Color32) -> Self {
        Self {
            width,
            height,
            view_size: Vec2::new(width as f32, height as f32),
            background,
        }
    }

    pub fn bitmap_size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn view_size(&self) -> Vec2 {
        self.view_size
    }

    /// Updates the size of the view the pointer samples are measured in
    pub fn set_view_size(&mut self, view_size: Vec2) {
        self.view_size = view_size;
    }

    /// View-to-bitmap scale factor
    pub fn ratio(&self) -> f32 {
        scale_ratio(self.bitmap_size(), self.view_size)
    }

    /// Starts a stroke on top of `base`, or on a blank background.
    ///
    /// Fails only when the scratch raster cannot be allocated.
    pub fn begin_stroke(
        &self,
        config: BrushConfiguration,
        base: Option<&Bitmap>,
    ) -> CanvasResult<StrokeContext> {
        let mut pixmap = bitmap::allocate(self.width, self.height)?;
        match base {
            Some(base) if base.width() == self.width && base.height() == self.height => {
                pixmap.data_mut().copy_from_slice(base.pixmap().data());
            }
            Some(base) => {
                pixmap.fill(bitmap::skia_color(self.background));
                let transform = Transform::from_scale(
                    self.width as f32 / base.width() as f32,
                    self.height as f32 / base.height() as f32,
                );
                pixmap.draw_pixmap(
                    0,
                    0,
                    base.pixmap().as_ref(),
                    &PixmapPaint::default(),
                    transform,
                    None,
                );
            }
            None => pixmap.fill(bitmap::skia_color(self.background)),
        }

        let config = config.sanitized();
        let ratio = self.ratio();
        log::debug!(
            "Stroke started: width {} color {:?} ratio {}",
            config.line_width,
            config.color,
            ratio
        );

        Ok(StrokeContext {
            config,
            ratio,
            scratch: Bitmap::from_pixmap(pixmap),
            segments: 0,
        })
    }

    /// Draws one segment and returns the bitmap-space region it touched
    pub fn extend_stroke(&self, ctx: &mut StrokeContext, segment: &StrokeSegment) -> Rect {
        let curve = CubicCurve::from_segment(segment).scaled(ctx.ratio);
        // Width is given in view units; keep it visually constant
        let width = ctx.config.line_width * ctx.ratio;

        let mut paint = Paint::default();
        paint.set_color(ctx.config.paint_color());
        paint.anti_alias = true;

        let pixmap = ctx.scratch.pixmap_mut();
        if curve.is_degenerate() {
            if let Some(path) = dot_path(curve.start, width, ctx.config.cap_style) {
                pixmap.fill_path(
                    &path,
                    &paint,
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
        } else {
            let mut builder = PathBuilder::new();
            builder.move_to(curve.start.x, curve.start.y);
            builder.cubic_to(
                curve.control1.x,
                curve.control1.y,
                curve.control2.x,
                curve.control2.y,
                curve.end.x,
                curve.end.y,
            );
            if let Some(path) = builder.finish() {
                let stroke = Stroke {
                    width,
                    line_cap: ctx.config.cap_style.into(),
                    // Joins are always round, whatever the cap
                    line_join: LineJoin::Round,
                    ..Stroke::default()
                };
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }
        }

        // Square caps reach out by half the diagonal
        let dirty = curve
            .bounds(width * std::f32::consts::FRAC_1_SQRT_2 + 1.0)
            .intersect(Rect::from_min_size(Pos2::ZERO, self.bitmap_size()));
        ctx.segments += 1;
        dirty
    }

    /// Finishes the stroke and hands back the fully composited raster
    pub fn end_stroke(&self, ctx: StrokeContext) -> Bitmap {
        log::debug!("Stroke finished after {} segments", ctx.segments);
        ctx.scratch
    }

    /// Throws the stroke away; nothing drawn so far survives
    pub fn abandon(&self, ctx: StrokeContext) {
        log::debug!("Stroke abandoned after {} segments", ctx.segments);
    }
}

/// Path of a tap mark: a square for square caps, a disc otherwise
fn dot_path(center: Pos2, diameter: f32, cap: CapStyle) -> Option<tiny_skia::Path> {
    let radius = diameter / 2.0;
    match cap {
        CapStyle::Square => {
            let rect = tiny_skia::Rect::from_xywh(
                center.x - radius,
                center.y - radius,
                diameter,
                diameter,
            )?;
            Some(PathBuilder::from_rect(rect))
        }
        CapStyle::Round | CapStyle::Butt => PathBuilder::from_circle(center.x, center.y, radius),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::PointerSample;

    fn is_white(color: Color32) -> bool {
        color == Color32::WHITE
    }

    fn is_dark(color: Color32) -> bool {
        color.r() < 64 && color.g() < 64 && color.b() < 64
    }

    fn draw(renderer: &StrokeRenderer, config: BrushConfiguration, segment: StrokeSegment) -> Bitmap {
        let mut ctx = renderer.begin_stroke(config, None).unwrap();
        renderer.extend_stroke(&mut ctx, &segment);
        renderer.end_stroke(ctx)
    }

    #[test]
    fn test_blank_base_is_white() {
        let renderer = StrokeRenderer::new(20, 20, Color32::WHITE);
        let ctx = renderer.begin_stroke(BrushConfiguration::default(), None).unwrap();
        assert!(is_white(ctx.preview().pixel(10, 10).unwrap()));
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        let renderer = StrokeRenderer::new(0, 0, Color32::WHITE);
        assert!(renderer
            .begin_stroke(BrushConfiguration::default(), None)
            .is_err());
    }

    #[test]
    fn test_tap_renders_dot() {
        let renderer = StrokeRenderer::new(100, 100, Color32::WHITE);
        let config = BrushConfiguration {
            line_width: 10.0,
            ..Default::default()
        };
        let bitmap = draw(&renderer, config, StrokeSegment::dot(Pos2::new(50.0, 50.0)));

        assert_eq!(bitmap.pixel(50, 50), Some(Color32::BLACK));
        assert!(is_dark(bitmap.pixel(52, 50).unwrap()));
        assert!(is_dark(bitmap.pixel(50, 47).unwrap()));
        assert!(is_white(bitmap.pixel(57, 50).unwrap()));
        assert!(is_white(bitmap.pixel(50, 42).unwrap()));
    }

    #[test]
    fn test_resting_samples_draw_straight_line() {
        let renderer = StrokeRenderer::new(200, 100, Color32::WHITE);
        let config = BrushConfiguration {
            line_width: 6.0,
            cap_style: CapStyle::Butt,
            ..Default::default()
        };
        let segment = StrokeSegment::new(
            PointerSample::at_rest(Pos2::new(20.0, 50.0)),
            PointerSample::at_rest(Pos2::new(120.0, 50.0)),
        );
        let bitmap = draw(&renderer, config, segment);

        for x in [25, 70, 115] {
            assert!(is_dark(bitmap.pixel(x, 50).unwrap()), "x = {x}");
            assert!(is_white(bitmap.pixel(x, 45).unwrap()), "x = {x}");
            assert!(is_white(bitmap.pixel(x, 55).unwrap()), "x = {x}");
        }
        // Butt caps stop at the endpoints
        assert!(is_white(bitmap.pixel(10, 50).unwrap()));
        assert!(is_white(bitmap.pixel(130, 50).unwrap()));
    }

    #[test]
    fn test_strokes_composite_over_base() {
        let renderer = StrokeRenderer::new(60, 60, Color32::WHITE);
        let red = BrushConfiguration {
            color: Color32::from_rgb(255, 0, 0),
            line_width: 4.0,
            ..Default::default()
        };
        let first = draw(&renderer, red, StrokeSegment::dot(Pos2::new(10.0, 10.0)));

        let mut ctx = renderer
            .begin_stroke(BrushConfiguration::default(), Some(&first))
            .unwrap();
        renderer.extend_stroke(&mut ctx, &StrokeSegment::dot(Pos2::new(40.0, 40.0)));
        let second = renderer.end_stroke(ctx);

        assert_eq!(second.pixel(10, 10), Some(Color32::from_rgb(255, 0, 0)));
        assert_eq!(second.pixel(40, 40), Some(Color32::BLACK));
        // The base itself is untouched
        assert!(is_white(first.pixel(40, 40).unwrap()));
    }

    #[test]
    fn test_view_scale_applies_to_position_and_width() {
        let mut renderer = StrokeRenderer::new(200, 200, Color32::WHITE);
        renderer.set_view_size(Vec2::new(100.0, 100.0));
        let config = BrushConfiguration {
            line_width: 4.0,
            ..Default::default()
        };
        let bitmap = draw(&renderer, config, StrokeSegment::dot(Pos2::new(50.0, 50.0)));

        // Centre lands at (100, 100) with an 8px diameter in bitmap space
        assert_eq!(bitmap.pixel(100, 100), Some(Color32::BLACK));
        assert!(is_dark(bitmap.pixel(102, 100).unwrap()));
        assert!(is_white(bitmap.pixel(50, 50).unwrap()));
        assert!(is_white(bitmap.pixel(107, 100).unwrap()));
    }

    #[test]
    fn test_dirty_rect_covers_segment() {
        let renderer = StrokeRenderer::new(100, 100, Color32::WHITE);
        let mut ctx = renderer.begin_stroke(BrushConfiguration::default(), None).unwrap();
        let first = renderer.extend_stroke(&mut ctx, &StrokeSegment::dot(Pos2::new(10.0, 10.0)));
        assert!(first.contains(Pos2::new(10.0, 10.0)));
        assert!(!first.contains(Pos2::new(50.0, 50.0)));

        let second = renderer.extend_stroke(&mut ctx, &StrokeSegment::dot(Pos2::new(98.0, 98.0)));
        assert!(second.contains(Pos2::new(98.0, 98.0)));
        // Clipped to the raster
        assert!(second.max.x <= 100.0 && second.max.y <= 100.0);
        assert_eq!(ctx.segment_count(), 2);
    }

    #[test]
    fn test_square_cap_tap_renders_square() {
        let renderer = StrokeRenderer::new(100, 100, Color32::WHITE);
        let square = BrushConfiguration {
            line_width: 20.0,
            cap_style: CapStyle::Square,
            ..Default::default()
        };
        let bitmap = draw(&renderer, square, StrokeSegment::dot(Pos2::new(50.0, 50.0)));
        // Corners of the 20px square are covered, just outside is not
        assert_eq!(bitmap.pixel(41, 41), Some(Color32::BLACK));
        assert_eq!(bitmap.pixel(58, 58), Some(Color32::BLACK));
        assert!(is_white(bitmap.pixel(62, 50).unwrap()));

        let round = BrushConfiguration {
            cap_style: CapStyle::Round,
            ..square
        };
        let bitmap = draw(&renderer, round, StrokeSegment::dot(Pos2::new(50.0, 50.0)));
        assert!(is_white(bitmap.pixel(58, 58).unwrap()));
    }

    #[test]
    fn test_half_opacity_blends() {
        let renderer = StrokeRenderer::new(40, 40, Color32::WHITE);
        let config = BrushConfiguration {
            opacity: 0.5,
            line_width: 10.0,
            ..Default::default()
        };
        let bitmap = draw(&renderer, config, StrokeSegment::dot(Pos2::new(20.0, 20.0)));
        let center = bitmap.pixel(20, 20).unwrap();
        assert!(center.r() > 100 && center.r() < 160, "got {center:?}");
    }
}
