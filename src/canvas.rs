use egui::{Color32, Pos2, Rect, Vec2};
use image::RgbaImage;
use std::sync::Arc;

use crate::bitmap::{Bitmap, BitmapRef};
use crate::brush::{Brush, ConfigurationProvider};
use crate::config::CanvasConfig;
use crate::error::CanvasResult;
use crate::event::{CanvasEvent, EventBus};
use crate::input::InputEvent;
use crate::renderer::{StrokeContext, StrokeRenderer};
use crate::stroke::{CapStyle, PointerSample, StrokeSegment};
use crate::store::UndoableBitmapStore;

/// Action name recorded for a stroke or tap
pub const DRAW_LINE_ACTION: &str = "Draw Line";
/// Action name recorded for clearing the canvas
pub const CLEAR_ACTION: &str = "Clear";

/// What the host has to re-upload to show `display_image` again
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayUpdate {
    /// The whole image may have changed
    Full,
    /// Only this bitmap-space region changed
    Region(Rect),
}

#[derive(Debug)]
struct ActiveStroke {
    context: StrokeContext,
    last_sample: PointerSample,
}

#[derive(Debug)]
enum GestureState {
    Idle,
    Drawing(Box<ActiveStroke>),
}

/// The sketching surface: brush, stroke renderer and undoable bitmap.
///
/// Pointer samples arrive one at a time; a press opens a stroke, moves draw
/// segments onto a live preview, and the release commits the whole stroke as
/// a single undo entry.
pub struct Canvas {
    store: UndoableBitmapStore,
    renderer: StrokeRenderer,
    brush: Brush,
    provider: Option<Box<dyn ConfigurationProvider + Send>>,
    state: GestureState,
    /// Changes to `display_image` the host has not picked up yet
    pending_update: Option<DisplayUpdate>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("store", &self.store)
            .field("renderer", &self.renderer)
            .field("brush", &self.brush)
            .field("has_provider", &self.provider.is_some())
            .field("state", &self.state)
            .field("pending_update", &self.pending_update)
            .finish()
    }
}

impl Canvas {
    pub fn new(config: &CanvasConfig) -> CanvasResult<Self> {
        let store = UndoableBitmapStore::from_config(config)?;
        let renderer = StrokeRenderer::new(config.width(), config.height(), config.background);
        let brush = Brush::new(config.pen, config.eraser_width, config.background);
        Ok(Self {
            store,
            renderer,
            brush,
            provider: None,
            state: GestureState::Idle,
            pending_update: Some(DisplayUpdate::Full),
        })
    }

    /// Creates a canvas that starts out showing `image`
    pub fn with_image(config: &CanvasConfig, image: &RgbaImage) -> CanvasResult<Self> {
        let mut canvas = Self::new(config)?;
        canvas.set_initial_image(image)?;
        Ok(canvas)
    }

    pub fn events(&self) -> &EventBus {
        self.store.events()
    }

    pub fn store(&self) -> &UndoableBitmapStore {
        &self.store
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Replaces the pen/eraser settings, e.g. with ones restored from storage
    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    /// Size of the view pointer positions are measured in
    pub fn set_view_size(&mut self, view_size: Vec2) {
        self.renderer.set_view_size(view_size);
    }

    pub fn view_size(&self) -> Vec2 {
        self.renderer.view_size()
    }

    pub fn bitmap_size(&self) -> Vec2 {
        self.renderer.bitmap_size()
    }

    /// Lets the host supply brush settings instead of the built-in pen/eraser
    pub fn set_configuration_provider(&mut self, provider: Box<dyn ConfigurationProvider + Send>) {
        self.provider = Some(provider);
    }

    // Brush settings only affect strokes that start afterwards

    pub fn set_brush_color(&mut self, color: Color32) {
        self.brush.set_color(color);
    }

    pub fn set_brush_width(&mut self, width: f32) {
        self.brush.set_width(width);
    }

    pub fn set_brush_opacity(&mut self, opacity: f32) {
        self.brush.set_opacity(opacity);
    }

    pub fn set_cap_style(&mut self, cap_style: CapStyle) {
        self.brush.set_cap_style(cap_style);
    }

    pub fn set_eraser_mode(&mut self, enabled: bool) {
        self.brush.set_eraser_mode(enabled);
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, GestureState::Drawing(_))
    }

    /// Dispatches a host input event to the matching handler
    pub fn handle_input(&mut self, event: InputEvent) -> CanvasResult<()> {
        match event {
            InputEvent::PointerDown { position } => self.on_pointer_down(position)?,
            InputEvent::PointerMove { position, velocity } => {
                self.on_pointer_move(position, velocity)
            }
            InputEvent::PointerUp => self.on_pointer_up(),
            InputEvent::PointerCancel => self.on_pointer_cancel(),
            InputEvent::Tap { position } => self.on_tap(position)?,
        }
        Ok(())
    }

    /// Starts a stroke at `position`.
    ///
    /// A press while another stroke is active is ignored. If the scratch raster
    /// cannot be allocated the stroke is abandoned and the error returned; the
    /// canvas is left as it was.
    pub fn on_pointer_down(&mut self, position: Pos2) -> CanvasResult<()> {
        if self.is_drawing() {
            log::debug!("Ignoring second pointer at {:?}", position);
            return Ok(());
        }

        let config = match &self.provider {
            Some(provider) => provider.configuration(),
            None => self.brush.configuration(),
        };
        let context = match self.renderer.begin_stroke(config, Some(self.store.current().as_ref())) {
            Ok(context) => context,
            Err(err) => {
                log::warn!("Abandoning stroke: {}", err);
                self.store.events().emit(CanvasEvent::StrokeAbandoned {
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        self.store.begin_group(DRAW_LINE_ACTION);
        self.state = GestureState::Drawing(Box::new(ActiveStroke {
            context,
            last_sample: PointerSample::at_rest(position),
        }));
        self.store.events().emit(CanvasEvent::StrokeStarted);
        Ok(())
    }

    /// Extends the active stroke to `position`; ignored when idle
    pub fn on_pointer_move(&mut self, position: Pos2, velocity: Vec2) {
        let GestureState::Drawing(active) = &mut self.state else {
            return;
        };
        let sample = PointerSample::new(position, velocity);
        let segment = StrokeSegment::new(active.last_sample, sample);
        let dirty = self.renderer.extend_stroke(&mut active.context, &segment);
        active.last_sample = sample;
        self.invalidate_region(dirty);
    }

    /// Commits the active stroke as one undo entry.
    ///
    /// A press that never moved is drawn as a dot.
    pub fn on_pointer_up(&mut self) {
        self.finish_stroke();
    }

    /// An interrupted gesture keeps what was drawn so far
    pub fn on_pointer_cancel(&mut self) {
        self.finish_stroke();
    }

    /// Draws a dot at `position` as its own undoable action
    pub fn on_tap(&mut self, position: Pos2) -> CanvasResult<()> {
        if self.is_drawing() {
            log::debug!("Ignoring tap at {:?} during a stroke", position);
            return Ok(());
        }
        self.on_pointer_down(position)?;
        self.on_pointer_up();
        Ok(())
    }

    fn finish_stroke(&mut self) {
        let GestureState::Drawing(active) = std::mem::replace(&mut self.state, GestureState::Idle)
        else {
            return;
        };
        let ActiveStroke {
            mut context,
            last_sample,
        } = *active;

        if context.segment_count() == 0 {
            let dirty = self
                .renderer
                .extend_stroke(&mut context, &StrokeSegment::dot(last_sample.position));
            self.invalidate_region(dirty);
        }
        let bitmap = self.renderer.end_stroke(context);
        match self.store.end_group(Arc::new(bitmap)) {
            Ok(_) => self.store.events().emit(CanvasEvent::StrokeFinished),
            Err(err) => {
                log::error!("Stroke could not be committed: {}", err);
                self.invalidate();
                self.store.events().emit(CanvasEvent::StrokeAbandoned {
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Drops the active stroke without recording it
    fn abandon_stroke(&mut self, reason: &str) {
        if let GestureState::Drawing(active) = std::mem::replace(&mut self.state, GestureState::Idle)
        {
            self.renderer.abandon(active.context);
            self.store.cancel_group();
            self.invalidate();
            log::debug!("Stroke abandoned: {}", reason);
            self.store.events().emit(CanvasEvent::StrokeAbandoned {
                reason: reason.to_owned(),
            });
        }
    }

    pub fn undo(&mut self) -> bool {
        self.finish_stroke();
        let changed = self.store.undo();
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.finish_stroke();
        let changed = self.store.redo();
        if changed {
            self.invalidate();
        }
        changed
    }

    /// Blanks the canvas as an undoable action
    pub fn clear(&mut self) -> CanvasResult<()> {
        self.finish_stroke();
        self.store.clear(CLEAR_ACTION)?;
        self.invalidate();
        Ok(())
    }

    /// Hands the finished image to the host
    pub fn save(&mut self) -> BitmapRef {
        self.finish_stroke();
        let bitmap = self.store.current().clone();
        log::info!("Saving bitmap {}", bitmap.id());
        self.store
            .events()
            .emit(CanvasEvent::Saved { bitmap_id: bitmap.id() });
        bitmap
    }

    /// Gives up on the session; any stroke in flight is discarded
    pub fn cancel(&mut self) {
        self.abandon_stroke("cancelled");
        self.store.events().emit(CanvasEvent::Cancelled);
    }

    /// Loads a starting image; fails while a stroke is in progress
    pub fn set_initial_image(&mut self, image: &RgbaImage) -> CanvasResult<()> {
        self.store.set_initial_image(image)?;
        self.invalidate();
        Ok(())
    }

    /// The committed image, never a half-drawn stroke
    pub fn current_image(&self) -> &BitmapRef {
        self.store.current()
    }

    /// What to show on screen: the live stroke while drawing
    pub fn display_image(&self) -> &Bitmap {
        match &self.state {
            GestureState::Drawing(active) => active.context.preview(),
            GestureState::Idle => self.store.current().as_ref(),
        }
    }

    /// Hands out, and forgets, what changed on screen since the last call.
    ///
    /// A region is only meaningful to a host that applied every earlier
    /// update; the first call after construction always reports `Full`.
    pub fn take_display_update(&mut self) -> Option<DisplayUpdate> {
        self.pending_update.take()
    }

    fn invalidate(&mut self) {
        self.pending_update = Some(DisplayUpdate::Full);
    }

    fn invalidate_region(&mut self, region: Rect) {
        self.pending_update = Some(match self.pending_update {
            Some(DisplayUpdate::Full) => DisplayUpdate::Full,
            Some(DisplayUpdate::Region(previous)) => DisplayUpdate::Region(previous.union(region)),
            None => DisplayUpdate::Region(region),
        });
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    /// Saving only makes sense once something was drawn
    pub fn can_save(&self) -> bool {
        self.store.can_undo()
    }

    pub fn undo_action_name(&self) -> Option<&str> {
        self.store.undo_action_name()
    }

    pub fn redo_action_name(&self) -> Option<&str> {
        self.store.redo_action_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Canvas {
        let config = CanvasConfig {
            preferred_size: [100, 100],
            ..Default::default()
        };
        Canvas::new(&config).unwrap()
    }

    #[test]
    fn test_second_pointer_ignored() {
        let mut canvas = canvas();
        canvas.on_pointer_down(Pos2::new(10.0, 10.0)).unwrap();
        canvas.on_pointer_move(Pos2::new(20.0, 10.0), Vec2::new(100.0, 0.0));
        canvas.on_pointer_down(Pos2::new(80.0, 80.0)).unwrap();
        canvas.on_pointer_up();

        assert_eq!(canvas.store().history().undo_len(), 1);
        assert_eq!(canvas.current_image().pixel(80, 80), Some(Color32::WHITE));
    }

    #[test]
    fn test_preview_is_not_committed() {
        let mut canvas = canvas();
        canvas.on_pointer_down(Pos2::new(10.0, 50.0)).unwrap();
        canvas.on_pointer_move(Pos2::new(90.0, 50.0), Vec2::ZERO);

        assert_eq!(canvas.display_image().pixel(50, 50), Some(Color32::BLACK));
        assert_eq!(canvas.current_image().pixel(50, 50), Some(Color32::WHITE));
        assert!(!canvas.can_undo());

        canvas.on_pointer_up();
        assert_eq!(canvas.current_image().pixel(50, 50), Some(Color32::BLACK));
    }

    #[test]
    fn test_press_without_move_draws_dot() {
        let mut canvas = canvas();
        canvas.on_pointer_down(Pos2::new(30.0, 30.0)).unwrap();
        canvas.on_pointer_up();
        assert_eq!(canvas.current_image().pixel(30, 30), Some(Color32::BLACK));
        assert_eq!(canvas.undo_action_name(), Some(DRAW_LINE_ACTION));
    }

    #[test]
    fn test_brush_change_mid_stroke_waits() {
        let mut canvas = canvas();
        canvas.on_pointer_down(Pos2::new(10.0, 20.0)).unwrap();
        canvas.set_brush_color(Color32::RED);
        canvas.on_pointer_move(Pos2::new(90.0, 20.0), Vec2::ZERO);
        canvas.on_pointer_up();
        assert_eq!(canvas.current_image().pixel(50, 20), Some(Color32::BLACK));

        canvas.on_tap(Pos2::new(50.0, 70.0)).unwrap();
        assert_eq!(canvas.current_image().pixel(50, 70), Some(Color32::RED));
    }

    #[test]
    fn test_configuration_provider_overrides_brush() {
        let mut canvas = canvas();
        canvas.set_configuration_provider(Box::new(crate::stroke::BrushConfiguration {
            color: Color32::BLUE,
            line_width: 8.0,
            ..Default::default()
        }));
        canvas.on_tap(Pos2::new(50.0, 50.0)).unwrap();
        assert_eq!(canvas.current_image().pixel(50, 50), Some(Color32::BLUE));
    }

    #[test]
    fn test_display_updates_follow_changes() {
        let mut canvas = canvas();
        assert_eq!(canvas.take_display_update(), Some(DisplayUpdate::Full));
        assert_eq!(canvas.take_display_update(), None);

        canvas.on_pointer_down(Pos2::new(10.0, 10.0)).unwrap();
        assert_eq!(canvas.take_display_update(), None);
        canvas.on_pointer_move(Pos2::new(20.0, 10.0), Vec2::ZERO);
        canvas.on_pointer_move(Pos2::new(30.0, 10.0), Vec2::ZERO);
        let Some(DisplayUpdate::Region(region)) = canvas.take_display_update() else {
            panic!("expected a region update while drawing");
        };
        assert!(region.contains(Pos2::new(10.0, 10.0)));
        assert!(region.contains(Pos2::new(30.0, 10.0)));
        assert!(!region.contains(Pos2::new(80.0, 80.0)));

        // Committing shows the same pixels as the preview
        canvas.on_pointer_up();
        assert_eq!(canvas.take_display_update(), None);

        canvas.undo();
        assert_eq!(canvas.take_display_update(), Some(DisplayUpdate::Full));
        canvas.undo();
        assert_eq!(canvas.take_display_update(), None);
    }

    #[test]
    fn test_failed_allocation_leaves_canvas_idle() {
        let mut canvas = canvas();
        let mut receiver = canvas.events().subscribe_channel();
        canvas.renderer = StrokeRenderer::new(0, 0, Color32::WHITE);

        let result = canvas.on_pointer_down(Pos2::new(10.0, 10.0));
        assert!(matches!(
            result,
            Err(crate::error::CanvasError::ResourceExhausted { .. })
        ));
        assert!(!canvas.is_drawing());
        assert!(!canvas.store().is_grouping());
        assert!(!canvas.can_undo());
        assert!(matches!(
            receiver.try_next().unwrap(),
            Some(CanvasEvent::StrokeAbandoned { .. })
        ));

        canvas.on_pointer_up();
        assert!(!canvas.can_undo());
    }
}
