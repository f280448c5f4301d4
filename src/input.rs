use egui::{Context, Pos2, Rect, Vec2};

/// Pointer input in canvas view space, as consumed by [`crate::Canvas`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown {
        position: Pos2,
    },
    PointerMove {
        position: Pos2,
        /// Points per second
        velocity: Vec2,
    },
    PointerUp,
    /// The gesture was interrupted; the stroke is still kept
    PointerCancel,
    Tap {
        position: Pos2,
    },
}

/// Turns raw egui pointer state into canvas [`InputEvent`]s.
///
/// Only the primary button is tracked, and only presses starting inside the
/// canvas rectangle begin a gesture.
#[derive(Debug, Default)]
pub struct InputHandler {
    canvas_rect: Option<Rect>,
    pressed: bool,
    last_position: Option<Pos2>,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the on-screen rectangle the canvas is shown in
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = Some(rect);
    }

    fn to_view(rect: Rect, pos: Pos2) -> Pos2 {
        (pos - rect.min).to_pos2()
    }

    /// Process raw egui input and generate our InputEvents
    pub fn process_input(&mut self, ctx: &Context) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let Some(rect) = self.canvas_rect else {
            return events;
        };

        ctx.input(|input| {
            let pointer = &input.pointer;

            if !self.pressed && pointer.primary_pressed() {
                if let Some(pos) = pointer.interact_pos().filter(|pos| rect.contains(*pos)) {
                    let position = Self::to_view(rect, pos);
                    events.push(InputEvent::PointerDown { position });
                    self.pressed = true;
                    self.last_position = Some(position);
                }
                return;
            }

            if !self.pressed {
                return;
            }

            if let Some(pos) = pointer.interact_pos() {
                let position = Self::to_view(rect, pos);
                if Some(position) != self.last_position {
                    events.push(InputEvent::PointerMove {
                        position,
                        velocity: pointer.velocity(),
                    });
                    self.last_position = Some(position);
                }
            }

            if pointer.primary_released() {
                events.push(InputEvent::PointerUp);
                self.pressed = false;
                self.last_position = None;
            } else if !pointer.primary_down() {
                // Button state lost without a release, e.g. focus change
                events.push(InputEvent::PointerCancel);
                self.pressed = false;
                self.last_position = None;
            }
        });

        events
    }
}
