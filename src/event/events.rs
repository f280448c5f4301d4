/// Notifications emitted by the canvas core, in the order things happen
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// The committed bitmap was replaced
    Changed {
        /// Name of the action that caused the change, if it has one
        action: Option<String>,
        can_undo: bool,
        can_redo: bool,
    },
    StrokeStarted,
    StrokeFinished,
    /// An in-flight stroke was dropped without touching the canvas
    StrokeAbandoned {
        reason: String,
    },
    Saved {
        bitmap_id: usize,
    },
    Cancelled,
}

impl CanvasEvent {
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}
