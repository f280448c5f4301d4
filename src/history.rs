use std::collections::VecDeque;

use crate::bitmap::BitmapRef;

/// Default number of actions that can be undone
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// One undoable action: the bitmap to go back to and the action's name
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub previous_bitmap: BitmapRef,
    pub action_name: Option<String>,
}

impl UndoEntry {
    pub fn new(previous_bitmap: BitmapRef, action_name: Option<String>) -> Self {
        Self {
            previous_bitmap,
            action_name,
        }
    }
}

/// Bounded pair of undo/redo stacks.
///
/// The top of each stack is the back of its deque; when a stack grows past
/// `depth` the oldest entry is dropped from the front.
#[derive(Debug, Clone)]
pub struct History {
    /// Stack of entries that can be undone
    undo_stack: VecDeque<UndoEntry>,
    /// Stack of entries that can be redone
    redo_stack: VecDeque<UndoEntry>,
    depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl History {
    /// Creates an empty history keeping at most `depth` entries (at least one)
    pub fn new(depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            depth: depth.max(1),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Records a freshly committed action, invalidating everything redoable
    pub fn record(&mut self, entry: UndoEntry) {
        Self::push_bounded(&mut self.undo_stack, entry, self.depth);
        self.redo_stack.clear();
    }

    pub fn pop_undo(&mut self) -> Option<UndoEntry> {
        self.undo_stack.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<UndoEntry> {
        self.redo_stack.pop_back()
    }

    /// Pushes the reciprocal of an undone action
    pub fn push_redo(&mut self, entry: UndoEntry) {
        Self::push_bounded(&mut self.redo_stack, entry, self.depth);
    }

    /// Pushes the reciprocal of a redone action, keeping the redo stack
    pub fn push_undo(&mut self, entry: UndoEntry) {
        Self::push_bounded(&mut self.undo_stack, entry, self.depth);
    }

    fn push_bounded(stack: &mut VecDeque<UndoEntry>, entry: UndoEntry, depth: usize) {
        stack.push_back(entry);
        while stack.len() > depth {
            if let Some(evicted) = stack.pop_front() {
                log::debug!(
                    "History full, dropping oldest entry {:?}",
                    evicted.action_name
                );
            }
        }
    }

    /// Returns true if there are entries that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are entries that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn undo_action_name(&self) -> Option<&str> {
        self.undo_stack.back()?.action_name.as_deref()
    }

    pub fn redo_action_name(&self) -> Option<&str> {
        self.redo_stack.back()?.action_name.as_deref()
    }

    /// Forget every entry
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
