use egui::Color32;
use image::RgbaImage;
use std::sync::Arc;

use crate::bitmap::{Bitmap, BitmapRef};
use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::event::{CanvasEvent, EventBus};
use crate::history::{History, UndoEntry};

/// Owner of the canonical bitmap and its undo history.
///
/// Every visible change goes through [`Self::replace`] (directly or via a
/// group), records exactly one undo entry and notifies subscribers.
#[derive(Debug)]
pub struct UndoableBitmapStore {
    current: BitmapRef,
    /// Fixed for the store's lifetime
    width: u32,
    height: u32,
    history: History,
    /// Name of the open drawing group, if any
    group: Option<String>,
    background: Color32,
    events: EventBus,
}

impl UndoableBitmapStore {
    /// Creates a store holding a blank `width`x`height` bitmap
    pub fn new(width: u32, height: u32, background: Color32, depth: usize) -> CanvasResult<Self> {
        let current = Arc::new(Bitmap::blank(width, height, background)?);
        Ok(Self {
            current,
            width,
            height,
            history: History::new(depth),
            group: None,
            background,
            events: EventBus::new(),
        })
    }

    pub fn from_config(config: &CanvasConfig) -> CanvasResult<Self> {
        Self::new(
            config.width(),
            config.height(),
            config.background,
            config.history_depth,
        )
    }

    /// The committed bitmap; never an in-progress stroke
    pub fn current(&self) -> &BitmapRef {
        &self.current
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_action_name(&self) -> Option<&str> {
        self.history.undo_action_name()
    }

    pub fn redo_action_name(&self) -> Option<&str> {
        self.history.redo_action_name()
    }

    fn notify(&self, action: Option<String>) {
        self.events.emit(CanvasEvent::Changed {
            action,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        });
    }

    /// Swaps in `bitmap` as one undoable action and drops the redo history.
    ///
    /// The bitmap must match the store's size; anything else is rejected and
    /// leaves the store untouched.
    pub fn replace(&mut self, bitmap: BitmapRef, action_name: Option<&str>) -> CanvasResult<()> {
        if bitmap.width() != self.width || bitmap.height() != self.height {
            return Err(CanvasError::InvalidImage(format!(
                "expected {}x{} bitmap, got {}x{}",
                self.width,
                self.height,
                bitmap.width(),
                bitmap.height()
            )));
        }
        let action_name = action_name.map(str::to_owned);
        let previous = std::mem::replace(&mut self.current, bitmap);
        log::debug!(
            "Replaced bitmap {} with {} ({:?})",
            previous.id(),
            self.current.id(),
            action_name
        );
        self.history
            .record(UndoEntry::new(previous, action_name.clone()));
        self.notify(action_name);
        Ok(())
    }

    /// Opens a group collecting one gesture's worth of drawing.
    ///
    /// Returns false, leaving the open group untouched, if one is already open.
    pub fn begin_group(&mut self, action_name: &str) -> bool {
        if let Some(open) = &self.group {
            log::warn!("Ignoring group {:?}: {:?} is still open", action_name, open);
            return false;
        }
        self.group = Some(action_name.to_owned());
        true
    }

    pub fn is_grouping(&self) -> bool {
        self.group.is_some()
    }

    /// Closes the open group by committing its final bitmap as one action.
    ///
    /// Returns false when no group was open; nothing is committed then. The
    /// group is closed even if the bitmap is rejected.
    pub fn end_group(&mut self, bitmap: BitmapRef) -> CanvasResult<bool> {
        match self.group.take() {
            Some(action_name) => {
                self.replace(bitmap, Some(&action_name))?;
                Ok(true)
            }
            None => {
                log::warn!("end_group called without an open group");
                Ok(false)
            }
        }
    }

    /// Closes the open group without recording anything
    pub fn cancel_group(&mut self) {
        if let Some(action_name) = self.group.take() {
            log::debug!("Group {:?} cancelled", action_name);
        }
    }

    /// Steps back one action. Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.pop_undo() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, entry.previous_bitmap);
        self.history
            .push_redo(UndoEntry::new(current, entry.action_name.clone()));
        log::debug!("Undo {:?}", entry.action_name);
        self.notify(entry.action_name);
        true
    }

    /// Re-applies the last undone action. Returns false when there was none.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.pop_redo() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, entry.previous_bitmap);
        self.history
            .push_undo(UndoEntry::new(current, entry.action_name.clone()));
        log::debug!("Redo {:?}", entry.action_name);
        self.notify(entry.action_name);
        true
    }

    /// Replaces the bitmap with a blank one, undoably
    pub fn clear(&mut self, action_name: &str) -> CanvasResult<()> {
        let blank = Bitmap::blank(self.width(), self.height(), self.background)?;
        self.replace(Arc::new(blank), Some(action_name))
    }

    /// Loads a starting image without recording an undo entry.
    ///
    /// The image is fitted to the store's fixed size and the history starts
    /// over. Subscribers hear about it once, with no action name.
    pub fn set_initial_image(&mut self, image: &RgbaImage) -> CanvasResult<()> {
        if self.is_grouping() {
            return Err(CanvasError::StrokeInProgress);
        }
        let bitmap = Bitmap::from_rgba_image(image, self.width(), self.height(), self.background)?;
        self.current = Arc::new(bitmap);
        self.history.clear();
        log::info!(
            "Initial image set ({}x{} source)",
            image.width(),
            image.height()
        );
        self.notify(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UndoableBitmapStore {
        UndoableBitmapStore::new(4, 4, Color32::WHITE, 10).unwrap()
    }

    fn filled(color: Color32) -> BitmapRef {
        Arc::new(Bitmap::blank(4, 4, color).unwrap())
    }

    #[test]
    fn test_replace_then_undo_restores() {
        let mut store = store();
        let original = store.current().clone();
        store.replace(filled(Color32::RED), Some("Paint")).unwrap();

        assert!(store.can_undo());
        assert_eq!(store.undo_action_name(), Some("Paint"));
        assert!(store.undo());
        assert!(Arc::ptr_eq(store.current(), &original));
        assert_eq!(store.redo_action_name(), Some("Paint"));
    }

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let mut store = store();
        let before = store.current().id();
        assert!(!store.undo());
        assert!(!store.redo());
        assert_eq!(store.current().id(), before);
    }

    #[test]
    fn test_group_commits_once() {
        let mut store = store();
        assert!(store.begin_group("Draw Line"));
        assert!(!store.begin_group("Other"));
        assert!(store.end_group(filled(Color32::BLUE)).unwrap());
        assert!(!store.end_group(filled(Color32::BLUE)).unwrap());

        assert_eq!(store.history().undo_len(), 1);
        assert_eq!(store.undo_action_name(), Some("Draw Line"));
    }

    #[test]
    fn test_wrong_sized_bitmap_rejected() {
        let mut store = store();
        let before = store.current().id();
        let small = Arc::new(Bitmap::blank(7, 3, Color32::RED).unwrap());

        assert!(matches!(
            store.replace(small.clone(), Some("Paint")),
            Err(CanvasError::InvalidImage(_))
        ));
        assert_eq!(store.current().id(), before);
        assert!(!store.can_undo());

        store.clear("Clear").unwrap();
        assert_eq!((store.width(), store.height()), (4, 4));
        assert_eq!(store.current().size(), egui::Vec2::new(4.0, 4.0));

        store.begin_group("Draw Line");
        assert!(store.end_group(small).is_err());
        assert!(!store.is_grouping());
        assert_eq!(store.history().undo_len(), 1);
    }

    #[test]
    fn test_cancel_group_records_nothing() {
        let mut store = store();
        store.begin_group("Draw Line");
        store.cancel_group();
        assert!(!store.is_grouping());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_clear_is_undoable() {
        let mut store = store();
        store.replace(filled(Color32::RED), Some("Paint")).unwrap();
        store.clear("Clear").unwrap();
        assert_eq!(store.current().pixel(0, 0), Some(Color32::WHITE));

        store.undo();
        assert_eq!(store.current().pixel(0, 0), Some(Color32::RED));
    }

    #[test]
    fn test_initial_image_bypasses_history() {
        let mut store = store();
        store.replace(filled(Color32::RED), Some("Paint")).unwrap();
        let image = RgbaImage::from_pixel(4, 4, image::Rgba([0, 255, 0, 255]));
        store.set_initial_image(&image).unwrap();

        assert!(!store.can_undo());
        assert_eq!(store.current().pixel(2, 2), Some(Color32::from_rgb(0, 255, 0)));
    }

    #[test]
    fn test_initial_image_rejected_mid_group() {
        let mut store = store();
        store.begin_group("Draw Line");
        let image = RgbaImage::new(4, 4);
        assert!(matches!(
            store.set_initial_image(&image),
            Err(CanvasError::StrokeInProgress)
        ));
    }

    #[test]
    fn test_changes_are_announced_in_order() {
        let mut store = store();
        let mut receiver = store.events().subscribe_channel();
        store.replace(filled(Color32::RED), Some("Paint")).unwrap();
        store.undo();

        let first = receiver.try_next().unwrap().unwrap();
        let second = receiver.try_next().unwrap().unwrap();
        assert_eq!(
            first,
            CanvasEvent::Changed {
                action: Some("Paint".to_string()),
                can_undo: true,
                can_redo: false,
            }
        );
        assert_eq!(
            second,
            CanvasEvent::Changed {
                action: Some("Paint".to_string()),
                can_undo: false,
                can_redo: true,
            }
        );
    }
}
