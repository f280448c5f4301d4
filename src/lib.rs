#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod bitmap;
pub mod brush;
pub mod canvas;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod geometry;
pub mod history;
pub mod input;
pub mod palette;
pub mod renderer;
pub mod store;
pub mod stroke;

pub use app::SketchApp;
pub use bitmap::{Bitmap, BitmapRef};
pub use brush::{Brush, ConfigurationProvider, StrokeType};
pub use canvas::{Canvas, DisplayUpdate};
pub use config::CanvasConfig;
pub use error::{CanvasError, CanvasResult, ConfigError, ExportError};
pub use event::{CanvasEvent, EventBus, EventHandler};
pub use history::{History, UndoEntry};
pub use input::{InputEvent, InputHandler};
pub use renderer::{StrokeContext, StrokeRenderer};
pub use store::UndoableBitmapStore;
pub use stroke::{BrushConfiguration, CapStyle, PointerSample, StrokeSegment};
