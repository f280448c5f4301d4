use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::stroke::{BrushConfiguration, CapStyle};

/// Width of the eraser unless configured otherwise
pub const DEFAULT_ERASER_WIDTH: f32 = 20.0;

/// Anything that can hand out the brush to use for the next stroke
pub trait ConfigurationProvider {
    fn configuration(&self) -> BrushConfiguration;
}

impl ConfigurationProvider for BrushConfiguration {
    fn configuration(&self) -> BrushConfiguration {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokeType {
    Pen,
    Eraser,
}

/// The pen and its eraser counterpart.
///
/// The eraser paints with the background colour at a fixed width; only the
/// pen's settings can be changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Brush {
    /// Current pen settings
    pub pen: BrushConfiguration,
    pub stroke_type: StrokeType,
    pub eraser_width: f32,
    /// Colour the eraser paints with
    pub background: Color32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            pen: BrushConfiguration::default(),
            stroke_type: StrokeType::Pen,
            eraser_width: DEFAULT_ERASER_WIDTH,
            background: Color32::WHITE,
        }
    }
}

impl Brush {
    pub fn new(pen: BrushConfiguration, eraser_width: f32, background: Color32) -> Self {
        Self {
            pen: pen.sanitized(),
            stroke_type: StrokeType::Pen,
            eraser_width,
            background,
        }
    }

    pub fn set_color(&mut self, color: Color32) {
        self.pen.color = color;
    }

    pub fn set_width(&mut self, width: f32) {
        self.pen.line_width = width;
        self.pen = self.pen.sanitized();
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.pen.opacity = opacity;
        self.pen = self.pen.sanitized();
    }

    pub fn set_cap_style(&mut self, cap_style: CapStyle) {
        self.pen.cap_style = cap_style;
    }

    pub fn set_eraser_mode(&mut self, enabled: bool) {
        self.stroke_type = if enabled {
            StrokeType::Eraser
        } else {
            StrokeType::Pen
        };
    }

    pub fn is_eraser(&self) -> bool {
        self.stroke_type == StrokeType::Eraser
    }
}

impl ConfigurationProvider for Brush {
    fn configuration(&self) -> BrushConfiguration {
        match self.stroke_type {
            StrokeType::Pen => self.pen,
            StrokeType::Eraser => BrushConfiguration {
                cap_style: CapStyle::Round,
                color: self.background,
                opacity: 1.0,
                line_width: self.eraser_width,
            }
            .sanitized(),
        }
    }
}
