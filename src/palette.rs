use egui::Color32;

/// Swatches offered by the colour picker, in display order
pub const DEFAULT_PALETTE: [Color32; 10] = [
    Color32::from_rgb(245, 49, 38),   // red
    Color32::from_rgb(30, 195, 55),   // green
    Color32::from_rgb(0, 112, 245),   // blue
    Color32::from_rgb(245, 139, 0),   // orange
    Color32::from_rgb(245, 194, 0),   // yellow
    Color32::from_rgb(152, 122, 84),  // brown
    Color32::WHITE,
    Color32::from_rgb(159, 75, 201),  // purple
    Color32::from_rgb(132, 132, 137), // grey
    Color32::BLACK,
];

/// Side length of one swatch cell, in points
pub const SWATCH_SIZE: f32 = 44.0;

