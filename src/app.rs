use egui::{Color32, Pos2, Rect, TextureHandle, TextureOptions, Vec2};

use crate::brush::Brush;
use crate::canvas::{Canvas, DisplayUpdate};
use crate::config::CanvasConfig;
use crate::export::ExportedFile;
use crate::input::InputHandler;
use crate::palette::{DEFAULT_PALETTE, SWATCH_SIZE};

const MIN_WIDTH: f32 = 1.0;
const MAX_WIDTH: f32 = 40.0;

/// We derive Deserialize/Serialize so the brush survives restarts.
#[derive(serde::Deserialize, serde::Serialize, Default)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct SketchApp {
    brush: Brush,
    #[serde(skip)]
    config: CanvasConfig,
    #[serde(skip)]
    canvas: Option<Canvas>,
    #[serde(skip)]
    input: InputHandler,
    #[serde(skip)]
    texture: Option<TextureHandle>,
    #[serde(skip)]
    status: Option<String>,
    /// Most recent export; its file is removed when replaced
    #[serde(skip)]
    last_export: Option<ExportedFile>,
}

impl SketchApp {
    /// Called once before the first frame.
    pub fn with_config(cc: &eframe::CreationContext<'_>, config: CanvasConfig) -> Self {
        let mut app: Self = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        app.config = config;

        match Canvas::new(&app.config) {
            Ok(mut canvas) => {
                canvas.set_brush(app.brush.clone());
                app.canvas = Some(canvas);
            }
            Err(err) => {
                log::error!("Failed to create canvas: {}", err);
                app.status = Some(format!("Canvas unavailable: {err}"));
            }
        }
        app
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };

        ui.horizontal_wrapped(|ui| {
            let eraser = canvas.brush().is_eraser();
            if ui.selectable_label(!eraser, "✏ Pen").clicked() {
                canvas.set_eraser_mode(false);
            }
            if ui.selectable_label(eraser, "⌫ Eraser").clicked() {
                canvas.set_eraser_mode(true);
            }

            ui.separator();

            for color in DEFAULT_PALETTE {
                let selected = !eraser && canvas.brush().pen.color == color;
                let swatch = egui::Button::new("")
                    .fill(color)
                    .stroke(if selected {
                        egui::Stroke::new(2.0, ui.visuals().selection.stroke.color)
                    } else {
                        egui::Stroke::NONE
                    })
                    .min_size(Vec2::splat(SWATCH_SIZE / 2.0));
                if ui.add(swatch).clicked() {
                    canvas.set_brush_color(color);
                    canvas.set_eraser_mode(false);
                }
            }

            ui.separator();

            let mut width = canvas.brush().pen.line_width;
            let slider = ui.add_enabled(
                !eraser,
                egui::Slider::new(&mut width, MIN_WIDTH..=MAX_WIDTH).text("Width"),
            );
            if slider.changed() {
                canvas.set_brush_width(width);
            }

            ui.separator();

            let undo_label = match canvas.undo_action_name() {
                Some(name) => format!("Undo {name}"),
                None => "Undo".to_owned(),
            };
            if ui
                .add_enabled(canvas.can_undo(), egui::Button::new("⟲"))
                .on_hover_text(undo_label)
                .clicked()
            {
                canvas.undo();
            }
            let redo_label = match canvas.redo_action_name() {
                Some(name) => format!("Redo {name}"),
                None => "Redo".to_owned(),
            };
            if ui
                .add_enabled(canvas.can_redo(), egui::Button::new("⟳"))
                .on_hover_text(redo_label)
                .clicked()
            {
                canvas.redo();
            }
            if ui.button("Clear").clicked() {
                if let Err(err) = canvas.clear() {
                    log::warn!("Clear failed: {}", err);
                    self.status = Some(err.to_string());
                }
            }

            ui.separator();

            if ui
                .add_enabled(canvas.can_save(), egui::Button::new("Save"))
                .clicked()
            {
                let bitmap = canvas.save();
                match ExportedFile::write_temp_jpeg(&bitmap, self.config.jpeg_quality) {
                    Ok(exported) => {
                        self.status = Some(format!("Saved to {}", exported.path().display()));
                        self.last_export = Some(exported);
                    }
                    Err(err) => {
                        log::error!("Export failed: {}", err);
                        self.status = Some(format!("Export failed: {err}"));
                    }
                }
            }
            if ui.button("Cancel").clicked() {
                canvas.cancel();
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        let redo = ctx.input_mut(|i| {
            i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::Z)
        });
        if redo {
            canvas.redo();
        } else if ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z)) {
            canvas.undo();
        }
    }

    fn canvas_view(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };

        // Keep the bitmap's aspect ratio so x and y scale alike
        let bitmap_size = canvas.bitmap_size();
        let aspect = bitmap_size.x / bitmap_size.y;
        let available = ui.available_size();
        let width = available.x.min(available.y * aspect).max(1.0);
        let (response, painter) =
            ui.allocate_painter(Vec2::new(width, width / aspect), egui::Sense::drag());
        let rect = response.rect;

        self.input.set_canvas_rect(rect);
        canvas.set_view_size(rect.size());
        for event in self.input.process_input(ctx) {
            if let Err(err) = canvas.handle_input(event) {
                log::warn!("Input {:?} rejected: {}", event, err);
                self.status = Some(err.to_string());
            }
        }

        if let Some(update) = canvas.take_display_update() {
            // Mid-stroke only the pixels under the new segments are sent
            let patched = match (update, self.texture.as_mut()) {
                (DisplayUpdate::Region(region), Some(texture)) => {
                    if let Some((origin, patch)) =
                        canvas.display_image().region_to_color_image(region)
                    {
                        texture.set_partial(origin, patch, TextureOptions::LINEAR);
                    }
                    true
                }
                _ => false,
            };
            if !patched {
                let image = canvas.display_image().to_color_image();
                if let Some(texture) = self.texture.as_mut() {
                    texture.set(image, TextureOptions::LINEAR);
                } else {
                    self.texture =
                        Some(ctx.load_texture("sketch-canvas", image, TextureOptions::LINEAR));
                }
            }
        }

        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        if canvas.is_drawing() {
            ctx.request_repaint();
        }
    }
}

impl eframe::App for SketchApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Some(canvas) = &self.canvas {
            self.brush = canvas.brush().clone();
        }
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            match &self.status {
                Some(status) => ui.label(status.as_str()),
                None => ui.weak("Drag to draw, tap for a dot"),
            };
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas_view(ctx, ui);
        });
    }
}
