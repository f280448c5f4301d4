#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

fn main() -> eframe::Result<()> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let config = match std::env::args().nth(1) {
        Some(path) => match eframe_sketch::CanvasConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("Ignoring configuration {}: {}", path, err);
                eframe_sketch::CanvasConfig::default()
            }
        },
        None => eframe_sketch::CanvasConfig::default(),
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 640.0])
            .with_min_inner_size([480.0, 320.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Sketch",
        native_options,
        Box::new(move |cc| Ok(Box::new(eframe_sketch::SketchApp::with_config(cc, config)))),
    )
}
