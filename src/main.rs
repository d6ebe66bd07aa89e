mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::ClimateInsightsApp;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    // An optional first argument replaces the configured dataset path.
    let data_path = std::env::args_os().nth(1).map(PathBuf::from);
    let state = AppState::bootstrap(data_path.as_deref());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Climate Insights",
        options,
        Box::new(move |_cc| Ok(Box::new(ClimateInsightsApp::new(state)))),
    )
}
