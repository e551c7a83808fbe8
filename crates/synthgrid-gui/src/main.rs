//! synthgrid-gui: beat-grid clip timeline

mod app;
mod config;
mod panels;

use app::SynthgridApp;
use eframe::NativeOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter() -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["synthgrid=debug", "wgpu=warn", "eframe=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }
    filter
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter())
        .init();

    tracing::info!("Starting Synthgrid");

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Synthgrid",
        options,
        Box::new(|cc| Ok(Box::new(SynthgridApp::new(cc)))),
    )
}
