mod acquisition;
mod app;
mod color;
mod data;
mod device;
mod error;
mod settings;
mod state;
mod ui;

use std::sync::Arc;

use anyhow::Context;
use eframe::egui;
use log::{error, info, Level};

use acquisition::capture::AveragingCapture;
use acquisition::session::Session;
use app::SpectraLiveApp;
use device::{DeviceAdapter, SpectrometerDriver};
use settings::Settings;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings_path = Settings::default_path();
    let settings = Settings::load_or_default(&settings_path);
    info!("Settings loaded from {}", settings_path.display());

    // Vendor drivers register here; with none present the app runs in demo mode.
    let drivers: [&dyn SpectrometerDriver; 0] = [];
    let discovery = device::discover(&drivers, &settings.synthetic);
    let mut notice = discovery.notice.message();
    let mut notice_level = if discovery.notice.is_error() {
        Level::Error
    } else if discovery.adapter.is_demo() {
        Level::Warn
    } else {
        Level::Info
    };

    let capture = match AveragingCapture::new(discovery.adapter) {
        Ok(capture) => capture,
        Err(e) => {
            error!("Cannot read wavelength axis: {e}");
            notice = format!("Failed to read wavelength axis ({e}): entering demo mode.");
            notice_level = Level::Error;
            AveragingCapture::new(DeviceAdapter::demo(&settings.synthetic))
                .context("initialising demo spectrometer")?
        }
    };

    let mut state = AppState::new(settings, settings_path, Session::new(Arc::new(capture)));
    state.set_status(notice_level, notice);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Spectra Live",
        options,
        Box::new(|_cc| Ok(Box::new(SpectraLiveApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))
}
