use std::path::{Path, PathBuf};

use log::Level;

use crate::acquisition::session::{Action, Outcome, Session};
use crate::acquisition::worker::{CaptureWorker, WorkerMessage};
use crate::data::export::ExportMode;
use crate::data::model::{Spectrum, SpectrumKind};
use crate::error::{AcquisitionError, Result};
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Plot pages
// ---------------------------------------------------------------------------

/// The three plot surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Emission,
    Background,
    Absorption,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Emission, Page::Background, Page::Absorption];

    pub fn title(self) -> &'static str {
        match self {
            Page::Emission => "Emission",
            Page::Background => "Background",
            Page::Absorption => "Absorption / Reference",
        }
    }
}

/// Operator-facing message, the equivalent of a non-modal dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub level: Level,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,
    pub settings_path: PathBuf,

    /// Capture, store and sequencing rules.
    pub session: Session,

    /// Runs captures off the UI thread.
    pub worker: CaptureWorker,

    /// Where the pending export is written once its capture finishes.
    pending_export: Option<PathBuf>,

    /// Fraction of the running capture completed.
    pub progress: f32,

    /// Page shown in the central panel.
    pub page: Page,

    /// Status / error message shown in the UI.
    pub status_message: Option<Status>,
}

impl AppState {
    pub fn new(settings: Settings, settings_path: PathBuf, session: Session) -> Self {
        Self {
            settings,
            settings_path,
            session,
            worker: CaptureWorker::default(),
            pending_export: None,
            progress: 0.0,
            page: Page::Emission,
            status_message: None,
        }
    }

    pub fn loading(&self) -> bool {
        self.worker.is_busy()
    }

    pub fn set_status(&mut self, level: Level, text: impl Into<String>) {
        let text = text.into();
        log::log!(level, "{text}");
        self.status_message = Some(Status { level, text });
    }

    fn report(&mut self, err: &AcquisitionError) {
        let level = match err {
            AcquisitionError::PrerequisiteMissing(_)
            | AcquisitionError::Config(_)
            | AcquisitionError::Busy
            | AcquisitionError::Cancelled { .. } => Level::Warn,
            _ => Level::Error,
        };
        self.set_status(level, format!("Error: {err}"));
    }

    /// Validate and hand an action to the capture worker.
    pub fn request(&mut self, action: Action) {
        if let Err(e) = self.try_request(action) {
            self.pending_export = None;
            self.report(&e);
        }
    }

    fn try_request(&mut self, action: Action) -> Result<()> {
        if self.worker.is_busy() {
            return Err(AcquisitionError::Busy);
        }
        let config = self.settings.capture_config()?;
        self.session.check(action)?;
        self.progress = 0.0;
        self.worker
            .start(std::sync::Arc::clone(self.session.capture()), action, config)?;
        self.set_status(Level::Info, format!("Acquiring {}…", action.label()));
        Ok(())
    }

    /// Re-capture and save the selected export variant to `path`.
    pub fn request_export(&mut self, path: PathBuf) {
        if self.worker.is_busy() {
            self.report(&AcquisitionError::Busy);
            return;
        }
        self.pending_export = Some(path);
        self.request(Action::Export(self.settings.export_mode));
    }

    /// Apply everything the worker has produced since the last frame.
    pub fn handle_messages(&mut self) {
        for msg in self.worker.poll() {
            match msg {
                WorkerMessage::Progress(p) => self.progress = p,
                WorkerMessage::Finished { action, result } => self.finish(action, result),
            }
        }
    }

    fn finish(&mut self, action: Action, result: Result<Spectrum>) {
        let export_path = self.pending_export.take();
        let outcome = result.and_then(|sample| self.session.apply(action, sample));
        match outcome {
            Ok(Outcome::Stored(kind)) => {
                self.progress = 1.0;
                self.page = page_for(kind);
                self.set_status(Level::Info, stored_message(kind));
            }
            Ok(Outcome::Export(doc)) => {
                self.progress = 1.0;
                let Some(path) = export_path else {
                    self.set_status(Level::Warn, "Export finished without a target file.");
                    return;
                };
                match doc.save(&path) {
                    Ok(()) => self.set_status(
                        Level::Info,
                        format!("{} spectrum saved to {}", doc.mode.label(), path.display()),
                    ),
                    Err(e) => self.report(&e),
                }
            }
            Err(e) => {
                self.progress = 0.0;
                self.report(&e);
            }
        }
    }

    /// Replace the background or reference with a spectrum from disk.
    pub fn load_from_file(&mut self, kind: SpectrumKind, path: &Path) {
        if self.worker.is_busy() {
            self.report(&AcquisitionError::Busy);
            return;
        }
        match self.session.load(kind, path) {
            Ok(()) => {
                self.page = page_for(kind);
                self.set_status(Level::Info, format!("{kind} loaded from {}", path.display()));
            }
            Err(e) => self.report(&e),
        }
    }

    /// Clear all spectra and restore the capture controls.
    pub fn reset(&mut self) {
        if self.worker.is_busy() {
            self.report(&AcquisitionError::Busy);
            return;
        }
        self.session.reset();
        self.settings.reset_capture_controls();
        self.progress = 0.0;
        self.page = Page::Emission;
        self.status_message = None;
    }

    pub fn set_export_mode(&mut self, mode: ExportMode) {
        self.settings.export_mode = mode;
    }

    /// Traces to draw on `page`, in drawing order.
    pub fn traces(&self, page: Page) -> Vec<(SpectrumKind, Spectrum)> {
        let store = self.session.store();
        match page {
            Page::Emission => match store.emission_display() {
                Some(Ok(sp)) => {
                    let kind = if store.background().is_some() {
                        SpectrumKind::EmissionMinusBackground
                    } else {
                        SpectrumKind::Emission
                    };
                    vec![(kind, sp)]
                }
                Some(Err(e)) => {
                    log::warn!("Cannot display emission: {e}");
                    Vec::new()
                }
                None => Vec::new(),
            },
            Page::Background => store
                .background()
                .map(|sp| vec![(SpectrumKind::Background, sp.clone())])
                .unwrap_or_default(),
            Page::Absorption => [
                (SpectrumKind::Reference, store.reference()),
                (SpectrumKind::Absorption, store.absorption()),
            ]
            .into_iter()
            .filter_map(|(kind, sp)| sp.map(|sp| (kind, sp.clone())))
            .collect(),
        }
    }

    /// Persist the settings file; failures are logged only.
    pub fn save_settings(&self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            log::error!("Failed to save settings: {e:#}");
        }
    }
}

fn page_for(kind: SpectrumKind) -> Page {
    match kind {
        SpectrumKind::Emission | SpectrumKind::EmissionMinusBackground => Page::Emission,
        SpectrumKind::Background => Page::Background,
        SpectrumKind::Reference | SpectrumKind::Absorption => Page::Absorption,
    }
}

fn stored_message(kind: SpectrumKind) -> &'static str {
    match kind {
        SpectrumKind::Background => "Dark background spectrum has been captured successfully.",
        SpectrumKind::Reference => "Reference spectrum has been captured successfully.",
        SpectrumKind::Absorption => "Absorption spectrum derived.",
        SpectrumKind::Emission | SpectrumKind::EmissionMinusBackground => {
            "Emission spectrum captured."
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::acquisition::capture::AveragingCapture;
    use crate::device::DeviceAdapter;
    use crate::settings::SyntheticSettings;

    fn state(dir: &Path) -> AppState {
        let synthetic = SyntheticSettings {
            noise_sigma: 0.0,
            points: 16,
            ..SyntheticSettings::default()
        };
        let capture = AveragingCapture::new(DeviceAdapter::demo(&synthetic)).unwrap();
        AppState::new(
            Settings::default(),
            dir.join("settings.json"),
            Session::new(Arc::new(capture)),
        )
    }

    fn settle(state: &mut AppState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.loading() && Instant::now() < deadline {
            state.handle_messages();
            std::thread::sleep(Duration::from_millis(5));
        }
        state.handle_messages();
    }

    #[test]
    fn background_capture_switches_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = state(dir.path());
        st.request(Action::Background);
        settle(&mut st);
        assert_eq!(st.page, Page::Background);
        assert_eq!(st.traces(Page::Background).len(), 1);
        assert_eq!(st.status_message.as_ref().unwrap().level, Level::Info);
    }

    #[test]
    fn absorption_without_inputs_reports_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = state(dir.path());
        st.request(Action::Absorption);
        assert!(!st.loading());
        let status = st.status_message.clone().unwrap();
        assert_eq!(status.level, Level::Warn);
        assert!(status.text.contains("reference"));
    }

    #[test]
    fn invalid_settings_never_start_a_capture() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = state(dir.path());
        st.settings.integration_time_ms = 1500.0;
        st.settings.average_scans = 3;
        st.request(Action::Emission);
        assert!(!st.loading());
        assert!(st.status_message.unwrap().text.contains("interval must exceed"));
    }

    #[test]
    fn export_writes_chosen_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = state(dir.path());
        st.request(Action::Emission);
        settle(&mut st);
        st.set_export_mode(ExportMode::Emission);
        let target = dir.path().join("emission.txt");
        st.request_export(target.clone());
        settle(&mut st);
        let text = std::fs::read_to_string(&target).unwrap();
        assert!(text.starts_with("# Raw Spectrum"));
        assert_eq!(text.lines().count(), 2 + 16);
    }

    #[test]
    fn reset_clears_traces_and_controls() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = state(dir.path());
        st.request(Action::Background);
        settle(&mut st);
        st.request(Action::Reference);
        settle(&mut st);
        st.settings.average_scans = 5;

        st.reset();

        for page in Page::ALL {
            assert!(st.traces(page).is_empty());
        }
        assert_eq!(st.settings.average_scans, 1);
        assert_eq!(st.page, Page::Emission);
    }
}
