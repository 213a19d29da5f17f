use std::path::Path;
use std::sync::Arc;

use log::info;

use super::capture::AveragingCapture;
#[cfg(test)]
use super::capture::{CaptureConfig, ProgressSink};
use super::derive::background_subtracted;
use super::store::SpectrumStore;
use crate::data::export::{ExportDocument, ExportMode};
use crate::data::loader;
use crate::data::model::{Spectrum, SpectrumKind};
use crate::error::{AcquisitionError, Result};

// ---------------------------------------------------------------------------
// Operator actions
// ---------------------------------------------------------------------------

/// Everything the operator can ask for that needs a fresh capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Background,
    Reference,
    Emission,
    Absorption,
    /// Re-capture a raw spectrum and prepare it for saving.
    Export(ExportMode),
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Background => "Background",
            Action::Reference => "Reference",
            Action::Emission => "Emission",
            Action::Absorption => "Absorption",
            Action::Export(mode) => mode.label(),
        }
    }
}

/// Result of committing a capture.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The store was updated; the named slot changed.
    Stored(SpectrumKind),
    /// A document ready to be written; the store is unchanged.
    Export(ExportDocument),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Ties the capture to the store and enforces the action prerequisites.
///
/// Each action goes through three steps: [`check`](Self::check) before any
/// device access, the capture itself, then [`apply`](Self::apply). The
/// capture may run elsewhere (see `worker`), but check and apply always run
/// where the session lives.
pub struct Session {
    capture: Arc<AveragingCapture>,
    store: SpectrumStore,
}

impl Session {
    pub fn new(capture: Arc<AveragingCapture>) -> Self {
        Session {
            capture,
            store: SpectrumStore::default(),
        }
    }

    pub fn capture(&self) -> &Arc<AveragingCapture> {
        &self.capture
    }

    pub fn store(&self) -> &SpectrumStore {
        &self.store
    }

    /// Fail early when an action's inputs are missing.
    pub fn check(&self, action: Action) -> Result<()> {
        match action {
            Action::Background | Action::Reference | Action::Emission => Ok(()),
            Action::Absorption => self.store.absorption_inputs().map(|_| ()),
            Action::Export(mode) => {
                if self.store.last_raw().is_none() {
                    return Err(AcquisitionError::PrerequisiteMissing(
                        "no spectrum data to save".into(),
                    ));
                }
                match mode {
                    ExportMode::Emission => Ok(()),
                    ExportMode::EmissionMinusBackground => {
                        if self.store.background().is_none() {
                            return Err(AcquisitionError::PrerequisiteMissing(
                                "no dark background spectrum to subtract".into(),
                            ));
                        }
                        Ok(())
                    }
                    ExportMode::Absorption => self.store.absorption_inputs().map(|_| ()),
                }
            }
        }
    }

    /// Commit a captured `sample` for `action`. On error nothing is stored.
    pub fn apply(&mut self, action: Action, sample: Spectrum) -> Result<Outcome> {
        self.check(action)?;
        let outcome = match action {
            Action::Background => {
                self.store.set_background(sample);
                Outcome::Stored(SpectrumKind::Background)
            }
            Action::Reference => {
                self.store.set_reference(sample);
                Outcome::Stored(SpectrumKind::Reference)
            }
            Action::Emission => {
                self.store.record_emission(sample)?;
                Outcome::Stored(SpectrumKind::Emission)
            }
            Action::Absorption => {
                self.store.derive_absorption(&sample)?;
                Outcome::Stored(SpectrumKind::Absorption)
            }
            Action::Export(mode) => Outcome::Export(self.export_document(mode, sample)?),
        };
        Ok(outcome)
    }

    fn export_document(&self, mode: ExportMode, raw: Spectrum) -> Result<ExportDocument> {
        let spectrum = match mode {
            ExportMode::Emission => raw,
            ExportMode::EmissionMinusBackground => {
                let bg = self.store.background().ok_or_else(|| {
                    AcquisitionError::PrerequisiteMissing(
                        "no dark background spectrum to subtract".into(),
                    )
                })?;
                raw.with_values(background_subtracted(raw.values(), bg.values())?)?
            }
            ExportMode::Absorption => self.store.compute_absorption(&raw)?,
        };
        Ok(ExportDocument::new(mode, spectrum))
    }

    /// Replace the background or reference with a spectrum read from disk.
    pub fn load(&mut self, kind: SpectrumKind, path: &Path) -> Result<()> {
        let spectrum = loader::load_spectrum(path).map_err(AcquisitionError::Load)?;
        match kind {
            SpectrumKind::Background => self.store.set_background(spectrum),
            SpectrumKind::Reference => self.store.set_reference(spectrum),
            other => {
                return Err(AcquisitionError::Config(format!(
                    "{other} cannot be loaded from a file"
                )))
            }
        }
        info!("Loaded {kind} from {}", path.display());
        Ok(())
    }

    pub fn reset(&mut self) {
        self.store.reset();
    }
}

#[cfg(test)]
impl Session {
    /// Check, capture and apply on the calling thread. Blocks for the whole
    /// acquisition and runs to completion.
    pub fn run(
        &mut self,
        action: Action,
        config: &CaptureConfig,
        progress: &dyn ProgressSink,
    ) -> Result<Outcome> {
        self.check(action)?;
        let sample = self.capture.acquire(config, progress, None)?;
        self.apply(action, sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::capture::NoProgress;
    use crate::acquisition::store::SessionState;
    use crate::device::testing::ScriptedSpectrometer;
    use crate::device::DeviceAdapter;

    fn session(values: Vec<f64>) -> Session {
        let dev = ScriptedSpectrometer::constant(values);
        let capture = AveragingCapture::new(DeviceAdapter::Hardware(Box::new(dev))).unwrap();
        Session::new(Arc::new(capture))
    }

    fn single() -> CaptureConfig {
        CaptureConfig::new(10_000, 0.0, 1).unwrap()
    }

    fn sample(session: &Session, values: &[f64]) -> Spectrum {
        Spectrum::new(session.capture().wavelength_axis(), values.to_vec()).unwrap()
    }

    #[test]
    fn absorption_requires_background_and_reference() {
        let mut s = session(vec![50.0, 50.0]);
        let err = s.run(Action::Absorption, &single(), &NoProgress).unwrap_err();
        assert!(matches!(err, AcquisitionError::PrerequisiteMissing(_)));

        s.run(Action::Background, &single(), &NoProgress).unwrap();
        let err = s.run(Action::Absorption, &single(), &NoProgress).unwrap_err();
        assert!(matches!(err, AcquisitionError::PrerequisiteMissing(_)));
        assert_eq!(s.store().state(), SessionState::HasBackground);
        assert!(s.store().absorption().is_none());
    }

    #[test]
    fn full_absorption_sequence() {
        let mut s = session(vec![100.0, 100.0]);
        s.run(Action::Background, &single(), &NoProgress).unwrap();
        s.run(Action::Reference, &single(), &NoProgress).unwrap();
        let bg = sample(&s, &[200.0, 400.0]);
        s.apply(Action::Background, bg).unwrap();

        let out = s.run(Action::Absorption, &single(), &NoProgress).unwrap();
        assert_eq!(out, Outcome::Stored(SpectrumKind::Absorption));
        let abs = s.store().absorption().unwrap().values().to_vec();
        assert!((abs[0] - 2f64.log10()).abs() < 1e-12);
        assert!((abs[1] - 4f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn bad_config_leaves_store_unchanged() {
        let mut s = session(vec![5.0]);
        s.run(Action::Background, &single(), &NoProgress).unwrap();
        let before = s.store().background().cloned();
        let bad = CaptureConfig {
            integration_time_us: 1_000_000,
            interval_s: 1.0,
            sample_count: 3,
        };
        let err = s.run(Action::Background, &bad, &NoProgress).unwrap_err();
        assert!(matches!(err, AcquisitionError::Config(_)));
        assert_eq!(s.store().background().cloned(), before);
    }

    #[test]
    fn emission_keeps_raw_and_displays_subtracted() {
        let mut s = session(vec![10.0, 10.0]);
        s.apply(Action::Background, sample(&s, &[1.0, 2.0])).unwrap();
        s.run(Action::Emission, &single(), &NoProgress).unwrap();
        assert_eq!(s.store().last_raw().unwrap().values(), &[10.0, 10.0]);
        let shown = s.store().emission_display().unwrap().unwrap();
        assert_eq!(shown.values(), &[9.0, 8.0]);
    }

    #[test]
    fn export_requires_prior_emission() {
        let mut s = session(vec![1.0]);
        let err = s
            .run(Action::Export(ExportMode::Emission), &single(), &NoProgress)
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::PrerequisiteMissing(ref m) if m.contains("save")));
    }

    #[test]
    fn export_modes_derive_from_fresh_capture() {
        let mut s = session(vec![50.0, 50.0]);
        s.run(Action::Emission, &single(), &NoProgress).unwrap();

        let err = s
            .run(
                Action::Export(ExportMode::EmissionMinusBackground),
                &single(),
                &NoProgress,
            )
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::PrerequisiteMissing(_)));

        s.apply(Action::Background, sample(&s, &[100.0, 100.0])).unwrap();
        s.apply(Action::Reference, sample(&s, &[100.0, 100.0])).unwrap();

        let Outcome::Export(doc) = s
            .run(Action::Export(ExportMode::Emission), &single(), &NoProgress)
            .unwrap()
        else {
            panic!("expected export document");
        };
        assert_eq!(doc.spectrum.values(), &[50.0, 50.0]);

        let Outcome::Export(doc) = s
            .run(
                Action::Export(ExportMode::EmissionMinusBackground),
                &single(),
                &NoProgress,
            )
            .unwrap()
        else {
            panic!("expected export document");
        };
        assert_eq!(doc.spectrum.values(), &[-50.0, -50.0]);

        let Outcome::Export(doc) = s
            .run(Action::Export(ExportMode::Absorption), &single(), &NoProgress)
            .unwrap()
        else {
            panic!("expected export document");
        };
        assert!((doc.spectrum.values()[0] - 2f64.log10()).abs() < 1e-12);
        // Export does not touch the stored absorption.
        assert!(s.store().absorption().is_none());
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.txt");
        let mut s = session(vec![3.0]);
        s.run(Action::Emission, &single(), &NoProgress).unwrap();
        let Outcome::Export(doc) = s
            .run(Action::Export(ExportMode::Emission), &single(), &NoProgress)
            .unwrap()
        else {
            panic!("expected an export document");
        };
        doc.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "# Raw Spectrum (without dark background subtraction)\n# Wavelength\tIntensity\n500.00\t3.0\n"
        );
    }

    #[test]
    fn loaded_background_with_other_length_is_caught_at_derivation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bkg.json");
        std::fs::write(&path, r#"{"x": [1, 2, 3], "y": [1, 1, 1]}"#).unwrap();

        let mut s = session(vec![1.0, 1.0]);
        s.load(SpectrumKind::Background, &path).unwrap();
        s.run(Action::Reference, &single(), &NoProgress).unwrap();
        let err = s.run(Action::Absorption, &single(), &NoProgress).unwrap_err();
        assert!(matches!(err, AcquisitionError::DimensionMismatch { .. }));
        assert!(s.store().absorption().is_none());
    }

    #[test]
    fn load_failure_is_reported() {
        let mut s = session(vec![1.0]);
        let err = s
            .load(SpectrumKind::Reference, Path::new("/nonexistent/ref.txt"))
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::Load(_)));
        assert!(s.store().reference().is_none());
    }

    #[test]
    fn reset_then_absorption_fails() {
        let mut s = session(vec![1.0]);
        s.run(Action::Background, &single(), &NoProgress).unwrap();
        s.run(Action::Reference, &single(), &NoProgress).unwrap();
        s.run(Action::Emission, &single(), &NoProgress).unwrap();
        s.reset();
        assert_eq!(s.store().state(), SessionState::Empty);
        assert!(s.store().last_raw().is_none());
        let err = s.run(Action::Absorption, &single(), &NoProgress).unwrap_err();
        assert!(matches!(err, AcquisitionError::PrerequisiteMissing(_)));
    }
}
