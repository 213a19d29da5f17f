use log::info;

use super::derive::{absorbance, background_subtracted};
use crate::data::model::Spectrum;
use crate::error::{AcquisitionError, Result};

// ---------------------------------------------------------------------------
// Sequencing state
// ---------------------------------------------------------------------------

/// Which derivation inputs are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    HasBackground,
    HasReference,
    /// Background and reference both captured: absorption can be derived.
    Ready,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Empty => "Empty",
            SessionState::HasBackground => "Background",
            SessionState::HasReference => "Reference",
            SessionState::Ready => "Background + Reference",
        }
    }
}

// ---------------------------------------------------------------------------
// SpectrumStore
// ---------------------------------------------------------------------------

/// The session's captured and derived spectra.
///
/// Each slot is replaced wholesale; nothing is mutated in place. Every
/// setter validates first and only then writes, so a failed call leaves
/// the store as it was.
#[derive(Debug, Clone, Default)]
pub struct SpectrumStore {
    background: Option<Spectrum>,
    reference: Option<Spectrum>,
    /// Raw emission, before background subtraction.
    last_raw: Option<Spectrum>,
    absorption: Option<Spectrum>,
}

impl SpectrumStore {
    pub fn state(&self) -> SessionState {
        match (&self.background, &self.reference) {
            (None, None) => SessionState::Empty,
            (Some(_), None) => SessionState::HasBackground,
            (None, Some(_)) => SessionState::HasReference,
            (Some(_), Some(_)) => SessionState::Ready,
        }
    }

    pub fn background(&self) -> Option<&Spectrum> {
        self.background.as_ref()
    }

    pub fn reference(&self) -> Option<&Spectrum> {
        self.reference.as_ref()
    }

    pub fn last_raw(&self) -> Option<&Spectrum> {
        self.last_raw.as_ref()
    }

    pub fn absorption(&self) -> Option<&Spectrum> {
        self.absorption.as_ref()
    }

    pub fn set_background(&mut self, spectrum: Spectrum) {
        info!("Stored background ({} points)", spectrum.len());
        self.background = Some(spectrum);
    }

    pub fn set_reference(&mut self, spectrum: Spectrum) {
        info!("Stored reference ({} points)", spectrum.len());
        self.reference = Some(spectrum);
    }

    /// Store a raw emission capture. If a background is present its length
    /// must match, so that the display value can always be derived.
    pub fn record_emission(&mut self, raw: Spectrum) -> Result<()> {
        if let Some(bg) = &self.background {
            background_subtracted(raw.values(), bg.values())?;
        }
        self.last_raw = Some(raw);
        Ok(())
    }

    /// The emission as displayed: `raw - background` when a background is
    /// stored, the raw capture otherwise. `None` before any emission capture.
    pub fn emission_display(&self) -> Option<Result<Spectrum>> {
        let raw = self.last_raw.as_ref()?;
        Some(match &self.background {
            Some(bg) => background_subtracted(raw.values(), bg.values())
                .and_then(|values| raw.with_values(values)),
            None => Ok(raw.clone()),
        })
    }

    /// Background and reference, or `PrerequisiteMissing`.
    pub fn absorption_inputs(&self) -> Result<(&Spectrum, &Spectrum)> {
        match (&self.background, &self.reference) {
            (Some(bg), Some(reference)) => Ok((bg, reference)),
            _ => Err(AcquisitionError::PrerequisiteMissing(
                "no dark background or reference spectrum captured".into(),
            )),
        }
    }

    /// Compute the clamped absorbance of `sample` against the stored
    /// background, without storing it. The reference must be present and
    /// have the same length.
    pub fn compute_absorption(&self, sample: &Spectrum) -> Result<Spectrum> {
        let (bg, reference) = self.absorption_inputs()?;
        if reference.len() != sample.len() {
            return Err(AcquisitionError::dimension(
                "sample spectrum",
                reference.len(),
                sample.len(),
            ));
        }
        let values = absorbance(sample.values(), bg.values())?;
        sample.with_values(values)
    }

    /// Derive and store the absorption of `sample`.
    pub fn derive_absorption(&mut self, sample: &Spectrum) -> Result<&Spectrum> {
        let derived = self.compute_absorption(sample)?;
        Ok(&*self.absorption.insert(derived))
    }

    /// Drop every stored spectrum.
    pub fn reset(&mut self) {
        *self = SpectrumStore::default();
        info!("Session reset");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn spectrum(values: &[f64]) -> Spectrum {
        let axis: Arc<[f64]> = (0..values.len()).map(|i| 500.0 + i as f64).collect();
        Spectrum::new(axis, values.to_vec()).unwrap()
    }

    #[test]
    fn state_follows_captures() {
        let mut store = SpectrumStore::default();
        assert_eq!(store.state(), SessionState::Empty);
        store.set_reference(spectrum(&[1.0]));
        assert_eq!(store.state(), SessionState::HasReference);
        store.set_background(spectrum(&[1.0]));
        assert_eq!(store.state(), SessionState::Ready);
    }

    #[test]
    fn captures_overwrite_previous() {
        let mut store = SpectrumStore::default();
        store.set_background(spectrum(&[1.0, 1.0]));
        store.set_background(spectrum(&[2.0, 2.0]));
        assert_eq!(store.background().unwrap().values(), &[2.0, 2.0]);
    }

    #[test]
    fn absorption_without_reference_fails_and_leaves_store() {
        let mut store = SpectrumStore::default();
        store.set_background(spectrum(&[100.0, 100.0]));
        let before = store.clone();
        let err = store.derive_absorption(&spectrum(&[50.0, 50.0])).unwrap_err();
        assert!(matches!(err, AcquisitionError::PrerequisiteMissing(_)));
        assert!(store.absorption().is_none());
        assert_eq!(store.background(), before.background());
        assert_eq!(store.state(), SessionState::HasBackground);
    }

    #[test]
    fn absorption_from_background_and_sample() {
        let mut store = SpectrumStore::default();
        store.set_background(spectrum(&[100.0, 100.0]));
        store.set_reference(spectrum(&[90.0, 90.0]));
        let abs = store.derive_absorption(&spectrum(&[50.0, 50.0])).unwrap();
        for v in abs.values() {
            assert!((v - 2f64.log10()).abs() < 1e-12);
        }
        assert!(store.absorption().is_some());
    }

    #[test]
    fn absorption_checks_reference_length() {
        let mut store = SpectrumStore::default();
        store.set_background(spectrum(&[100.0, 100.0]));
        store.set_reference(spectrum(&[90.0]));
        let err = store.derive_absorption(&spectrum(&[50.0, 50.0])).unwrap_err();
        assert!(matches!(err, AcquisitionError::DimensionMismatch { .. }));
        assert!(store.absorption().is_none());
    }

    #[test]
    fn emission_display_subtracts_background() {
        let mut store = SpectrumStore::default();
        assert!(store.emission_display().is_none());
        store.record_emission(spectrum(&[10.0, 20.0])).unwrap();
        assert_eq!(
            store.emission_display().unwrap().unwrap().values(),
            &[10.0, 20.0]
        );
        store.set_background(spectrum(&[4.0, 25.0]));
        assert_eq!(
            store.emission_display().unwrap().unwrap().values(),
            &[6.0, -5.0]
        );
        // Raw stays available for export.
        assert_eq!(store.last_raw().unwrap().values(), &[10.0, 20.0]);
    }

    #[test]
    fn mismatched_emission_is_not_stored() {
        let mut store = SpectrumStore::default();
        store.set_background(spectrum(&[1.0, 2.0]));
        assert!(store.record_emission(spectrum(&[1.0])).is_err());
        assert!(store.last_raw().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = SpectrumStore::default();
        store.set_background(spectrum(&[100.0]));
        store.set_reference(spectrum(&[100.0]));
        store.record_emission(spectrum(&[50.0])).unwrap();
        store.derive_absorption(&spectrum(&[50.0])).unwrap();

        store.reset();

        assert_eq!(store.state(), SessionState::Empty);
        assert!(store.background().is_none());
        assert!(store.reference().is_none());
        assert!(store.last_raw().is_none());
        assert!(store.absorption().is_none());
        let err = store.derive_absorption(&spectrum(&[50.0])).unwrap_err();
        assert!(matches!(err, AcquisitionError::PrerequisiteMissing(_)));
    }
}
