use std::fmt;
use std::sync::Arc;

use crate::error::{AcquisitionError, Result};

// ---------------------------------------------------------------------------
// SpectrumKind – what a stored vector represents
// ---------------------------------------------------------------------------

/// Role of a spectrum inside the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectrumKind {
    Background,
    Reference,
    Emission,
    EmissionMinusBackground,
    Absorption,
}

impl SpectrumKind {
    /// Legend / plot label.
    pub fn label(self) -> &'static str {
        match self {
            SpectrumKind::Background => "Background Spectrum",
            SpectrumKind::Reference => "Reference Spectrum",
            SpectrumKind::Emission => "Emission Spectrum",
            SpectrumKind::EmissionMinusBackground => "Emission Spectrum (bkg subtracted)",
            SpectrumKind::Absorption => "Absorption Spectrum",
        }
    }

    /// Name of the y axis for this kind.
    pub fn value_name(self) -> &'static str {
        match self {
            SpectrumKind::Absorption => "Absorbance",
            _ => "Intensity",
        }
    }
}

impl fmt::Display for SpectrumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Spectrum – wavelength axis paired index by index with values
// ---------------------------------------------------------------------------

/// One spectrum: a shared, immutable wavelength axis and a value per point.
///
/// The axis is reference counted because every spectrum of a device session
/// shares the same one.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    wavelengths: Arc<[f64]>,
    values: Vec<f64>,
}

impl Spectrum {
    /// Pair an axis with a value vector. Lengths must agree.
    pub fn new(wavelengths: Arc<[f64]>, values: Vec<f64>) -> Result<Self> {
        if wavelengths.len() != values.len() {
            return Err(AcquisitionError::dimension(
                "intensity vector",
                wavelengths.len(),
                values.len(),
            ));
        }
        Ok(Spectrum {
            wavelengths,
            values,
        })
    }

    /// Shared handle to the axis, for deriving new spectra on the same axis.
    pub fn axis(&self) -> Arc<[f64]> {
        Arc::clone(&self.wavelengths)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Replace the values, keeping the axis.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        Spectrum::new(self.axis(), values)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `(wavelength, value)` pairs in axis order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.wavelengths
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Minimum and maximum of the values, ignoring NaN.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut finite = self.values.iter().copied().filter(|v| !v.is_nan());
        let first = finite.next()?;
        Some(finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_lengths() {
        let axis: Arc<[f64]> = vec![400.0, 401.0].into();
        let err = Spectrum::new(axis, vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::DimensionMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn points_pair_by_index() {
        let axis: Arc<[f64]> = vec![500.0, 501.0].into();
        let sp = Spectrum::new(axis, vec![3.0, 4.0]).unwrap();
        let pts: Vec<_> = sp.points().collect();
        assert_eq!(pts, vec![(500.0, 3.0), (501.0, 4.0)]);
    }

    #[test]
    fn value_range_skips_nan() {
        let axis: Arc<[f64]> = vec![1.0, 2.0, 3.0].into();
        let sp = Spectrum::new(axis, vec![f64::NAN, -2.0, 5.0]).unwrap();
        assert_eq!(sp.value_range(), Some((-2.0, 5.0)));
    }

    #[test]
    fn linspace_endpoints() {
        let v = linspace(400.0, 800.0, 5);
        assert_eq!(v, vec![400.0, 500.0, 600.0, 700.0, 800.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(7.0, 9.0, 1), vec![7.0]);
    }
}
