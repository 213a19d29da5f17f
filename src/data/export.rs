use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::Spectrum;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Export modes
// ---------------------------------------------------------------------------

/// Which variant of the emission/absorption data the "Save" action writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportMode {
    /// Background-subtracted emission.
    EmissionMinusBackground,
    /// Raw emission, no subtraction.
    Emission,
    /// Clamped absorbance.
    Absorption,
}

impl ExportMode {
    /// Order shown in the mode selector.
    pub const ALL: [ExportMode; 3] = [
        ExportMode::EmissionMinusBackground,
        ExportMode::Emission,
        ExportMode::Absorption,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExportMode::EmissionMinusBackground => "Emission-bkg",
            ExportMode::Emission => "Emission",
            ExportMode::Absorption => "Absorption",
        }
    }

    /// First header line of the file.
    pub fn description(self) -> &'static str {
        match self {
            ExportMode::EmissionMinusBackground => "Spectrum with background subtraction",
            ExportMode::Emission => "Raw Spectrum (without dark background subtraction)",
            ExportMode::Absorption => "Absorption Spectrum",
        }
    }

    /// Name of the second column.
    pub fn value_column(self) -> &'static str {
        match self {
            ExportMode::Absorption => "Absorbance",
            _ => "Intensity",
        }
    }
}

// ---------------------------------------------------------------------------
// ExportDocument
// ---------------------------------------------------------------------------

/// A spectrum ready to be written as tab-separated text:
///
/// ```text
/// # <description>
/// # Wavelength\t<Intensity|Absorbance>
/// 500.00\t0.301
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub mode: ExportMode,
    pub spectrum: Spectrum,
}

impl ExportDocument {
    pub fn new(mode: ExportMode, spectrum: Spectrum) -> Self {
        ExportDocument { mode, spectrum }
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "# {}", self.mode.description())?;
        writeln!(out, "# Wavelength\t{}", self.mode.value_column())?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(out);
        for (wavelength, value) in self.spectrum.points() {
            writer
                .write_record([format!("{wavelength:.2}"), format_value(value)])
                .map_err(csv_to_io)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Create (or truncate) `path` and write the document into it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))?;
        log::info!(
            "Saved {} ({} points) to {}",
            self.mode.label(),
            self.spectrum.len(),
            path.display()
        );
        Ok(())
    }
}

/// Shortest text that reads back to the same `f64`, in the form older
/// exports use: a decimal point for plain values (`100.0`, `0.301`), and a
/// signed exponent of at least two digits otherwise (`1e-05`, `1.5e+16`).
fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    let text = format!("{value:?}");
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

fn csv_to_io(err: csv::Error) -> std::io::Error {
    match err.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => std::io::Error::other(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn doc(mode: ExportMode, axis: &[f64], values: &[f64]) -> ExportDocument {
        let axis: Arc<[f64]> = axis.into();
        ExportDocument::new(mode, Spectrum::new(axis, values.to_vec()).unwrap())
    }

    fn render(doc: &ExportDocument) -> String {
        let mut buf = Vec::new();
        doc.write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn values_use_signed_two_digit_exponents() {
        assert_eq!(format_value(100.0), "100.0");
        assert_eq!(format_value(0.301), "0.301");
        assert_eq!(format_value(1e-5), "1e-05");
        assert_eq!(format_value(1e16), "1e+16");
        assert_eq!(format_value(-2.5e-123), "-2.5e-123");
        assert_eq!(format_value(f64::NAN), "nan");
    }

    #[test]
    fn absorption_layout() {
        let text = render(&doc(ExportMode::Absorption, &[500.0], &[0.301]));
        assert_eq!(
            text,
            "# Absorption Spectrum\n# Wavelength\tAbsorbance\n500.00\t0.301\n"
        );
    }

    #[test]
    fn raw_emission_layout() {
        let text = render(&doc(
            ExportMode::Emission,
            &[400.004, 401.126],
            &[100.0, -3.5],
        ));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# Raw Spectrum (without dark background subtraction)",
                "# Wavelength\tIntensity",
                "400.00\t100.0",
                "401.13\t-3.5",
            ]
        );
    }

    #[test]
    fn subtracted_emission_header() {
        let text = render(&doc(ExportMode::EmissionMinusBackground, &[1.0], &[0.0]));
        assert!(text.starts_with(
            "# Spectrum with background subtraction\n# Wavelength\tIntensity\n"
        ));
    }

    #[test]
    fn save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abs.txt");
        doc(ExportMode::Absorption, &[500.0, 501.0], &[0.5, 12.0])
            .save(&path)
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("500.00\t0.5\n501.00\t12.0\n"));
    }

    #[test]
    fn mode_labels_match_selector() {
        let labels: Vec<_> = ExportMode::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["Emission-bkg", "Emission", "Absorption"]);
    }
}
