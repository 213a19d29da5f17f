/// Data layer: the spectrum type and its file formats.
///
/// ```text
///   Spectrum ──export──▶  "# <description>\n# Wavelength\t<column>\n500.00\t0.301"
///
///   .txt / .tsv / .json / .parquet ──loader──▶ Spectrum (background / reference)
/// ```

pub mod export;
pub mod loader;
pub mod model;
