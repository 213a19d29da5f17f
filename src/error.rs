use thiserror::Error;

// ---------------------------------------------------------------------------
// Acquisition errors
// ---------------------------------------------------------------------------

/// Every failure the acquisition core can report.
///
/// All variants are recoverable: the action is aborted, the operator is told,
/// and previously stored spectra stay as they were.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Invalid capture configuration (e.g. interval not above integration time).
    #[error("configuration error: {0}")]
    Config(String),

    /// A derivation was requested before its input spectra were captured.
    #[error("missing prerequisite: {0}")]
    PrerequisiteMissing(String),

    /// Two vectors that must be paired index by index differ in length.
    #[error("dimension mismatch: {what} has {actual} points, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The spectrometer could not be opened or read.
    #[error("device error: {0}")]
    Device(String),

    /// Another capture currently owns the device.
    #[error("a capture is already in progress")]
    Busy,

    /// The capture was cancelled between two samples.
    #[error("capture cancelled after {completed} of {requested} samples")]
    Cancelled { completed: u32, requested: u32 },

    /// Writing an export file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A spectrum file could not be read.
    #[error("failed to load spectrum: {0:#}")]
    Load(anyhow::Error),
}

impl AcquisitionError {
    pub fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        AcquisitionError::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }
}

pub type Result<T, E = AcquisitionError> = std::result::Result<T, E>;
