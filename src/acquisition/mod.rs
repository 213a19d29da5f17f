/// Acquisition core: capture, storage, derivation.
///
/// Architecture:
/// ```text
///   DeviceAdapter
///        │  sample() × N, phase-locked
///        ▼
///   ┌──────────────────┐
///   │ AveragingCapture │  mean over samples → Spectrum
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │     Session      │  check prerequisites → apply
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────────────┐       ┌────────┐
///   │  SpectrumStore   │──────▶│ derive │  raw − bkg, clamped absorbance
///   └──────────────────┘       └────────┘
/// ```
pub mod capture;
pub mod derive;
pub mod session;
pub mod store;
pub mod worker;
