use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::acquisition::capture::CaptureConfig;
use crate::data::export::ExportMode;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "SPECTRA_LIVE_CONFIG";
const DEFAULT_FILE: &str = "spectra-live.json";

// ---------------------------------------------------------------------------
// Settings – persisted operator configuration
// ---------------------------------------------------------------------------

/// Operator-facing acquisition settings, persisted as JSON between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Exposure per sample, in milliseconds (as shown in the UI).
    pub integration_time_ms: f64,
    /// Spacing between samples of an averaged capture, in seconds.
    pub interval_s: f64,
    /// Number of samples averaged per capture.
    pub average_scans: u32,
    /// Which variant the "Save" button writes.
    pub export_mode: ExportMode,
    /// Demo-mode signal generator.
    pub synthetic: SyntheticSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            integration_time_ms: 10.0,
            interval_s: 1.0,
            average_scans: 1,
            export_mode: ExportMode::EmissionMinusBackground,
            synthetic: SyntheticSettings::default(),
        }
    }
}

/// Parameters of the synthetic signal used when no spectrometer is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSettings {
    pub seed: u64,
    pub noise_sigma: f64,
    pub points: usize,
    pub wavelength_start: f64,
    pub wavelength_end: f64,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            noise_sigma: 0.1,
            points: 3648,
            wavelength_start: 400.0,
            wavelength_end: 800.0,
        }
    }
}

impl Settings {
    /// `$SPECTRA_LIVE_CONFIG`, or `spectra-live.json` in the working directory.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE))
    }

    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))
    }

    /// Like [`Settings::load`], but logs a broken file and falls back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Settings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings file: {e:#}");
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("serializing settings")?;
        std::fs::write(path, text)
            .with_context(|| format!("writing settings to {}", path.display()))
    }

    /// Convert operator units into a validated capture configuration.
    pub fn capture_config(&self) -> crate::error::Result<CaptureConfig> {
        let integration_time_us = (self.integration_time_ms * 1e3).round();
        if !(1.0..=u32::MAX as f64).contains(&integration_time_us) {
            return Err(crate::error::AcquisitionError::Config(format!(
                "integration time {} ms is out of range",
                self.integration_time_ms
            )));
        }
        CaptureConfig::new(
            integration_time_us as u32,
            self.interval_s,
            self.average_scans,
        )
    }

    /// Restore the capture controls to their defaults, keeping the device setup.
    pub fn reset_capture_controls(&mut self) {
        let defaults = Settings::default();
        self.integration_time_ms = defaults.integration_time_ms;
        self.interval_s = defaults.interval_s;
        self.average_scans = defaults.average_scans;
        self.export_mode = defaults.export_mode;
    }
}
