use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};

use log::{debug, info};

use super::derive::elementwise_mean;
use crate::data::model::Spectrum;
use crate::device::clock::{Clock, SystemClock};
use crate::device::DeviceAdapter;
use crate::error::{AcquisitionError, Result};

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Parameters of one (possibly averaged) capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConfig {
    /// Exposure of a single sample, in microseconds. Must be > 0.
    pub integration_time_us: u32,
    /// Wall-clock spacing between samples, in seconds.
    pub interval_s: f64,
    /// Samples averaged into the result. Must be >= 1.
    pub sample_count: u32,
}

impl CaptureConfig {
    pub fn new(integration_time_us: u32, interval_s: f64, sample_count: u32) -> Result<Self> {
        let config = CaptureConfig {
            integration_time_us,
            interval_s,
            sample_count,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn integration_time_s(&self) -> f64 {
        f64::from(self.integration_time_us) / 1_000_000.0
    }

    /// Check the field ranges and, for averaged captures, that the interval
    /// leaves room for the exposure.
    pub fn validate(&self) -> Result<()> {
        if self.integration_time_us == 0 {
            return Err(AcquisitionError::Config(
                "integration time must be positive".into(),
            ));
        }
        if !self.interval_s.is_finite() || self.interval_s < 0.0 {
            return Err(AcquisitionError::Config(
                "interval must be a non-negative number of seconds".into(),
            ));
        }
        if Duration::try_from_secs_f64(self.interval_s).is_err() {
            return Err(AcquisitionError::Config(format!(
                "interval of {} s is too long",
                self.interval_s
            )));
        }
        if self.sample_count == 0 {
            return Err(AcquisitionError::Config(
                "at least one sample is required".into(),
            ));
        }
        if self.sample_count >= 2 && self.interval_s <= self.integration_time_s() {
            return Err(AcquisitionError::Config(
                "interval must exceed integration time".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress and cancellation hooks
// ---------------------------------------------------------------------------

/// Receives the completed fraction (0..=1) after every sample.
pub trait ProgressSink {
    fn report(&self, fraction: f32);
}

impl<F: Fn(f32)> ProgressSink for F {
    fn report(&self, fraction: f32) {
        self(fraction)
    }
}

/// Sink for callers that do not track progress.
#[cfg(test)]
pub struct NoProgress;

#[cfg(test)]
impl ProgressSink for NoProgress {
    fn report(&self, _fraction: f32) {}
}

/// Optional stop signal, checked between samples of an averaged capture.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// AveragingCapture
// ---------------------------------------------------------------------------

/// Sole owner of the device. Captures are serialized: a request that arrives
/// while another capture holds the device fails with [`AcquisitionError::Busy`].
pub struct AveragingCapture {
    device: Mutex<DeviceAdapter>,
    clock: Box<dyn Clock>,
    axis: Arc<[f64]>,
    device_name: String,
    demo: bool,
}

impl AveragingCapture {
    pub fn new(adapter: DeviceAdapter) -> Result<Self> {
        Self::with_clock(adapter, Box::new(SystemClock::default()))
    }

    /// Read the wavelength axis once; it is shared by every spectrum of the session.
    pub fn with_clock(adapter: DeviceAdapter, clock: Box<dyn Clock>) -> Result<Self> {
        let axis: Arc<[f64]> = adapter.wavelength_axis()?.into();
        Ok(AveragingCapture {
            device_name: adapter.name(),
            demo: adapter.is_demo(),
            device: Mutex::new(adapter),
            clock,
            axis,
        })
    }

    pub fn wavelength_axis(&self) -> Arc<[f64]> {
        Arc::clone(&self.axis)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_demo(&self) -> bool {
        self.demo
    }

    /// Take one averaged intensity vector.
    ///
    /// * `sample_count < 2`: a single raw sample, unmodified.
    /// * otherwise: `sample_count` samples on a phase-locked cadence. Before
    ///   each sample after the first, sleep
    ///   `max(0, interval - (elapsed mod interval))`, then average elementwise.
    /// * demo mode: one synthetic vector, no sleeping.
    ///
    /// The configuration is validated before the device is touched. Blocks
    /// the calling thread until done; runs to completion unless `cancel` is
    /// given and tripped.
    pub fn capture(
        &self,
        config: &CaptureConfig,
        progress: &dyn ProgressSink,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<f64>> {
        config.validate()?;

        let mut device = match self.device.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(AcquisitionError::Busy),
            // A panic mid-capture leaves nothing half-written in the adapter.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let started = Instant::now();
        let intensities = match &mut *device {
            DeviceAdapter::Demo(signal) => signal.generate(),
            DeviceAdapter::Hardware(dev) => {
                dev.configure(config.integration_time_us)?;
                if config.sample_count < 2 {
                    dev.sample()?
                } else {
                    let n = config.sample_count;
                    let interval = config.interval_s;
                    let t0 = self.clock.now();
                    let mut samples = Vec::with_capacity(n as usize);
                    for i in 0..n {
                        if i > 0 {
                            if cancel.is_some_and(CancelToken::is_cancelled) {
                                return Err(AcquisitionError::Cancelled {
                                    completed: i,
                                    requested: n,
                                });
                            }
                            let elapsed = self.clock.now().saturating_sub(t0).as_secs_f64();
                            let wait = (interval - elapsed % interval).max(0.0);
                            debug!("sample {i}/{n}: sleeping {wait:.4}s");
                            self.clock.sleep(Duration::from_secs_f64(wait));
                        }
                        samples.push(dev.sample()?);
                        progress.report((i + 1) as f32 / n as f32);
                    }
                    elementwise_mean(&samples)?
                }
            }
        };
        progress.report(1.0);

        info!(
            "Captured {} points from {} ({} sample(s), {:.2?})",
            intensities.len(),
            self.device_name,
            if self.demo { 1 } else { config.sample_count },
            started.elapsed()
        );
        Ok(intensities)
    }

    /// [`capture`](Self::capture) paired with the session wavelength axis.
    pub fn acquire(
        &self,
        config: &CaptureConfig,
        progress: &dyn ProgressSink,
        cancel: Option<&CancelToken>,
    ) -> Result<Spectrum> {
        let intensities = self.capture(config, progress, cancel)?;
        Spectrum::new(self.wavelength_axis(), intensities)
    }
}
