/// Device layer: the spectrometer capability boundary.
///
/// ```text
///   SpectrometerDriver ──open_first()──▶ Box<dyn Spectrometer>
///                                              │
///                          no device / open fails
///                                              │
///                                              ▼
///   DeviceAdapter::{Hardware, Demo(SyntheticSignal)}
///                                              │
///                                              ▼
///                                     AveragingCapture
/// ```
pub mod clock;
pub mod synthetic;

use log::{error, info};

use crate::error::{AcquisitionError, Result};
use crate::settings::SyntheticSettings;
use synthetic::SyntheticSignal;

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// A physical (or emulated) spectrometer. Not reentrant: callers must hold
/// exclusive access for the duration of a capture.
pub trait Spectrometer: Send {
    /// Human-readable device name (model / serial).
    fn name(&self) -> String;

    /// Set the exposure time of a single sample.
    fn configure(&mut self, integration_time_us: u32) -> Result<()>;

    /// Read one raw intensity vector.
    fn sample(&mut self) -> Result<Vec<f64>>;

    /// Wavelength (nm) of every pixel. Fixed for the lifetime of the device.
    fn wavelength_axis(&self) -> Result<Vec<f64>>;
}

/// Entry point of a hardware backend.
pub trait SpectrometerDriver {
    /// Identifiers of the attached devices, empty when none are found.
    fn list_devices(&self) -> Vec<String>;

    /// Open the first listed device.
    fn open_first(&self) -> Result<Box<dyn Spectrometer>>;
}

// ---------------------------------------------------------------------------
// DeviceAdapter
// ---------------------------------------------------------------------------

/// The device the capture loop talks to.
pub enum DeviceAdapter {
    Hardware(Box<dyn Spectrometer>),
    /// No hardware: synthetic data, no sleeping, no averaging.
    Demo(SyntheticSignal),
}

impl DeviceAdapter {
    pub fn demo(settings: &SyntheticSettings) -> Self {
        DeviceAdapter::Demo(SyntheticSignal::new(settings))
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, DeviceAdapter::Demo(_))
    }

    pub fn name(&self) -> String {
        match self {
            DeviceAdapter::Hardware(dev) => dev.name(),
            DeviceAdapter::Demo(_) => "Demo (synthetic)".to_string(),
        }
    }

    pub fn wavelength_axis(&self) -> Result<Vec<f64>> {
        match self {
            DeviceAdapter::Hardware(dev) => dev.wavelength_axis(),
            DeviceAdapter::Demo(sig) => Ok(sig.wavelengths().to_vec()),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// How the device was obtained, for the operator notice.
#[derive(Debug)]
pub enum Notice {
    Connected(String),
    /// No device listed by any driver.
    DemoMode,
    /// A device was listed but could not be opened.
    OpenFailed(AcquisitionError),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Connected(name) => format!("Connected to {name}"),
            Notice::DemoMode => "No spectrometer found: entering demo mode.".to_string(),
            Notice::OpenFailed(e) => format!("Failed to open spectrometer: {e}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::OpenFailed(_))
    }
}

pub struct Discovery {
    pub adapter: DeviceAdapter,
    pub notice: Notice,
}

/// Open the first device any driver lists; otherwise fall back to demo mode.
///
/// A listed device that fails to open stops the search: the failure is
/// reported and the session runs in demo mode.
pub fn discover(drivers: &[&dyn SpectrometerDriver], synthetic: &SyntheticSettings) -> Discovery {
    for driver in drivers {
        let devices = driver.list_devices();
        if devices.is_empty() {
            continue;
        }
        info!("Found spectrometer(s): {devices:?}");
        return match driver.open_first() {
            Ok(dev) => {
                let name = dev.name();
                info!("Opened spectrometer {name}");
                Discovery {
                    adapter: DeviceAdapter::Hardware(dev),
                    notice: Notice::Connected(name),
                }
            }
            Err(e) => {
                error!("Failed to open spectrometer: {e}");
                Discovery {
                    adapter: DeviceAdapter::demo(synthetic),
                    notice: Notice::OpenFailed(e),
                }
            }
        };
    }

    info!("No spectrometer found, entering demo mode");
    Discovery {
        adapter: DeviceAdapter::demo(synthetic),
        notice: Notice::DemoMode,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Device that replays scripted samples, then repeats the last one.
    pub struct ScriptedSpectrometer {
        pub axis: Vec<f64>,
        pub samples: VecDeque<Result<Vec<f64>>>,
        pub last: Vec<f64>,
        pub configured: Arc<Mutex<Vec<u32>>>,
        pub reads: Arc<Mutex<u32>>,
    }

    impl ScriptedSpectrometer {
        pub fn constant(values: Vec<f64>) -> Self {
            let axis = (0..values.len()).map(|i| 500.0 + i as f64).collect();
            ScriptedSpectrometer {
                axis,
                samples: VecDeque::new(),
                last: values,
                configured: Arc::new(Mutex::new(Vec::new())),
                reads: Arc::new(Mutex::new(0)),
            }
        }

        pub fn then(mut self, sample: Result<Vec<f64>>) -> Self {
            self.samples.push_back(sample);
            self
        }
    }

    impl Spectrometer for ScriptedSpectrometer {
        fn name(&self) -> String {
            "scripted".to_string()
        }

        fn configure(&mut self, integration_time_us: u32) -> Result<()> {
            self.configured.lock().unwrap().push(integration_time_us);
            Ok(())
        }

        fn sample(&mut self) -> Result<Vec<f64>> {
            *self.reads.lock().unwrap() += 1;
            match self.samples.pop_front() {
                Some(Ok(v)) => {
                    self.last = v.clone();
                    Ok(v)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last.clone()),
            }
        }

        fn wavelength_axis(&self) -> Result<Vec<f64>> {
            Ok(self.axis.clone())
        }
    }
}
