use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::data::model::linspace;
use crate::settings::SyntheticSettings;

// ---------------------------------------------------------------------------
// Synthetic signal generator (demo mode)
// ---------------------------------------------------------------------------

/// Noise is clamped to this many standard deviations so every perturbation
/// stays bounded.
const NOISE_BOUND_SIGMAS: f64 = 4.0;

/// Stand-in for a spectrometer when no hardware is present.
///
/// Produces `sin(0.01 · λ)` over a fixed wavelength range, plus a bounded
/// Gaussian perturbation from an injectable random source. With
/// `noise_sigma == 0` every call returns the same vector.
pub struct SyntheticSignal {
    wavelengths: Vec<f64>,
    noise_sigma: f64,
    rng: Box<dyn rand::RngCore + Send>,
}

impl SyntheticSignal {
    pub fn new(settings: &SyntheticSettings) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(settings.seed))
    }

    /// Use a caller-supplied random source for the perturbation.
    pub fn with_rng<R>(settings: &SyntheticSettings, rng: R) -> Self
    where
        R: rand::RngCore + Send + 'static,
    {
        SyntheticSignal {
            wavelengths: linspace(
                settings.wavelength_start,
                settings.wavelength_end,
                settings.points,
            ),
            noise_sigma: settings.noise_sigma.max(0.0),
            rng: Box::new(rng),
        }
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// One synthetic intensity vector. Never blocks.
    pub fn generate(&mut self) -> Vec<f64> {
        let noise = if self.noise_sigma > 0.0 {
            Normal::new(0.0, self.noise_sigma).ok()
        } else {
            None
        };
        let bound = NOISE_BOUND_SIGMAS * self.noise_sigma;
        let rng = &mut self.rng;

        self.wavelengths
            .iter()
            .map(|&wl| {
                let signal = (0.01 * wl).sin();
                match &noise {
                    Some(dist) => signal + dist.sample(&mut *rng).clamp(-bound, bound),
                    None => signal,
                }
            })
            .collect()
    }
}
