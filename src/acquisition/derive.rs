use crate::error::{AcquisitionError, Result};

// ---------------------------------------------------------------------------
// Derivation engine: pure arithmetic over intensity vectors
// ---------------------------------------------------------------------------

/// Floor applied to the sample/background ratio before taking the logarithm.
pub const RATIO_EPSILON: f64 = 1e-12;

/// Largest value [`absorbance`] can return: `-log10(RATIO_EPSILON)`.
pub const MAX_ABSORBANCE: f64 = 12.0;

fn ensure_same_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(AcquisitionError::dimension(what, expected, actual));
    }
    Ok(())
}

/// Clamped absorbance `-log10(max(sample / background, ε))`, ε = 1e-12.
///
/// This is not an exact Beer-Lambert figure. The floor is applied to the
/// ratio, so zero or negative ratios (and `0 / 0`) read as `MAX_ABSORBANCE`.
/// Finite ratios above 1 are left alone and give negative absorbance. Only a
/// positive sample over a zero background (an infinite ratio) is replaced by
/// `f64::MAX`, so the result is always finite and never above 12.
pub fn absorbance(sample: &[f64], background: &[f64]) -> Result<Vec<f64>> {
    ensure_same_len("sample spectrum", background.len(), sample.len())?;
    Ok(sample
        .iter()
        .zip(background)
        .map(|(&s, &b)| {
            let ratio = match s / b {
                r if r.is_nan() => RATIO_EPSILON,
                r if r == f64::INFINITY => f64::MAX,
                r => r.max(RATIO_EPSILON),
            };
            -ratio.log10()
        })
        .collect())
}

/// Elementwise `raw - background`. No clamping; results may be negative.
pub fn background_subtracted(raw: &[f64], background: &[f64]) -> Result<Vec<f64>> {
    ensure_same_len("raw spectrum", background.len(), raw.len())?;
    Ok(raw.iter().zip(background).map(|(r, b)| r - b).collect())
}

/// Arithmetic mean across samples, elementwise. Every sample must have the
/// length of the first.
pub fn elementwise_mean(samples: &[Vec<f64>]) -> Result<Vec<f64>> {
    let Some(first) = samples.first() else {
        return Ok(Vec::new());
    };
    let mut sum = vec![0.0; first.len()];
    for sample in samples {
        ensure_same_len("sample", first.len(), sample.len())?;
        for (acc, v) in sum.iter_mut().zip(sample) {
            *acc += v;
        }
    }
    let n = samples.len() as f64;
    Ok(sum.into_iter().map(|v| v / n).collect())
}
