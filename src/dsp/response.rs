//! Instrument-response deconvolution.
//!
//! The transfer function is evaluated directly from poles and zeros,
//!
//! ```text
//! H(f) = gain * prod(iw - z_k) / prod(iw - p_k),  w = 2*pi*f
//! ```
//!
//! and divided out of the spectrum with a water-level floor so spectral
//! holes do not blow up the result. The total sensitivity is applied last,
//! leaving the trace in physical units.

use num_complex::Complex64;
use realfft::RealFftPlanner;

use crate::domain::{PolesZeros, Trace};
use crate::error::{AppError, EMPTY, NUMERIC};

/// Default taper fraction applied before the FFT.
pub const DEFAULT_TAPER: f64 = 0.05;
/// Default water level in dB below the response maximum.
pub const DEFAULT_WATER_LEVEL_DB: f64 = 60.0;

/// Evaluate the pole-zero transfer function at the given frequencies (Hz).
pub fn paz_response(paz: &PolesZeros, freqs: &[f64]) -> Vec<Complex64> {
    freqs
        .iter()
        .map(|&f| {
            let iw = Complex64::new(0.0, 2.0 * std::f64::consts::PI * f);
            let mut h = Complex64::new(paz.gain, 0.0);
            for z in &paz.zeros {
                h *= iw - z;
            }
            for p in &paz.poles {
                h /= iw - p;
            }
            h
        })
        .collect()
}

/// Symmetric cosine (Hann-edge) taper of length `n`.
///
/// `fraction` is the tapered portion at each end (0.05 = 5%).
pub fn cosine_taper(n: usize, fraction: f64) -> Vec<f64> {
    let mut w = vec![1.0; n];
    if n < 2 || fraction <= 0.0 {
        return w;
    }
    let m = ((n as f64 * fraction).round() as usize).clamp(1, n / 2);
    for i in 0..m {
        let x = 0.5 * (1.0 - (std::f64::consts::PI * i as f64 / m as f64).cos());
        w[i] = x;
        w[n - 1 - i] = x;
    }
    w
}

/// Deconvolve the instrument response from a trace in place.
///
/// Steps: demean, cosine taper, forward FFT, spectral division by the
/// pole-zero response (water-level clamped), inverse FFT, divide by the
/// total sensitivity.
pub fn remove_response(
    trace: &mut Trace,
    paz: &PolesZeros,
    water_level_db: f64,
    taper_fraction: f64,
) -> Result<(), AppError> {
    let mut data = trace.data.to_f64();
    let n = data.len();
    if n == 0 {
        return Err(AppError::new(EMPTY, "Cannot deconvolve an empty trace."));
    }
    if !(paz.sensitivity.is_finite() && paz.sensitivity != 0.0) {
        return Err(AppError::new(
            NUMERIC,
            format!("Invalid sensitivity {} in pole-zero response.", paz.sensitivity),
        ));
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    for x in data.iter_mut() {
        *x -= mean;
    }
    for (x, w) in data.iter_mut().zip(cosine_taper(n, taper_fraction)) {
        *x *= w;
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let c2r = planner.plan_fft_inverse(n);

    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut data, &mut spectrum)
        .map_err(|e| AppError::new(NUMERIC, format!("Forward FFT failed: {e}")))?;

    let freqs: Vec<f64> = (0..spectrum.len())
        .map(|k| k as f64 * trace.sampling_rate / n as f64)
        .collect();
    let response = paz_response(paz, &freqs);

    let max_amp = response.iter().map(|h| h.norm()).fold(0.0, f64::max);
    if !(max_amp.is_finite() && max_amp > 0.0) {
        return Err(AppError::new(
            NUMERIC,
            "Pole-zero response is zero everywhere; cannot deconvolve.",
        ));
    }
    let floor = max_amp * 10f64.powf(-water_level_db / 20.0);

    for (s, h) in spectrum.iter_mut().zip(&response) {
        let amp = h.norm();
        if amp == 0.0 || !amp.is_finite() {
            *s = Complex64::new(0.0, 0.0);
            continue;
        }
        let h_used = if amp < floor { *h * (floor / amp) } else { *h };
        *s /= h_used;
    }

    // Real inverse transforms assume these are purely real.
    spectrum[0].im = 0.0;
    if n % 2 == 0 {
        let last = spectrum.len() - 1;
        spectrum[last].im = 0.0;
    }

    let mut out = c2r.make_output_vec();
    c2r.process(&mut spectrum, &mut out)
        .map_err(|e| AppError::new(NUMERIC, format!("Inverse FFT failed: {e}")))?;

    let scale = 1.0 / (n as f64 * paz.sensitivity);
    for x in out.iter_mut() {
        *x *= scale;
    }

    trace.set_f64(out);
    Ok(())
}
