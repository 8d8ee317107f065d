//! Decimation and rate conversion.
//!
//! `downsample` is the composite operation used before noise correlation:
//! anti-alias at `0.4 * goal_rate`, then either plain decimation (integer
//! rate ratio) or Lanczos interpolation (anything else). The anti-alias
//! corner sits below the new Nyquist on purpose — the extra margin keeps
//! the correlation band clean.

use std::f64::consts::PI;

use crate::domain::{Trace, TraceData};
use crate::dsp::filter::lowpass_zerophase;
use crate::error::{AppError, INPUT};

/// Relative tolerance when deciding whether a rate ratio is an integer.
const FACTOR_EPS: f64 = 1e-9;

/// Keep every `factor`-th sample, preserving the stored sample kind.
///
/// No filtering happens here; callers apply their own anti-alias filter
/// first.
pub fn decimate(trace: &mut Trace, factor: usize) -> Result<(), AppError> {
    if factor == 0 {
        return Err(AppError::new(INPUT, "Decimation factor must be >= 1."));
    }
    if factor == 1 {
        return Ok(());
    }
    trace.data = match &trace.data {
        TraceData::Float64(v) => TraceData::Float64(take_every(v, factor)),
        TraceData::Float32(v) => TraceData::Float32(take_every(v, factor)),
        TraceData::Int32(v) => TraceData::Int32(take_every(v, factor)),
    };
    trace.sampling_rate /= factor as f64;
    Ok(())
}

fn take_every<T: Copy>(v: &[T], factor: usize) -> Vec<T> {
    v.iter().step_by(factor).copied().collect()
}

/// Windowed-sinc (Lanczos) resampling onto a new rate.
///
/// `a` is the kernel half-width in input samples; `a = 1` is the narrow
/// kernel used for rate conversion after anti-alias filtering.
pub fn lanczos_resample(data: &[f64], old_rate: f64, new_rate: f64, a: usize) -> Vec<f64> {
    if data.is_empty() || a == 0 {
        return Vec::new();
    }
    let n_in = data.len();
    let n_out = (((n_in - 1) as f64) * new_rate / old_rate).floor() as usize + 1;
    let a_f = a as f64;

    let mut out = Vec::with_capacity(n_out);
    for j in 0..n_out {
        // Position of output sample j on the input grid.
        let s = j as f64 * old_rate / new_rate;
        let lo = ((s - a_f).ceil() as isize).max(0) as usize;
        let hi = ((s + a_f).floor() as isize).min(n_in as isize - 1) as usize;

        let mut acc = 0.0;
        let mut wsum = 0.0;
        for i in lo..=hi {
            let x = s - i as f64;
            let w = lanczos_kernel(x, a_f);
            acc += data[i] * w;
            wsum += w;
        }
        // Renormalize near the edges where the kernel is truncated.
        out.push(if wsum != 0.0 { acc / wsum } else { 0.0 });
    }
    out
}

fn lanczos_kernel(x: f64, a: f64) -> f64 {
    if x.abs() >= a {
        return 0.0;
    }
    sinc(x) * sinc(x / a)
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    let px = PI * x;
    px.sin() / px
}

/// Downsample a trace to `goal_rate`:
/// anti-alias lowpass at `0.4 * goal_rate`, then decimate when the rate
/// ratio is an integer, else Lanczos-interpolate (`a = 1`).
pub fn downsample(trace: &mut Trace, goal_rate: f64) -> Result<(), AppError> {
    if !(goal_rate > 0.0 && goal_rate.is_finite()) {
        return Err(AppError::new(INPUT, format!("Invalid goal sampling rate {goal_rate}.")));
    }
    if goal_rate > trace.sampling_rate {
        return Err(AppError::new(
            INPUT,
            format!(
                "Goal rate {goal_rate} Hz exceeds the trace rate {} Hz; refusing to upsample.",
                trace.sampling_rate
            ),
        ));
    }
    if (goal_rate - trace.sampling_rate).abs() < FACTOR_EPS {
        return Ok(());
    }

    let mut data = trace.data.to_f64();
    lowpass_zerophase(&mut data, 0.4 * goal_rate, trace.sampling_rate, 4)?;

    let ratio = trace.sampling_rate / goal_rate;
    if (ratio - ratio.round()).abs() < FACTOR_EPS {
        let factor = ratio.round() as usize;
        trace.set_f64(data);
        decimate(trace, factor)?;
    } else {
        let resampled = lanczos_resample(&data, trace.sampling_rate, goal_rate, 1);
        trace.set_f64(resampled);
        trace.sampling_rate = goal_rate;
    }
    Ok(())
}
