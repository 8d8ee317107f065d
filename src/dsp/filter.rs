//! Butterworth lowpass filtering.
//!
//! The filter is built as a cascade of biquad sections (cookbook lowpass
//! with the Butterworth Q values) and applied zero-phase: forward, then
//! backward over the reversed signal. The two passes square the magnitude
//! response, so an order-4 design acts like order 8 in amplitude — the
//! same convention the rest of the processing chain assumes.

use std::f64::consts::PI;

use crate::error::{AppError, INPUT};

/// One second-order section in direct form II transposed.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    /// Filter `data` in place (single forward pass, zero initial state).
    pub fn run(&self, data: &mut [f64]) {
        let mut z1 = 0.0;
        let mut z2 = 0.0;
        for x in data.iter_mut() {
            let y = self.b0 * *x + z1;
            z1 = self.b1 * *x - self.a1 * y + z2;
            z2 = self.b2 * *x - self.a2 * y;
            *x = y;
        }
    }
}

/// Design an even-order Butterworth lowpass as biquad sections.
pub fn butter_lowpass(order: usize, cutoff: f64, fs: f64) -> Result<Vec<Biquad>, AppError> {
    if order == 0 || order % 2 != 0 {
        return Err(AppError::new(
            INPUT,
            format!("Filter order must be even and > 0, got {order}."),
        ));
    }
    if !(cutoff > 0.0 && cutoff < 0.5 * fs) {
        return Err(AppError::new(
            INPUT,
            format!("Lowpass cutoff {cutoff} Hz must sit below Nyquist ({} Hz).", 0.5 * fs),
        ));
    }

    let w0 = 2.0 * PI * cutoff / fs;
    let cos_w0 = w0.cos();
    let sin_w0 = w0.sin();

    let n_sections = order / 2;
    let mut sections = Vec::with_capacity(n_sections);
    for k in 0..n_sections {
        // Butterworth pole-pair angle for this section.
        let theta = PI * (2.0 * k as f64 + 1.0) / (2.0 * order as f64);
        let q = 1.0 / (2.0 * theta.cos());
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha;
        sections.push(Biquad {
            b0: ((1.0 - cos_w0) / 2.0) / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: ((1.0 - cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        });
    }
    Ok(sections)
}

/// Single forward pass through a section cascade.
pub fn sosfilt(sections: &[Biquad], data: &mut [f64]) {
    for s in sections {
        s.run(data);
    }
}

/// Zero-phase lowpass: forward pass, then a second pass over the reversed
/// signal.
pub fn lowpass_zerophase(data: &mut [f64], cutoff: f64, fs: f64, order: usize) -> Result<(), AppError> {
    let sections = butter_lowpass(order, cutoff, fs)?;
    sosfilt(&sections, data);
    data.reverse();
    sosfilt(&sections, data);
    data.reverse();
    Ok(())
}
