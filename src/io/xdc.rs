//! xdc pick-file parsing (instantaneous-frequency variant).
//!
//! The file is a fixed-column numeric matrix, six columns per row:
//!
//! ```text
//! centre_freq  inst_freq  travel_time  distance  <unused>  <unused>
//! ```
//!
//! Negative travel times mark picks the operator rejected; they are kept in
//! the parsed matrix as NaN so column lengths stay aligned, and dropped
//! only when building a dispersion curve.

use std::fs;
use std::path::Path;

use log::debug;

use crate::domain::DispersionCurve;
use crate::error::{AppError, INPUT};

/// Parsed xdc pick columns (parallel arrays).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XdcPicks {
    pub centre_freq: Vec<f64>,
    pub inst_freq: Vec<f64>,
    pub time: Vec<f64>,
    pub dist: Vec<f64>,
}

impl XdcPicks {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Build a dispersion curve keyed by `name`, using the instantaneous
    /// frequency as the curve abscissa and skipping NaN travel times.
    pub fn into_curve(self, name: impl Into<String>) -> DispersionCurve {
        let mut freq = Vec::with_capacity(self.len());
        let mut time = Vec::with_capacity(self.len());
        let mut dist = Vec::with_capacity(self.len());

        let mut skipped = 0usize;
        for i in 0..self.len() {
            if !self.time[i].is_finite() {
                skipped += 1;
                continue;
            }
            freq.push(self.inst_freq[i]);
            time.push(self.time[i]);
            dist.push(self.dist[i]);
        }
        let name = name.into();
        if skipped > 0 {
            debug!("xdc: {name}: dropped {skipped} rejected pick(s)");
        }
        DispersionCurve::new(name, freq, time, dist)
    }
}

/// Parse xdc pick text. Strict like a numeric-matrix loader: every
/// non-empty row must supply six parseable floats.
pub fn parse_xdc(text: &str) -> Result<XdcPicks, AppError> {
    let mut picks = XdcPicks::default();

    for (idx, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 6 {
            return Err(AppError::new(
                INPUT,
                format!("xdc: line {} has {} columns, expected 6.", idx + 1, fields.len()),
            ));
        }
        let mut vals = [0.0f64; 6];
        for (out, s) in vals.iter_mut().zip(&fields[..6]) {
            *out = s.parse().map_err(|_| {
                AppError::new(INPUT, format!("xdc: line {}: invalid number '{s}'.", idx + 1))
            })?;
        }

        let time = if vals[2] < 0.0 { f64::NAN } else { vals[2] };
        picks.centre_freq.push(vals[0]);
        picks.inst_freq.push(vals[1]);
        picks.time.push(time);
        picks.dist.push(vals[3]);
    }

    Ok(picks)
}

/// Read an xdc pick file from disk.
pub fn read_xdc_file(path: &Path) -> Result<XdcPicks, AppError> {
    let text = fs::read_to_string(path).map_err(|e| AppError::io("read xdc file", path, e))?;
    parse_xdc(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
0.100  0.102   61.3  183.9  0.0  0.0
0.125  0.127   58.8  183.9  0.0  0.0
0.160  0.158   -1.0  183.9  0.0  0.0
0.200  0.203   52.1  183.9  0.0  0.0
";

    #[test]
    fn negative_times_become_nan() {
        let picks = parse_xdc(SAMPLE).unwrap();
        assert_eq!(picks.len(), 4);
        assert!(picks.time[2].is_nan());
        assert!((picks.time[0] - 61.3).abs() < 1e-12);
    }

    #[test]
    fn short_row_is_an_error() {
        assert!(parse_xdc("0.1 0.1 10.0 180.0\n").is_err());
    }

    #[test]
    fn non_numeric_token_is_an_error() {
        assert!(parse_xdc("0.1 0.1 ten 180.0 0 0\n").is_err());
    }

    #[test]
    fn curve_uses_inst_freq_and_drops_nan_rows() {
        let picks = parse_xdc(SAMPLE).unwrap();
        let curve = picks.into_curve("AAA_BBB_HHZ_HHZ");
        assert_eq!(curve.len(), 3);
        assert!((curve.freq[0] - 0.102).abs() < 1e-12);
        assert!((curve.freq[2] - 0.203).abs() < 1e-12);
        assert!(curve.lengths_consistent());
    }
}
