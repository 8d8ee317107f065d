//! aFTAN result-file parsing.
//!
//! aFTAN writes one whitespace-delimited row per measured period. The first
//! column is a filter index we do not use; columns 1..=6 are:
//!
//! ```text
//! centre_period  observed_period  group_vel  phase_vel  amplitude  snr
//! ```
//!
//! Rows that fail to parse are reported and skipped rather than aborting
//! the file, which matches how these exploratory result files are treated
//! in practice.

use std::fs;
use std::path::Path;

use log::warn;

use crate::domain::PeriodSelect;
use crate::error::{AppError, EMPTY};
use crate::math::interp;

/// Fixed list of target periods (s) for aFTAN group-velocity resampling.
pub const AFTAN_TARGET_PERIODS: [f64; 42] = [
    4.0, 4.5, 5.0, 5.5, 6.0, 6.5, 7.0, 7.5, 8.0, 8.5, 9.0, 9.5, 10.0, 11.0, 12.0, 13.0, 14.0,
    15.0, 16.0, 17.0, 18.0, 19.0, 20.0, 21.0, 22.0, 23.0, 24.0, 25.0, 26.0, 27.0, 28.0, 29.0,
    30.0, 31.0, 32.0, 33.0, 34.0, 35.0, 36.0, 37.0, 38.0, 39.0,
];

/// One parsed aFTAN result row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AftanRow {
    pub centre_period: f64,
    pub observed_period: f64,
    pub group_vel: f64,
    pub phase_vel: f64,
    pub amplitude: f64,
    pub snr: f64,
}

/// A period / group-velocity curve extracted from aFTAN rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AftanCurve {
    pub periods: Vec<f64>,
    pub group_vels: Vec<f64>,
}

/// Parse aFTAN result text into rows, skipping (and reporting) bad lines.
pub fn parse_aftan(text: &str) -> Vec<AftanRow> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        match parse_row(&fields) {
            Some(row) => rows.push(row),
            None => warn!("aftan: skipping malformed line {}", idx + 1),
        }
    }
    rows
}

fn parse_row(fields: &[&str]) -> Option<AftanRow> {
    if fields.len() < 7 {
        return None;
    }
    let mut vals = [0.0f64; 6];
    for (out, s) in vals.iter_mut().zip(&fields[1..7]) {
        *out = s.parse().ok()?;
    }
    Some(AftanRow {
        centre_period: vals[0],
        observed_period: vals[1],
        group_vel: vals[2],
        phase_vel: vals[3],
        amplitude: vals[4],
        snr: vals[5],
    })
}

/// Extract the `(period, group_vel)` curve, choosing the period column.
pub fn curve_from_rows(rows: &[AftanRow], select: PeriodSelect) -> AftanCurve {
    let periods = rows
        .iter()
        .map(|r| match select {
            PeriodSelect::Centre => r.centre_period,
            PeriodSelect::Observed => r.observed_period,
        })
        .collect();
    let group_vels = rows.iter().map(|r| r.group_vel).collect();
    AftanCurve {
        periods,
        group_vels,
    }
}

/// Resample a group-velocity curve onto [`AFTAN_TARGET_PERIODS`].
///
/// Target periods outside the observed period range are discarded rather
/// than extrapolated.
pub fn resample_to_targets(curve: &AftanCurve) -> Result<AftanCurve, AppError> {
    if curve.periods.len() < 2 {
        return Err(AppError::new(
            EMPTY,
            "aFTAN curve has fewer than two rows; nothing to resample.",
        ));
    }
    let lo = curve.periods.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = curve
        .periods
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let periods: Vec<f64> = AFTAN_TARGET_PERIODS
        .iter()
        .copied()
        .filter(|&p| p >= lo && p <= hi)
        .collect();
    let group_vels = periods
        .iter()
        .map(|&p| interp(p, &curve.periods, &curve.group_vels))
        .collect();

    Ok(AftanCurve {
        periods,
        group_vels,
    })
}

/// Read an aFTAN result file and resample it in one step.
pub fn read_aftan_file(path: &Path, select: PeriodSelect) -> Result<AftanCurve, AppError> {
    let text = fs::read_to_string(path).map_err(|e| AppError::io("read aFTAN file", path, e))?;
    let rows = parse_aftan(&text);
    resample_to_targets(&curve_from_rows(&rows, select))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
  1   4.0000   4.1200   2.9100   3.4200   812.0   14.2
  2   6.0000   6.0500   3.0200   3.5100   633.0   11.8
  3   9.0000   8.8700   3.1500   3.6000   455.0    9.4
  4  12.0000  11.9000   3.2400   3.6800   310.0    7.1
";

    #[test]
    fn parses_all_columns() {
        let rows = parse_aftan(SAMPLE);
        assert_eq!(rows.len(), 4);
        assert!((rows[0].centre_period - 4.0).abs() < 1e-12);
        assert!((rows[0].observed_period - 4.12).abs() < 1e-12);
        assert!((rows[0].group_vel - 2.91).abs() < 1e-12);
        assert!((rows[3].snr - 7.1).abs() < 1e-12);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "1 4.0 4.1 2.9 3.4 812 14.2\nnot a row\n2 6.0 6.1 3.0 3.5 633 11.8\n";
        assert_eq!(parse_aftan(text).len(), 2);
    }

    #[test]
    fn period_selection_switches_column() {
        let rows = parse_aftan(SAMPLE);
        let centre = curve_from_rows(&rows, PeriodSelect::Centre);
        let observed = curve_from_rows(&rows, PeriodSelect::Observed);
        assert!((centre.periods[1] - 6.0).abs() < 1e-12);
        assert!((observed.periods[1] - 6.05).abs() < 1e-12);
        assert_eq!(centre.group_vels, observed.group_vels);
    }

    #[test]
    fn resampling_stays_inside_observed_range() {
        let rows = parse_aftan(SAMPLE);
        let curve = curve_from_rows(&rows, PeriodSelect::Centre);
        let out = resample_to_targets(&curve).unwrap();
        // Observed range is [4, 12]: targets 4.0..=12.0 survive, 13+ do not.
        assert!(out.periods.first().copied().unwrap() >= 4.0);
        assert!(out.periods.last().copied().unwrap() <= 12.0);
        assert!(out.periods.contains(&11.0));
        assert!(!out.periods.contains(&13.0));
        assert_eq!(out.periods.len(), out.group_vels.len());
    }

    #[test]
    fn resampled_velocity_is_linear_between_rows() {
        let rows = parse_aftan(SAMPLE);
        let curve = curve_from_rows(&rows, PeriodSelect::Centre);
        let out = resample_to_targets(&curve).unwrap();
        let i = out.periods.iter().position(|&p| p == 5.0).unwrap();
        // Halfway between (4.0, 2.91) and (6.0, 3.02).
        assert!((out.group_vels[i] - 2.965).abs() < 1e-12);
    }
}
