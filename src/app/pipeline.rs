//! Shared pipeline logic used by the `curves` command (and tests).
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load pairs -> parse picks -> QC -> period grid -> observation table
//!
//! The CLI layer then focuses on presentation and export wiring.

use std::fs;
use std::path::PathBuf;

use log::{info, warn};
use rayon::prelude::*;

use crate::curves::{
    GridOutcome, QcSummary, build_period_table, interpolate_onto_grid, qc_curves,
    target_period_grid,
};
use crate::domain::{DispersionCurve, PairTable, PeriodSelect, PeriodTable, PickFormat, RunConfig};
use crate::error::{AppError, EMPTY};
use crate::io::aftan::{curve_from_rows, parse_aftan};
use crate::io::pairs::{MinFreqTable, load_min_freq_table, load_pair_table};
use crate::io::xdc::read_xdc_file;

/// All computed outputs of a single `disp curves` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub pairs: PairTable,
    pub qc: QcSummary,
    pub grid: GridOutcome,
    pub table: PeriodTable,
    /// The target period grid in effect.
    pub periods: Vec<f64>,
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_curves(config: &RunConfig) -> Result<RunOutput, AppError> {
    let loaded = load_pair_table(&config.pairs_path)?;
    for e in &loaded.row_errors {
        warn!("pairs: line {}: {}", e.line, e.message);
    }
    if loaded.table.is_empty() {
        return Err(AppError::new(EMPTY, "Pair table has no usable rows."));
    }

    let min_freq = match &config.min_freq_path {
        Some(path) => load_min_freq_table(path, config.min_freq_default)?,
        None => MinFreqTable::constant(config.min_freq_default),
    };

    let curves = load_pick_dir(config, &loaded.table)?;
    info!("parsed {} curve(s) from {}", curves.len(), config.picks_dir.display());
    if curves.is_empty() {
        return Err(AppError::new(
            EMPTY,
            format!("No pick files found in '{}'.", config.picks_dir.display()),
        ));
    }

    let (curves, qc) = qc_curves(curves, &loaded.table, &min_freq, &config.qc)?;

    let periods = target_period_grid();
    info!("interpolating onto {} target periods", periods.len());
    let grid = interpolate_onto_grid(curves, &periods)?;
    if grid.curves.is_empty() {
        return Err(AppError::new(EMPTY, "No curves survived QC and gridding."));
    }

    let table = build_period_table(&grid.curves, &loaded.table, &periods);

    Ok(RunOutput {
        pairs: loaded.table,
        qc,
        grid,
        table,
        periods,
    })
}

/// Parse every pick file in the input directory; the file stem is the pair
/// name.
fn load_pick_dir(config: &RunConfig, pairs: &PairTable) -> Result<Vec<DispersionCurve>, AppError> {
    let entries = fs::read_dir(&config.picks_dir)
        .map_err(|e| AppError::io("read picks directory", &config.picks_dir, e))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'))
        })
        .collect();
    paths.sort();

    let parsed: Result<Vec<Option<DispersionCurve>>, AppError> = paths
        .par_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            match config.format {
                PickFormat::Xdc => read_xdc_file(path).map(|p| Some(p.into_curve(name))),
                PickFormat::Aftan => aftan_curve(path, &name, config.period_select, pairs),
            }
        })
        .collect();

    Ok(parsed?.into_iter().flatten().collect())
}

/// Build a freq/time/dist curve from an aFTAN result file.
///
/// aFTAN reports (period, group velocity); the travel time comes from the
/// pair separation, so a pair missing from the table is skipped here.
fn aftan_curve(
    path: &std::path::Path,
    name: &str,
    select: PeriodSelect,
    pairs: &PairTable,
) -> Result<Option<DispersionCurve>, AppError> {
    let Some(pair) = pairs.get(name) else {
        warn!("aftan: no pair metadata for '{name}'; file skipped");
        return Ok(None);
    };

    let text = fs::read_to_string(path).map_err(|e| AppError::io("read aFTAN file", path, e))?;
    let curve = curve_from_rows(&parse_aftan(&text), select);
    if curve.periods.len() < 2 {
        warn!("aftan: '{name}' has fewer than two usable rows; file skipped");
        return Ok(None);
    }

    // Long periods first so the frequency axis comes out increasing.
    let mut order: Vec<usize> = (0..curve.periods.len()).collect();
    order.sort_by(|&a, &b| {
        curve.periods[b]
            .partial_cmp(&curve.periods[a])
            .expect("periods are finite")
    });

    let freq: Vec<f64> = order.iter().map(|&i| 1.0 / curve.periods[i]).collect();
    let time: Vec<f64> = order
        .iter()
        .map(|&i| pair.dist / curve.group_vels[i])
        .collect();
    let dist = vec![pair.dist; freq.len()];

    Ok(Some(DispersionCurve::new(name, freq, time, dist)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthConfig, generate_dataset, write_dataset};
    use crate::domain::QcConfig;

    fn run_config(dir: &std::path::Path) -> RunConfig {
        RunConfig {
            picks_dir: dir.join("picks"),
            format: PickFormat::Xdc,
            period_select: PeriodSelect::Centre,
            pairs_path: dir.join("pairs.csv"),
            min_freq_path: None,
            min_freq_default: 0.0,
            // Synthetic layouts can include short pairs; the separation
            // mask is exercised in the qc unit tests instead.
            qc: QcConfig {
                no_lambda: 0.0,
                min_travel_time: 0.0,
            },
            alerts_dir: None,
            raytomo_out: None,
            matrix_out: None,
            export_curves: None,
            output_periods: None,
        }
    }

    #[test]
    fn end_to_end_on_synthetic_dataset() {
        let dir = std::env::temp_dir().join("disp-curves-test-pipeline");
        let dataset = generate_dataset(&SynthConfig {
            n_stations: 4,
            ..SynthConfig::default()
        })
        .unwrap();
        write_dataset(&dataset, &dir).unwrap();

        let out = run_curves(&run_config(&dir)).unwrap();
        assert_eq!(out.qc.curves_in, 6);
        assert!(!out.grid.curves.is_empty());
        assert_eq!(out.periods.len(), 39);

        // Synthetic picks span 2..=25 s: the 10 s slot must be populated.
        let obs = out.table.at_period(10.0).unwrap();
        assert_eq!(obs.len(), out.grid.curves.len());

        // Every gridded curve carries interpolated values inside its range.
        for c in &out.grid.curves {
            let interp = c.interp.as_ref().unwrap();
            assert!(!interp.periods.is_empty());
            assert_eq!(interp.periods.len(), interp.vels.len());
        }
    }
}
