//! Terminal summaries for processing runs.

use std::path::Path;

use crate::curves::{GridOutcome, QcSummary};
use crate::domain::{PeriodTable, PolesZeros, RunConfig};

/// Per-period velocity spread, derived from the observation table.
#[derive(Debug, Clone, Copy)]
pub struct PeriodStats {
    pub period: f64,
    pub count: usize,
    pub vel_min: f64,
    pub vel_max: f64,
    pub vel_std: f64,
}

/// Compute velocity statistics per period (ascending period order).
pub fn period_stats(table: &PeriodTable) -> Vec<PeriodStats> {
    let mut stats: Vec<PeriodStats> = table
        .iter()
        .filter(|(_, obs)| !obs.is_empty())
        .map(|(period, obs)| {
            let vels: Vec<f64> = obs.iter().map(|o| o.dist / o.time).collect();
            let n = vels.len() as f64;
            let mean = vels.iter().sum::<f64>() / n;
            let var = vels.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            let vel_min = vels.iter().copied().fold(f64::INFINITY, f64::min);
            let vel_max = vels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            PeriodStats {
                period,
                count: vels.len(),
                vel_min,
                vel_max,
                vel_std: var.sqrt(),
            }
        })
        .collect();
    stats.sort_by(|a, b| a.period.partial_cmp(&b.period).expect("periods are finite"));
    stats
}

/// Format the full run summary (inputs + QC counts + per-period spread).
pub fn format_run_summary(
    config: &RunConfig,
    qc: &QcSummary,
    grid: &GridOutcome,
    table: &PeriodTable,
) -> String {
    let mut out = String::new();

    out.push_str("=== disp - dispersion curve processing ===\n");
    out.push_str(&format!("Picks: {} ({})\n", config.picks_dir.display(), config.format));
    out.push_str(&format!("Pairs: {}\n", config.pairs_path.display()));
    out.push_str(&format!(
        "QC: no_lambda={} min_travel_time={}s\n",
        config.qc.no_lambda, config.qc.min_travel_time
    ));

    out.push_str(&format!(
        "Curves: {} in | {} past QC | {} gridded ({} out of grid range)\n",
        qc.curves_in,
        qc.curves_kept,
        grid.curves.len(),
        grid.dropped_out_of_range
    ));
    out.push_str(&format!(
        "Samples: {} in | {} kept\n",
        qc.samples_in, qc.samples_kept
    ));
    if !qc.missing_pairs.is_empty() {
        out.push_str(&format!("Dropped (no pair metadata): {}\n", qc.missing_pairs.join(", ")));
    }
    if !qc.too_short.is_empty() {
        out.push_str(&format!("Dropped (fewer than 2 picks): {}\n", qc.too_short.join(", ")));
    }

    out.push_str("\nVelocity spread per period:\n");
    for s in period_stats(table) {
        out.push_str(&format!(
            "Period: {:.6} s, n {:3}  min {:.6} max {:.6} stddev {:.6}\n",
            s.period, s.count, s.vel_min, s.vel_max, s.vel_std
        ));
    }

    out
}

/// Notice printed when alert figures were written.
pub fn format_alert_notice(count: usize, dir: &Path) -> String {
    let mut out = String::new();
    out.push_str("**********\n");
    out.push_str(&format!(
        " Warning: {count} dispersion curve(s) had a decrease in freq at some point\n"
    ));
    out.push_str(&format!(
        " check the interpolation with the figures in {}\n",
        dir.display()
    ));
    out.push_str("**********\n");
    out
}

/// Short pole-zero summary for `disp paz`.
pub fn format_paz_summary(label: &str, paz: &PolesZeros) -> String {
    let mut out = String::new();
    out.push_str(&format!("Response: {label}\n"));
    out.push_str(&format!("- zeros ({}):\n", paz.zeros.len()));
    for z in &paz.zeros {
        out.push_str(&format!("    {:+.6e} {:+.6e}i\n", z.re, z.im));
    }
    out.push_str(&format!("- poles ({}):\n", paz.poles.len()));
    for p in &paz.poles {
        out.push_str(&format!("    {:+.6e} {:+.6e}i\n", p.re, p.im));
    }
    out.push_str(&format!("- gain (A0)   : {:.6e}\n", paz.gain));
    out.push_str(&format!("- sensitivity : {:.6e}\n", paz.sensitivity));
    out
}
