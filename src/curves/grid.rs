//! Interpolation of QC'd curves onto the canonical period grid.
//!
//! The grid is descending (long periods first) to match the order the
//! inversion decks are assembled in; the interpolation itself runs on the
//! equivalent ascending frequency list.

use log::warn;

use crate::domain::{DispersionCurve, GridAlert, InterpCurve, PairTable, PeriodObservation, PeriodTable};
use crate::error::{AppError, INPUT};
use crate::math::interp_many;

/// Tolerance for matching a grid period against a curve's retained periods
/// (the values round-trip through `1/period` twice).
const PERIOD_EPS: f64 = 1e-9;

/// The canonical target period grid (s), descending:
/// 1.0–9.5 s in 0.5 s steps plus 10–30 s in 1 s steps.
pub fn target_period_grid() -> Vec<f64> {
    let mut periods: Vec<f64> = Vec::with_capacity(39);
    let mut p = 1.0;
    while p < 10.0 - 1e-9 {
        periods.push(p);
        p += 0.5;
    }
    let mut p = 10.0;
    while p <= 30.0 + 1e-9 {
        periods.push(p);
        p += 1.0;
    }
    periods.reverse();
    periods
}

/// Output of the gridding stage.
#[derive(Debug, Clone, Default)]
pub struct GridOutcome {
    /// Curves that retained at least one target period, with `interp` set.
    pub curves: Vec<DispersionCurve>,
    /// Curves whose frequency array decreases somewhere in the interior.
    pub alerts: Vec<GridAlert>,
    /// Curves dropped for covering none of the target periods.
    pub dropped_out_of_range: usize,
}

/// Interpolate every curve's travel time onto the target periods.
///
/// Target frequencies outside a curve's observed range are discarded, not
/// extrapolated. A globally decreasing frequency array is a hard error
/// (the curve was assembled wrong); an interior decrease only produces an
/// alert, since instantaneous-frequency picks do this legitimately.
pub fn interpolate_onto_grid(
    curves: Vec<DispersionCurve>,
    periods: &[f64],
) -> Result<GridOutcome, AppError> {
    let mut outcome = GridOutcome::default();

    for mut curve in curves {
        if curve.len() < 2 {
            outcome.dropped_out_of_range += 1;
            continue;
        }
        let first = curve.freq[0];
        let last = curve.freq[curve.len() - 1];
        if first > last {
            return Err(AppError::new(
                INPUT,
                format!("Curve '{}': frequency array is decreasing; curves must be assembled low-to-high frequency.", curve.name),
            ));
        }

        let f_min = curve.freq.iter().copied().fold(f64::INFINITY, f64::min);
        let f_max = curve.freq.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // Descending periods become ascending frequencies.
        let freqs: Vec<f64> = periods
            .iter()
            .map(|&p| 1.0 / p)
            .filter(|&f| f >= f_min && f <= f_max)
            .collect();

        if freqs.is_empty() {
            outcome.dropped_out_of_range += 1;
            continue;
        }

        let times = interp_many(&freqs, &curve.freq, &curve.time);
        let vels: Vec<f64> = times.iter().map(|&t| curve.dist[0] / t).collect();

        if !curve.freq_is_sorted() {
            warn!("grid: '{}' has a frequency decrease; flagged for inspection", curve.name);
            outcome.alerts.push(GridAlert {
                name: curve.name.clone(),
                freq: curve.freq.clone(),
                time: curve.time.clone(),
                interp_freqs: freqs.clone(),
                interp_times: times.clone(),
            });
        }

        curve.interp = Some(InterpCurve {
            periods: freqs.iter().map(|&f| 1.0 / f).collect(),
            freqs,
            times,
            vels,
        });
        outcome.curves.push(curve);
    }

    Ok(outcome)
}

/// Sort interpolated observations into a per-period table, joining pair
/// coordinates from the metadata table.
pub fn build_period_table(
    curves: &[DispersionCurve],
    pairs: &PairTable,
    periods: &[f64],
) -> PeriodTable {
    let mut table = PeriodTable {
        periods: periods.to_vec(),
        observations: vec![Vec::new(); periods.len()],
    };

    for curve in curves {
        let Some(interp) = curve.interp.as_ref() else {
            continue;
        };
        let Some(pair) = pairs.get(&curve.name) else {
            warn!("period table: no pair metadata for '{}'", curve.name);
            continue;
        };

        for (slot, &per) in table.observations.iter_mut().zip(periods) {
            let hit = interp
                .periods
                .iter()
                .position(|&p| (p - per).abs() < PERIOD_EPS);
            if let Some(i) = hit {
                slot.push(PeriodObservation {
                    time: interp.times[i],
                    dist: pair.dist,
                    lat_1: pair.lat_1,
                    lon_1: pair.lon_1,
                    el_1: pair.el_1,
                    lat_2: pair.lat_2,
                    lon_2: pair.lon_2,
                    el_2: pair.el_2,
                });
            }
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PairInfo;

    fn pair_table() -> PairTable {
        PairTable::from_rows(vec![PairInfo {
            name: "AAA_BBB_HHZ_HHZ".to_string(),
            network: "XX-XX".to_string(),
            station: "AAA-BBB".to_string(),
            dist: 180.0,
            lat_1: 50.0,
            lon_1: 10.0,
            el_1: 100.0,
            lat_2: 51.0,
            lon_2: 11.0,
            el_2: 200.0,
        }])
    }

    fn wide_curve() -> DispersionCurve {
        // Covers 0.04..0.5 Hz, i.e. periods 2..25 s.
        DispersionCurve::new(
            "AAA_BBB_HHZ_HHZ",
            vec![0.04, 0.1, 0.2, 0.5],
            vec![60.0, 55.0, 52.0, 50.0],
            vec![180.0; 4],
        )
    }

    #[test]
    fn grid_is_descending_with_expected_ends() {
        let grid = target_period_grid();
        assert_eq!(grid.len(), 39);
        assert!((grid[0] - 30.0).abs() < 1e-12);
        assert!((grid[grid.len() - 1] - 1.0).abs() < 1e-12);
        assert!(grid.windows(2).all(|w| w[0] > w[1]));
        assert!(grid.contains(&9.5));
        assert!(grid.contains(&10.0));
    }

    #[test]
    fn retained_periods_stay_inside_observed_range() {
        let out = interpolate_onto_grid(vec![wide_curve()], &target_period_grid()).unwrap();
        assert_eq!(out.curves.len(), 1);
        let interp = out.curves[0].interp.as_ref().unwrap();
        assert!(!interp.periods.is_empty());
        for &p in &interp.periods {
            assert!(p >= 2.0 - 1e-9 && p <= 25.0 + 1e-9, "period {p} out of range");
        }
        assert_eq!(interp.freqs.len(), interp.times.len());
        assert_eq!(interp.freqs.len(), interp.vels.len());
    }

    #[test]
    fn velocity_is_distance_over_time() {
        let out = interpolate_onto_grid(vec![wide_curve()], &target_period_grid()).unwrap();
        let interp = out.curves[0].interp.as_ref().unwrap();
        for (t, v) in interp.times.iter().zip(&interp.vels) {
            assert!((v - 180.0 / t).abs() < 1e-12);
        }
    }

    #[test]
    fn non_overlapping_curve_is_dropped() {
        // 1..2 Hz picks: periods 0.5..1 s, entirely below the grid.
        let c = DispersionCurve::new(
            "AAA_BBB_HHZ_HHZ",
            vec![1.1, 1.5, 2.0],
            vec![10.0, 9.0, 8.0],
            vec![30.0; 3],
        );
        let out = interpolate_onto_grid(vec![c], &target_period_grid()).unwrap();
        assert!(out.curves.is_empty());
        assert_eq!(out.dropped_out_of_range, 1);
    }

    #[test]
    fn decreasing_frequency_array_is_fatal() {
        let c = DispersionCurve::new(
            "AAA_BBB_HHZ_HHZ",
            vec![0.5, 0.2, 0.1],
            vec![50.0, 52.0, 55.0],
            vec![180.0; 3],
        );
        assert!(interpolate_onto_grid(vec![c], &target_period_grid()).is_err());
    }

    #[test]
    fn interior_decrease_only_raises_an_alert() {
        let c = DispersionCurve::new(
            "AAA_BBB_HHZ_HHZ",
            vec![0.04, 0.21, 0.2, 0.5],
            vec![60.0, 55.0, 52.0, 50.0],
            vec![180.0; 4],
        );
        let out = interpolate_onto_grid(vec![c], &target_period_grid()).unwrap();
        assert_eq!(out.curves.len(), 1);
        assert_eq!(out.alerts.len(), 1);
        assert_eq!(out.alerts[0].name, "AAA_BBB_HHZ_HHZ");
    }

    #[test]
    fn period_table_joins_pair_coordinates() {
        let grid = target_period_grid();
        let out = interpolate_onto_grid(vec![wide_curve()], &grid).unwrap();
        let table = build_period_table(&out.curves, &pair_table(), &grid);

        let obs = table.at_period(10.0).unwrap();
        assert_eq!(obs.len(), 1);
        assert!((obs[0].dist - 180.0).abs() < 1e-12);
        assert!((obs[0].lat_2 - 51.0).abs() < 1e-12);
        // 0.1 Hz is an input sample: time interpolates exactly.
        assert!((obs[0].time - 55.0).abs() < 1e-9);

        // 30 s is outside the curve's range: no observations.
        assert!(table.at_period(30.0).unwrap().is_empty());
    }
}
