//! Quality control of dispersion curves.
//!
//! Three per-sample masks are combined and applied to every parallel array
//! of a curve:
//!
//! 1. sensor mask: `freq` below the pair's sensor minimum frequency
//!    (the max of both stations' minimums — the worse sensor wins)
//! 2. separation mask: picks whose implied wavelength times `no_lambda`
//!    exceeds the station separation
//! 3. travel-time mask: picks arriving before `min_travel_time`
//!
//! Curves left with fewer than two samples are dropped, as are curves
//! whose pair is missing from the metadata table. Mismatched array
//! lengths are a hard error: they mean the input files are corrupt, not
//! merely noisy.

use log::warn;

use crate::domain::{DispersionCurve, PairTable, QcConfig};
use crate::error::{AppError, INPUT};

/// Lookup seam for per-station minimum usable frequency.
///
/// Implemented by the CSV-backed table in `io::pairs` and by
/// [`ConstantMinFreq`] for single-sensor deployments.
pub trait MinFreqLookup {
    fn min_freq(&self, network: &str, station: &str) -> f64;
}

/// The same minimum frequency for every station.
#[derive(Debug, Clone, Copy)]
pub struct ConstantMinFreq(pub f64);

impl MinFreqLookup for ConstantMinFreq {
    fn min_freq(&self, _network: &str, _station: &str) -> f64 {
        self.0
    }
}

/// Counts and names collected while filtering.
#[derive(Debug, Clone, Default)]
pub struct QcSummary {
    pub curves_in: usize,
    pub curves_kept: usize,
    pub samples_in: usize,
    pub samples_kept: usize,
    /// Curves dropped because their pair is not in the metadata table.
    pub missing_pairs: Vec<String>,
    /// Curves that lost samples to the sensor minimum-frequency mask.
    pub sensor_limited: Vec<String>,
    /// Curves that lost samples to the separation (wavelength) mask.
    pub separation_limited: Vec<String>,
    /// Curves dropped for ending up with fewer than two samples.
    pub too_short: Vec<String>,
}

/// Apply QC masks to every curve, dropping the ones that do not survive.
pub fn qc_curves(
    curves: Vec<DispersionCurve>,
    pairs: &PairTable,
    min_freq: &dyn MinFreqLookup,
    cfg: &QcConfig,
) -> Result<(Vec<DispersionCurve>, QcSummary), AppError> {
    let mut summary = QcSummary {
        curves_in: curves.len(),
        ..QcSummary::default()
    };
    let mut kept = Vec::with_capacity(curves.len());

    for mut curve in curves {
        summary.samples_in += curve.len();

        if !curve.lengths_consistent() {
            return Err(AppError::new(
                INPUT,
                format!(
                    "Curve '{}': freq/time/dist arrays have different lengths ({}/{}/{}).",
                    curve.name,
                    curve.freq.len(),
                    curve.time.len(),
                    curve.dist.len()
                ),
            ));
        }

        let Some(pair) = pairs.get(&curve.name) else {
            warn!("qc: no pair metadata for '{}'; curve dropped", curve.name);
            summary.missing_pairs.push(curve.name.clone());
            continue;
        };

        let (net1, net2) = pair.networks()?;
        let (sta1, sta2) = pair.stations()?;
        let sensor_min_freq = min_freq
            .min_freq(net1, sta1)
            .max(min_freq.min_freq(net2, sta2));

        let mut sensor_hits = 0usize;
        let mut separation_hits = 0usize;
        let keep: Vec<bool> = (0..curve.len())
            .map(|i| {
                let sensor = curve.freq[i] < sensor_min_freq;
                // Implied wavelength: velocity over frequency, per pick.
                let wavelength = (curve.dist[i] / curve.time[i]) / curve.freq[i];
                let separation = cfg.no_lambda * wavelength > pair.dist;
                let early = curve.time[i] < cfg.min_travel_time;
                sensor_hits += usize::from(sensor);
                separation_hits += usize::from(separation);
                !(sensor || separation || early)
            })
            .collect();

        if sensor_hits > 0 {
            warn!("qc: sensor limits applied to {}", pair.station);
            summary.sensor_limited.push(curve.name.clone());
        }
        if separation_hits > 0 {
            warn!("qc: pair separation limits applied to {}", pair.station);
            summary.separation_limited.push(curve.name.clone());
        }

        apply_mask(&mut curve, &keep);

        if curve.len() < 2 {
            summary.too_short.push(curve.name.clone());
            continue;
        }
        summary.samples_kept += curve.len();
        kept.push(curve);
    }

    summary.curves_kept = kept.len();
    Ok((kept, summary))
}

fn apply_mask(curve: &mut DispersionCurve, keep: &[bool]) {
    let filter = |v: &[f64]| -> Vec<f64> {
        v.iter()
            .zip(keep)
            .filter_map(|(&x, &k)| k.then_some(x))
            .collect()
    };
    curve.freq = filter(&curve.freq);
    curve.time = filter(&curve.time);
    curve.dist = filter(&curve.dist);
    // Any previously interpolated values are stale after masking.
    curve.interp = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PairInfo, QcConfig};

    fn pair_table(dist: f64) -> PairTable {
        PairTable::from_rows(vec![PairInfo {
            name: "AAA_BBB_HHZ_HHZ".to_string(),
            network: "XX-XX".to_string(),
            station: "AAA-BBB".to_string(),
            dist,
            lat_1: 50.0,
            lon_1: 10.0,
            el_1: 0.0,
            lat_2: 51.0,
            lon_2: 11.0,
            el_2: 0.0,
        }])
    }

    fn curve() -> DispersionCurve {
        // Velocity 3 km/s everywhere: wavelengths are 3/f km.
        DispersionCurve::new(
            "AAA_BBB_HHZ_HHZ",
            vec![0.02, 0.05, 0.1, 0.2, 0.5],
            vec![50.0, 50.0, 50.0, 50.0, 50.0],
            vec![150.0; 5],
        )
    }

    #[test]
    fn sensor_mask_removes_low_frequencies() {
        let (kept, summary) = qc_curves(
            vec![curve()],
            &pair_table(1e6),
            &ConstantMinFreq(0.04),
            &QcConfig {
                no_lambda: 0.0,
                min_travel_time: 0.0,
            },
        )
        .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].len(), 4);
        assert!(kept[0].freq.iter().all(|&f| f >= 0.04));
        assert_eq!(summary.sensor_limited, vec!["AAA_BBB_HHZ_HHZ"]);
    }

    #[test]
    fn separation_mask_removes_long_wavelengths() {
        // dist 150 km, no_lambda 2: wavelength > 75 km fails, i.e. f < 0.04.
        let (kept, summary) = qc_curves(
            vec![curve()],
            &pair_table(150.0),
            &ConstantMinFreq(0.0),
            &QcConfig {
                no_lambda: 2.0,
                min_travel_time: 0.0,
            },
        )
        .unwrap();
        assert_eq!(kept[0].len(), 4);
        assert!(!summary.separation_limited.is_empty());
    }

    #[test]
    fn qc_never_increases_length_and_keeps_at_least_two() {
        let before = curve().len();
        let (kept, _) = qc_curves(
            vec![curve()],
            &pair_table(150.0),
            &ConstantMinFreq(0.04),
            &QcConfig::default(),
        )
        .unwrap();
        for c in &kept {
            assert!(c.len() <= before);
            assert!(c.len() >= 2);
        }
    }

    #[test]
    fn short_survivors_are_dropped() {
        // min_freq above all but one sample leaves 1 < 2 picks.
        let (kept, summary) = qc_curves(
            vec![curve()],
            &pair_table(1e6),
            &ConstantMinFreq(0.3),
            &QcConfig {
                no_lambda: 0.0,
                min_travel_time: 0.0,
            },
        )
        .unwrap();
        assert!(kept.is_empty());
        assert_eq!(summary.too_short, vec!["AAA_BBB_HHZ_HHZ"]);
        assert_eq!(summary.curves_kept, 0);
    }

    #[test]
    fn unknown_pair_is_dropped_not_fatal() {
        let mut c = curve();
        c.name = "NOPE_PAIR_HHZ_HHZ".to_string();
        let (kept, summary) = qc_curves(
            vec![c],
            &pair_table(150.0),
            &ConstantMinFreq(0.0),
            &QcConfig::default(),
        )
        .unwrap();
        assert!(kept.is_empty());
        assert_eq!(summary.missing_pairs, vec!["NOPE_PAIR_HHZ_HHZ"]);
    }

    #[test]
    fn mismatched_lengths_are_fatal() {
        let mut c = curve();
        c.time.pop();
        let err = qc_curves(
            vec![c],
            &pair_table(150.0),
            &ConstantMinFreq(0.0),
            &QcConfig::default(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn min_travel_time_mask() {
        let mut c = curve();
        c.time = vec![5.0, 50.0, 50.0, 50.0, 8.0];
        let (kept, _) = qc_curves(
            vec![c],
            &pair_table(1e6),
            &ConstantMinFreq(0.0),
            &QcConfig {
                no_lambda: 0.0,
                min_travel_time: 10.0,
            },
        )
        .unwrap();
        assert_eq!(kept[0].len(), 3);
        assert!(kept[0].time.iter().all(|&t| t >= 10.0));
    }
}
