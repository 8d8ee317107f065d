//! Synthetic demo datasets.
//!
//! `disp sample` scaffolds a working input set — a station layout, the
//! pair table and one xdc-format pick file per pair — from a smooth
//! group-velocity model plus Gaussian pick noise. Deterministic for a
//! given seed so the same command always produces the same files.

use std::fs;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DispersionCurve, PairInfo, PairTable};
use crate::error::{AppError, INPUT, NUMERIC};
use crate::math::gc_distance_km;

/// Group velocity (km/s) of the reference model at period `t` (s).
///
/// A gently increasing curve in the 2.6–3.6 km/s band, typical for
/// crustal Rayleigh waves at 1–30 s.
fn model_group_vel(t: f64) -> f64 {
    2.6 + 1.0 * ((t - 1.0) / 29.0).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub n_stations: usize,
    pub seed: u64,
    pub center_lat: f64,
    pub center_lon: f64,
    /// Std dev of the station scatter around the center (degrees).
    pub scatter_deg: f64,
    /// Std dev of the pick velocity noise (km/s).
    pub vel_noise: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            n_stations: 6,
            seed: 42,
            center_lat: 50.0,
            center_lon: 10.0,
            scatter_deg: 0.8,
            vel_noise: 0.03,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub pairs: PairTable,
    pub curves: Vec<DispersionCurve>,
}

/// Generate a station layout and per-pair dispersion picks.
pub fn generate_dataset(config: &SynthConfig) -> Result<SyntheticDataset, AppError> {
    if config.n_stations < 2 {
        return Err(AppError::new(INPUT, "Sample generation needs at least 2 stations."));
    }
    if !(config.vel_noise.is_finite() && config.vel_noise >= 0.0) {
        return Err(AppError::new(INPUT, "Invalid velocity noise setting."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let scatter = Normal::new(0.0, config.scatter_deg)
        .map_err(|e| AppError::new(NUMERIC, format!("Scatter distribution error: {e}")))?;
    let noise = Normal::new(0.0, config.vel_noise)
        .map_err(|e| AppError::new(NUMERIC, format!("Noise distribution error: {e}")))?;

    // Station layout.
    let mut stations = Vec::with_capacity(config.n_stations);
    for i in 0..config.n_stations {
        let code = format!("S{:02}", i + 1);
        let lat = config.center_lat + scatter.sample(&mut rng);
        let lon = config.center_lon + scatter.sample(&mut rng);
        let el = rng.gen_range(0.0..1500.0_f64).round();
        stations.push((code, lat, lon, el));
    }

    // All pairs + one curve per pair.
    let mut rows = Vec::new();
    let mut curves = Vec::new();
    for i in 0..stations.len() {
        for j in i + 1..stations.len() {
            let (code1, lat1, lon1, el1) = stations[i].clone();
            let (code2, lat2, lon2, el2) = stations[j].clone();
            let dist = gc_distance_km(lat1, lon1, lat2, lon2);
            let name = format!("{code1}_{code2}_HHZ_HHZ");

            rows.push(PairInfo {
                name: name.clone(),
                network: "XS-XS".to_string(),
                station: format!("{code1}-{code2}"),
                dist,
                lat_1: lat1,
                lon_1: lon1,
                el_1: el1,
                lat_2: lat2,
                lon_2: lon2,
                el_2: el2,
            });

            // Periods 2..=25 s, emitted long-period-last so the frequency
            // axis comes out increasing.
            let mut freq = Vec::new();
            let mut time = Vec::new();
            let mut dist_col = Vec::new();
            for k in (0..24).rev() {
                let period = 2.0 + k as f64;
                let vel = (model_group_vel(period) + noise.sample(&mut rng)).max(0.5);
                freq.push(1.0 / period);
                time.push(dist / vel);
                dist_col.push(dist);
            }
            curves.push(DispersionCurve::new(name, freq, time, dist_col));
        }
    }

    Ok(SyntheticDataset {
        pairs: PairTable::from_rows(rows),
        curves,
    })
}

/// Write the dataset as pipeline inputs: `pairs.csv` + `picks/<name>.txt`
/// in xdc pick format.
pub fn write_dataset(dataset: &SyntheticDataset, outdir: &Path) -> Result<(), AppError> {
    let picks_dir = outdir.join("picks");
    fs::create_dir_all(&picks_dir).map_err(|e| AppError::io("create directory", &picks_dir, e))?;

    crate::io::pairs::write_pair_table_csv(&outdir.join("pairs.csv"), &dataset.pairs)?;

    for curve in &dataset.curves {
        let mut body = String::new();
        for i in 0..curve.len() {
            body.push_str(&format!(
                "{:.6} {:.6} {:.4} {:.4} 0 0\n",
                curve.freq[i], curve.freq[i], curve.time[i], curve.dist[i]
            ));
        }
        let path = picks_dir.join(format!("{}.txt", curve.name));
        fs::write(&path, body).map_err(|e| AppError::io("write pick file", &path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_a_seed() {
        let cfg = SynthConfig::default();
        let a = generate_dataset(&cfg).unwrap();
        let b = generate_dataset(&cfg).unwrap();
        assert_eq!(a.curves.len(), b.curves.len());
        assert_eq!(a.curves[0].freq, b.curves[0].freq);
        assert_eq!(a.curves[0].time, b.curves[0].time);
    }

    #[test]
    fn pair_count_and_consistency() {
        let cfg = SynthConfig {
            n_stations: 5,
            ..SynthConfig::default()
        };
        let data = generate_dataset(&cfg).unwrap();
        assert_eq!(data.pairs.len(), 10);
        assert_eq!(data.curves.len(), 10);
        for c in &data.curves {
            assert!(c.lengths_consistent());
            assert!(c.freq_is_sorted());
            assert!(data.pairs.get(&c.name).is_some());
        }
    }

    #[test]
    fn times_are_plausible_travel_times() {
        let data = generate_dataset(&SynthConfig::default()).unwrap();
        for c in &data.curves {
            for (t, d) in c.time.iter().zip(&c.dist) {
                let vel = d / t;
                assert!(vel > 1.0 && vel < 5.0, "velocity {vel} out of band");
            }
        }
    }

    #[test]
    fn too_few_stations_is_an_error() {
        let cfg = SynthConfig {
            n_stations: 1,
            ..SynthConfig::default()
        };
        assert!(generate_dataset(&cfg).is_err());
    }
}
