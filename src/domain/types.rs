//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during QC and gridding
//! - exported to JSON curve-set files
//! - reloaded later for plotting or comparisons

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use clap::ValueEnum;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, INPUT};

/// Which pick-file format the input directory contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PickFormat {
    /// aFTAN result files (period / group-velocity columns).
    Aftan,
    /// xdc instantaneous-frequency pick files.
    Xdc,
}

/// Which period column of an aFTAN result to use.
///
/// aFTAN reports both the centre period of the analysis filter and the
/// observed (instantaneous) period of the measured arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PeriodSelect {
    Centre,
    Observed,
}

impl std::fmt::Display for PickFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickFormat::Aftan => write!(f, "aftan"),
            PickFormat::Xdc => write!(f, "xdc"),
        }
    }
}

impl std::fmt::Display for PeriodSelect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodSelect::Centre => write!(f, "centre"),
            PeriodSelect::Observed => write!(f, "observed"),
        }
    }
}

/// Interpolated form of a curve, added by the period-grid stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpCurve {
    /// Target frequencies retained for this curve (increasing).
    pub freqs: Vec<f64>,
    /// The same targets expressed as periods (`1 / freq`).
    pub periods: Vec<f64>,
    /// Travel times interpolated at `freqs`.
    pub times: Vec<f64>,
    /// Group velocities derived as `dist[0] / time`.
    pub vels: Vec<f64>,
}

/// One inter-station dispersion curve.
///
/// `freq`, `time` and `dist` are parallel arrays (one entry per pick) and
/// must stay equal length. `freq` is expected to increase; violations are
/// flagged during gridding rather than rejected outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispersionCurve {
    /// Pair identifier in `STA1_STA2_CHN1_CHN2` format.
    pub name: String,
    pub freq: Vec<f64>,
    pub time: Vec<f64>,
    pub dist: Vec<f64>,
    /// Filled by the period-grid stage; `None` until then.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interp: Option<InterpCurve>,
}

impl DispersionCurve {
    pub fn new(name: impl Into<String>, freq: Vec<f64>, time: Vec<f64>, dist: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            freq,
            time,
            dist,
            interp: None,
        }
    }

    pub fn len(&self) -> usize {
        self.freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freq.is_empty()
    }

    /// The parallel-array invariant: `freq`, `time`, `dist` equal length.
    pub fn lengths_consistent(&self) -> bool {
        self.freq.len() == self.time.len() && self.freq.len() == self.dist.len()
    }

    /// True when every step of `freq` is non-decreasing.
    pub fn freq_is_sorted(&self) -> bool {
        self.freq.windows(2).all(|w| w[0] <= w[1])
    }

    /// `(STA1, STA2)` parsed from the pair name, if it is well-formed.
    pub fn station_codes(&self) -> Option<(&str, &str)> {
        let mut parts = self.name.split('_');
        let sta1 = parts.next()?;
        let sta2 = parts.next()?;
        Some((sta1, sta2))
    }
}

/// One row of the pair metadata table.
///
/// `network` and `station` hold both ends joined with `-` (`NET1-NET2`,
/// `STA1-STA2`), matching the measurement-run table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairInfo {
    pub name: String,
    pub network: String,
    pub station: String,
    /// Inter-station distance (km).
    pub dist: f64,
    pub lat_1: f64,
    pub lon_1: f64,
    pub el_1: f64,
    pub lat_2: f64,
    pub lon_2: f64,
    pub el_2: f64,
}

impl PairInfo {
    /// `(NET1, NET2)` split from the joined network field.
    pub fn networks(&self) -> Result<(&str, &str), AppError> {
        split_pair_field(&self.network, "network", &self.name)
    }

    /// `(STA1, STA2)` split from the joined station field.
    pub fn stations(&self) -> Result<(&str, &str), AppError> {
        split_pair_field(&self.station, "station", &self.name)
    }
}

fn split_pair_field<'a>(field: &'a str, label: &str, pair: &str) -> Result<(&'a str, &'a str), AppError> {
    let mut parts = field.splitn(2, '-');
    match (parts.next(), parts.next()) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => Ok((a, b)),
        _ => Err(AppError::new(
            INPUT,
            format!("Pair '{pair}': {label} field '{field}' is not in 'A-B' form."),
        )),
    }
}

/// Pair metadata table with name-keyed lookup.
#[derive(Debug, Clone, Default)]
pub struct PairTable {
    rows: Vec<PairInfo>,
    index: HashMap<String, usize>,
}

impl PairTable {
    pub fn from_rows(rows: Vec<PairInfo>) -> Self {
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self { rows, index }
    }

    pub fn get(&self, name: &str) -> Option<&PairInfo> {
        self.index.get(name).map(|&i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairInfo> {
        self.rows.iter()
    }

    /// Collapse both pair ends into a per-station coordinate map.
    ///
    /// Sorted by station code so downstream station lists (and the 1-based
    /// indices written for the inversion codes) are deterministic.
    pub fn station_coords(&self) -> Result<BTreeMap<String, (f64, f64, f64)>, AppError> {
        let mut out = BTreeMap::new();
        for row in &self.rows {
            let (sta1, sta2) = row.stations()?;
            out.insert(sta1.to_string(), (row.lat_1, row.lon_1, row.el_1));
            out.insert(sta2.to_string(), (row.lat_2, row.lon_2, row.el_2));
        }
        Ok(out)
    }
}

/// Instrument response as poles, zeros and scalars.
///
/// `gain` is the A0 normalization factor (the factor that pins the
/// pole-zero curve's amplitude at the normalization frequency); it is not
/// the total sensitivity. `sensitivity` converts physical units to counts
/// and is applied separately during deconvolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PolesZeros {
    pub poles: Vec<Complex64>,
    pub zeros: Vec<Complex64>,
    pub gain: f64,
    pub sensitivity: f64,
}

/// QC thresholds for dispersion curves.
#[derive(Debug, Clone, Copy)]
pub struct QcConfig {
    /// Number of wavelengths that must fit in the station separation.
    pub no_lambda: f64,
    /// Minimum pick travel time (s).
    pub min_travel_time: f64,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            no_lambda: 2.0,
            min_travel_time: 0.0,
        }
    }
}

/// A full `disp curves` run configuration, derived from CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub picks_dir: PathBuf,
    pub format: PickFormat,
    pub period_select: PeriodSelect,
    pub pairs_path: PathBuf,
    /// Per-station minimum-frequency table (CSV); `None` means the constant
    /// default below applies everywhere.
    pub min_freq_path: Option<PathBuf>,
    pub min_freq_default: f64,
    pub qc: QcConfig,
    /// Directory for non-monotonic-frequency alert figures.
    pub alerts_dir: Option<PathBuf>,
    pub raytomo_out: Option<PathBuf>,
    pub matrix_out: Option<PathBuf>,
    pub export_curves: Option<PathBuf>,
    /// Periods written by the exporters; defaults to the full target grid.
    pub output_periods: Option<Vec<f64>>,
}

/// One observation contributed by a curve at a target period.
#[derive(Debug, Clone, Copy)]
pub struct PeriodObservation {
    pub time: f64,
    pub dist: f64,
    pub lat_1: f64,
    pub lon_1: f64,
    pub el_1: f64,
    pub lat_2: f64,
    pub lon_2: f64,
    pub el_2: f64,
}

/// Observations sorted by target period (descending grid order).
#[derive(Debug, Clone, Default)]
pub struct PeriodTable {
    pub periods: Vec<f64>,
    pub observations: Vec<Vec<PeriodObservation>>,
}

impl PeriodTable {
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[PeriodObservation])> {
        self.periods
            .iter()
            .copied()
            .zip(self.observations.iter().map(|v| v.as_slice()))
    }

    /// Observations at one period, matched with a small tolerance since the
    /// grid values round-trip through `1/period` twice.
    pub fn at_period(&self, period: f64) -> Option<&[PeriodObservation]> {
        self.periods
            .iter()
            .position(|&p| (p - period).abs() < 1e-9)
            .map(|i| self.observations[i].as_slice())
    }
}

/// A saved curve-set file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveSetFile {
    pub tool: String,
    /// The target period grid in effect when the set was written.
    pub grid_periods: Vec<f64>,
    pub curves: Vec<DispersionCurve>,
}

/// Raw material for one non-monotonic-frequency alert figure.
#[derive(Debug, Clone)]
pub struct GridAlert {
    pub name: String,
    pub freq: Vec<f64>,
    pub time: Vec<f64>,
    pub interp_freqs: Vec<f64>,
    pub interp_times: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_fields_split() {
        let row = PairInfo {
            name: "AAA_BBB_HHZ_HHZ".to_string(),
            network: "XX-YY".to_string(),
            station: "AAA-BBB".to_string(),
            dist: 10.0,
            lat_1: 0.0,
            lon_1: 0.0,
            el_1: 0.0,
            lat_2: 1.0,
            lon_2: 1.0,
            el_2: 0.0,
        };
        assert_eq!(row.networks().unwrap(), ("XX", "YY"));
        assert_eq!(row.stations().unwrap(), ("AAA", "BBB"));
    }

    #[test]
    fn malformed_pair_field_is_an_error() {
        let row = PairInfo {
            name: "AAA_BBB_HHZ_HHZ".to_string(),
            network: "XXYY".to_string(),
            station: "AAA-BBB".to_string(),
            dist: 10.0,
            lat_1: 0.0,
            lon_1: 0.0,
            el_1: 0.0,
            lat_2: 1.0,
            lon_2: 1.0,
            el_2: 0.0,
        };
        assert!(row.networks().is_err());
    }

    #[test]
    fn station_coords_are_sorted_and_deduplicated() {
        let rows = vec![
            PairInfo {
                name: "B_C_HHZ_HHZ".to_string(),
                network: "XX-XX".to_string(),
                station: "B-C".to_string(),
                dist: 1.0,
                lat_1: 2.0,
                lon_1: 2.0,
                el_1: 0.0,
                lat_2: 3.0,
                lon_2: 3.0,
                el_2: 0.0,
            },
            PairInfo {
                name: "A_B_HHZ_HHZ".to_string(),
                network: "XX-XX".to_string(),
                station: "A-B".to_string(),
                dist: 1.0,
                lat_1: 1.0,
                lon_1: 1.0,
                el_1: 0.0,
                lat_2: 2.0,
                lon_2: 2.0,
                el_2: 0.0,
            },
        ];
        let table = PairTable::from_rows(rows);
        let coords = table.station_coords().unwrap();
        let names: Vec<_> = coords.keys().cloned().collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(coords["B"], (2.0, 2.0, 0.0));
    }

    #[test]
    fn freq_sorted_check() {
        let mut c = DispersionCurve::new(
            "A_B_HHZ_HHZ",
            vec![0.1, 0.2, 0.3],
            vec![10.0, 11.0, 12.0],
            vec![50.0, 50.0, 50.0],
        );
        assert!(c.freq_is_sorted());
        c.freq[1] = 0.35;
        assert!(!c.freq_is_sorted());
    }
}
