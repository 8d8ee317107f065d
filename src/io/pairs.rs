//! Pair-table and minimum-frequency CSV ingest.
//!
//! This module turns the measurement-run CSVs into lookup tables that are
//! safe to join against dispersion curves.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden fallbacks beyond the documented
//!   distance computation)

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::curves::MinFreqLookup;
use crate::domain::{PairInfo, PairTable};
use crate::error::{AppError, INPUT};
use crate::math::gc_distance_km;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Pair-table ingest output.
#[derive(Debug, Clone)]
pub struct LoadedPairs {
    pub table: PairTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

const PAIR_COLUMNS: [&str; 10] = [
    "name", "network", "station", "dist", "lat_1", "lon_1", "el_1", "lat_2", "lon_2", "el_2",
];

/// Load the pair metadata table.
///
/// `dist` may be left blank, in which case the great-circle distance
/// between the two ends is filled in from the coordinates.
pub fn load_pair_table(path: &Path) -> Result<LoadedPairs, AppError> {
    let file = File::open(path).map_err(|e| AppError::io("open pair table", path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(INPUT, format!("Failed to read pair-table headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for col in PAIR_COLUMNS {
        if !header_map.contains_key(col) {
            return Err(AppError::new(
                INPUT,
                format!("Pair table is missing required column: `{col}`"),
            ));
        }
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_pair_row(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    Ok(LoadedPairs {
        table: PairTable::from_rows(rows),
        row_errors,
        rows_read,
    })
}

fn parse_pair_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<PairInfo, String> {
    let name = get_required(record, header_map, "name")?.to_string();
    let network = get_required(record, header_map, "network")?.to_string();
    let station = get_required(record, header_map, "station")?.to_string();

    let lat_1 = parse_f64(get_required(record, header_map, "lat_1")?, "lat_1")?;
    let lon_1 = parse_f64(get_required(record, header_map, "lon_1")?, "lon_1")?;
    let el_1 = parse_f64(get_required(record, header_map, "el_1")?, "el_1")?;
    let lat_2 = parse_f64(get_required(record, header_map, "lat_2")?, "lat_2")?;
    let lon_2 = parse_f64(get_required(record, header_map, "lon_2")?, "lon_2")?;
    let el_2 = parse_f64(get_required(record, header_map, "el_2")?, "el_2")?;

    let dist = match get_optional(record, header_map, "dist") {
        Some(s) => {
            let d = parse_f64(s, "dist")?;
            if !(d.is_finite() && d > 0.0) {
                return Err("Invalid `dist` (must be finite and > 0).".to_string());
            }
            d
        }
        None => gc_distance_km(lat_1, lon_1, lat_2, lon_2),
    };

    Ok(PairInfo {
        name,
        network,
        station,
        dist,
        lat_1,
        lon_1,
        el_1,
        lat_2,
        lon_2,
        el_2,
    })
}

/// Per-station minimum usable frequency, keyed by `(network, station)`.
///
/// Stations absent from the table fall back to the default (typically the
/// corner of the most common sensor in the deployment).
#[derive(Debug, Clone)]
pub struct MinFreqTable {
    map: HashMap<(String, String), f64>,
    default: f64,
}

impl MinFreqTable {
    pub fn constant(default: f64) -> Self {
        Self {
            map: HashMap::new(),
            default,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl MinFreqLookup for MinFreqTable {
    fn min_freq(&self, network: &str, station: &str) -> f64 {
        self.map
            .get(&(network.to_string(), station.to_string()))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Load a minimum-frequency table (`network,station,min_freq`).
pub fn load_min_freq_table(path: &Path, default: f64) -> Result<MinFreqTable, AppError> {
    let file = File::open(path).map_err(|e| AppError::io("open min-freq table", path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(INPUT, format!("Failed to read min-freq headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for col in ["network", "station", "min_freq"] {
        if !header_map.contains_key(col) {
            return Err(AppError::new(
                INPUT,
                format!("Min-freq table is missing required column: `{col}`"),
            ));
        }
    }

    let mut map = HashMap::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record =
            result.map_err(|e| AppError::new(INPUT, format!("Min-freq line {line}: {e}")))?;
        let network = get_required(&record, &header_map, "network")
            .map_err(|m| AppError::new(INPUT, format!("Min-freq line {line}: {m}")))?;
        let station = get_required(&record, &header_map, "station")
            .map_err(|m| AppError::new(INPUT, format!("Min-freq line {line}: {m}")))?;
        let freq = get_required(&record, &header_map, "min_freq")
            .map_err(|m| AppError::new(INPUT, format!("Min-freq line {line}: {m}")))
            .and_then(|s| {
                s.parse::<f64>()
                    .map_err(|_| AppError::new(INPUT, format!("Min-freq line {line}: invalid `min_freq`.")))
            })?;
        map.insert((network.to_string(), station.to_string()), freq);
    }

    Ok(MinFreqTable { map, default })
}

/// Write a pair table back out in the ingest schema.
pub fn write_pair_table_csv(path: &Path, table: &PairTable) -> Result<(), AppError> {
    use std::io::Write;

    let mut file = File::create(path).map_err(|e| AppError::io("create pair table", path, e))?;
    writeln!(file, "{}", PAIR_COLUMNS.join(","))
        .map_err(|e| AppError::io("write pair table", path, e))?;
    for row in table.iter() {
        writeln!(
            file,
            "{},{},{},{:.4},{:.5},{:.5},{:.1},{:.5},{:.5},{:.1}",
            row.name,
            row.network,
            row.station,
            row.dist,
            row.lat_1,
            row.lon_1,
            row.el_1,
            row.lat_2,
            row.lon_2,
            row.el_2
        )
        .map_err(|e| AppError::io("write pair table", path, e))?;
    }
    Ok(())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM;
    // strip it or schema validation reports a bogus missing column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{s}'."))
}
