//! FDSN station web-service integration.
//!
//! Fetches station coordinates in the `format=text` flavor of the station
//! service and expands them into the pair table the pipeline joins
//! against. Only the station level is requested; responses are parsed
//! from the `|`-delimited rows:
//!
//! ```text
//! #Network|Station|Latitude|Longitude|Elevation|SiteName|StartTime|EndTime
//! ```

use reqwest::blocking::Client;

use crate::domain::{PairInfo, PairTable};
use crate::error::{AppError, INPUT, NUMERIC};
use crate::math::gc_distance_km;

const DEFAULT_BASE_URL: &str = "https://service.iris.edu";

/// One station row from the text response.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub network: String,
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub site_name: String,
}

pub struct FdsnClient {
    client: Client,
    base_url: String,
}

impl FdsnClient {
    /// Build a client; `FDSN_BASE_URL` in the environment (or `.env`)
    /// overrides the default data center.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url =
            std::env::var("FDSN_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// Query the station service for matching stations.
    pub fn fetch_stations(
        &self,
        network: &str,
        station: &str,
        channel: &str,
    ) -> Result<Vec<StationRecord>, AppError> {
        let url = format!("{}/fdsnws/station/1/query", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("net", network),
                ("sta", station),
                ("cha", channel),
                ("level", "station"),
                ("format", "text"),
            ])
            .send()
            .map_err(|e| AppError::new(NUMERIC, format!("FDSN request failed: {e}")))?;

        // 204 is the service's "no matching data" answer.
        if resp.status().as_u16() == 204 {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(AppError::new(
                NUMERIC,
                format!("FDSN request failed with status {}.", resp.status()),
            ));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::new(NUMERIC, format!("Failed to read FDSN response: {e}")))?;
        parse_station_text(&body)
    }
}

/// Parse the `format=text` station-level response body.
pub fn parse_station_text(text: &str) -> Result<Vec<StationRecord>, AppError> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() < 5 {
            return Err(AppError::new(
                INPUT,
                format!("FDSN text line {}: expected at least 5 '|' fields.", idx + 1),
            ));
        }
        let parse = |s: &str, what: &str| -> Result<f64, AppError> {
            s.parse::<f64>().map_err(|_| {
                AppError::new(INPUT, format!("FDSN text line {}: invalid {what} '{s}'.", idx + 1))
            })
        };
        let record = StationRecord {
            network: fields[0].to_string(),
            station: fields[1].to_string(),
            latitude: parse(fields[2], "latitude")?,
            longitude: parse(fields[3], "longitude")?,
            elevation: parse(fields[4], "elevation")?,
            site_name: fields.get(5).unwrap_or(&"").to_string(),
        };
        // Multiple epochs of the same station collapse to the first row.
        if !out
            .iter()
            .any(|r: &StationRecord| r.network == record.network && r.station == record.station)
        {
            out.push(record);
        }
    }
    Ok(out)
}

/// Expand station records into the all-pairs metadata table.
///
/// Pairs are ordered by station code on both ends, so the table (and the
/// pair names) come out deterministic regardless of service ordering.
pub fn pairs_from_stations(stations: &[StationRecord], channel: &str) -> PairTable {
    let mut sorted: Vec<&StationRecord> = stations.iter().collect();
    sorted.sort_by(|a, b| a.station.cmp(&b.station));

    let mut rows = Vec::new();
    for i in 0..sorted.len() {
        for j in i + 1..sorted.len() {
            let (a, b) = (sorted[i], sorted[j]);
            rows.push(PairInfo {
                name: format!("{}_{}_{}_{}", a.station, b.station, channel, channel),
                network: format!("{}-{}", a.network, b.network),
                station: format!("{}-{}", a.station, b.station),
                dist: gc_distance_km(a.latitude, a.longitude, b.latitude, b.longitude),
                lat_1: a.latitude,
                lon_1: a.longitude,
                el_1: a.elevation,
                lat_2: b.latitude,
                lon_2: b.longitude,
                el_2: b.elevation,
            });
        }
    }
    PairTable::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
#Network|Station|Latitude|Longitude|Elevation|SiteName|StartTime|EndTime
XX|AAA|50.0|10.0|120.0|Site A|2008-01-01T00:00:00|
XX|BBB|51.0|11.0|300.0|Site B|2008-01-01T00:00:00|
XX|AAA|50.0|10.0|120.0|Site A (new)|2015-01-01T00:00:00|
YY|CCC|50.5|10.5|200.0|Site C|2010-01-01T00:00:00|
";

    #[test]
    fn parses_and_deduplicates_epochs() {
        let recs = parse_station_text(SAMPLE).unwrap();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].station, "AAA");
        assert!((recs[1].latitude - 51.0).abs() < 1e-12);
    }

    #[test]
    fn bad_coordinate_is_an_error() {
        assert!(parse_station_text("XX|AAA|north|10.0|0.0|x|t|t\n").is_err());
    }

    #[test]
    fn all_pairs_with_distances() {
        let recs = parse_station_text(SAMPLE).unwrap();
        let pairs = pairs_from_stations(&recs, "HHZ");
        assert_eq!(pairs.len(), 3); // 3 stations -> 3 pairs

        let ab = pairs.get("AAA_BBB_HHZ_HHZ").unwrap();
        assert_eq!(ab.network, "XX-XX");
        // ~1 degree in both lat and lon at 50N: ~131 km.
        assert!((ab.dist - 131.0).abs() < 2.0, "got {}", ab.dist);

        let ac = pairs.get("AAA_CCC_HHZ_HHZ").unwrap();
        assert_eq!(ac.network, "XX-YY");
    }
}
