//! Input decks for the two external tomography codes.
//!
//! Both exporters render every file to a string first and only then touch
//! the filesystem, so identical inputs always produce byte-identical
//! output (and tests can check the rendered text without a scratch
//! directory).

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use nalgebra::DMatrix;

use crate::domain::{DispersionCurve, PairTable, PeriodTable};
use crate::error::AppError;

/// A rendered output file: path relative to the export directory + content.
pub type RenderedFile = (PathBuf, String);

/// Render the straight-ray linear inversion deck.
///
/// - `rays/raysNN.dat`: one file per output period with observations,
///   numbered 01, 02, … in ascending period order; rows are
///   `lat1 lon1 el1 lat2 lon2 el2 time` (fixed width).
/// - `periods.dat`: the periods actually written, one per line.
/// - `stations.dat`: `lon lat el` per station, sorted by station code.
pub fn render_raytomo(
    table: &PeriodTable,
    pairs: &PairTable,
    output_periods: &[f64],
) -> Result<Vec<RenderedFile>, AppError> {
    let mut files = Vec::new();
    let mut periods_dat = String::new();

    let mut sorted_periods = output_periods.to_vec();
    sorted_periods.sort_by(|a, b| a.partial_cmp(b).expect("periods are finite"));

    let mut n = 0usize;
    for per in sorted_periods {
        let Some(obs) = table.at_period(per) else {
            warn!("raytomo: period {per} is not on the processed grid; skipped");
            continue;
        };
        info!("raytomo: period {per} s, {} measurement(s)", obs.len());
        if obs.is_empty() {
            continue;
        }

        n += 1;
        let mut body = String::new();
        for o in obs {
            body.push_str(&format!(
                "{:8.4} {:8.4} {:6.1} {:8.4} {:8.4} {:6.1} {:8.6}\n",
                o.lat_1, o.lon_1, o.el_1, o.lat_2, o.lon_2, o.el_2, o.time
            ));
        }
        files.push((PathBuf::from(format!("rays/rays{n:02}.dat")), body));
        periods_dat.push_str(&format!("{per}\n"));
    }
    files.push((PathBuf::from("periods.dat"), periods_dat));

    let mut stations_dat = String::new();
    for (lat, lon, el) in pairs.station_coords()?.values() {
        stations_dat.push_str(&format!("{lon:8.4} {lat:8.4} {el:6.1}\n"));
    }
    files.push((PathBuf::from("stations.dat"), stations_dat));

    Ok(files)
}

/// Render the MCMC inversion deck.
///
/// - `stations.lonlat`: `STA lon lat el` per station, sorted by code.
/// - `data.txt`: curves × periods matrix of interpolated travel times,
///   `nan` where a curve lacks that period; rows sorted by pair name.
/// - `periods.txt`, `si.txt`, `ri.txt`: column vectors; the station and
///   receiver indices are 1-based into the sorted station list.
pub fn render_matrix(
    curves: &[DispersionCurve],
    pairs: &PairTable,
    periods: &[f64],
) -> Result<Vec<RenderedFile>, AppError> {
    // Curves with no retained grid periods carry no information here.
    let mut used: Vec<&DispersionCurve> = curves
        .iter()
        .filter(|c| c.interp.as_ref().is_some_and(|i| !i.periods.is_empty()))
        .collect();
    used.sort_by(|a, b| a.name.cmp(&b.name));

    let coords = pairs.station_coords()?;
    let station_list: Vec<&String> = coords.keys().collect();

    let mut files = Vec::new();

    let mut stations = String::new();
    for (sta, (lat, lon, el)) in &coords {
        stations.push_str(&format!("{sta} {lon} {lat} {el}\n"));
    }
    files.push((PathBuf::from("stations.lonlat"), stations));

    let mut data = DMatrix::from_element(used.len(), periods.len(), f64::NAN);
    let mut station_ind = vec![0usize; used.len()];
    let mut receiver_ind = vec![0usize; used.len()];

    let mut row = 0usize;
    for curve in &used {
        let Some(pair) = pairs.get(&curve.name) else {
            warn!("matrix: no pair metadata for '{}'; curve skipped", curve.name);
            continue;
        };
        let interp = curve.interp.as_ref().expect("filtered above");

        for (j, &per) in periods.iter().enumerate() {
            let hit = interp.periods.iter().position(|&p| (p - per).abs() < 1e-9);
            if let Some(i) = hit {
                data[(row, j)] = interp.times[i];
            }
        }

        let (sta1, sta2) = pair.stations()?;
        // 1-based for the consuming inversion code.
        station_ind[row] = station_position(&station_list, sta1) + 1;
        receiver_ind[row] = station_position(&station_list, sta2) + 1;
        row += 1;
    }
    data = data.rows(0, row).into_owned();
    station_ind.truncate(row);
    receiver_ind.truncate(row);

    files.push((PathBuf::from("periods.txt"), render_column(periods.iter().copied())));
    files.push((PathBuf::from("data.txt"), render_matrix_rows(&data)));
    files.push((
        PathBuf::from("ri.txt"),
        render_column(receiver_ind.iter().map(|&i| i as f64)),
    ));
    files.push((
        PathBuf::from("si.txt"),
        render_column(station_ind.iter().map(|&i| i as f64)),
    ));

    Ok(files)
}

/// Write rendered files under `outdir`, creating directories as needed.
pub fn write_rendered(outdir: &Path, files: &[RenderedFile]) -> Result<(), AppError> {
    for (rel, content) in files {
        let path = outdir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::io("create directory", parent, e))?;
        }
        fs::write(&path, content).map_err(|e| AppError::io("write", &path, e))?;
    }
    Ok(())
}

fn station_position(list: &[&String], code: &str) -> usize {
    list.iter()
        .position(|s| s.as_str() == code)
        .expect("station list built from the same pair table")
}

fn render_column(values: impl Iterator<Item = f64>) -> String {
    let mut out = String::new();
    for v in values {
        out.push_str(&fmt_e(v));
        out.push('\n');
    }
    out
}

fn render_matrix_rows(m: &DMatrix<f64>) -> String {
    let mut out = String::new();
    for i in 0..m.nrows() {
        let row: Vec<String> = (0..m.ncols()).map(|j| fmt_e(m[(i, j)])).collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}

fn fmt_e(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{v:.18e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::grid::{build_period_table, interpolate_onto_grid, target_period_grid};
    use crate::domain::PairInfo;

    fn pair_table() -> PairTable {
        PairTable::from_rows(vec![
            PairInfo {
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
            },
            PairInfo {
                name: "AAA_CCC_HHZ_HHZ".to_string(),
                network: "XX-XX".to_string(),
                station: "AAA-CCC".to_string(),
                dist: 95.0,
                lat_1: 50.0,
                lon_1: 10.0,
                el_1: 100.0,
                lat_2: 50.5,
                lon_2: 10.8,
                el_2: 150.0,
            },
        ])
    }

    fn gridded() -> (Vec<DispersionCurve>, PeriodTable) {
        let curves = vec![
            DispersionCurve::new(
                "AAA_BBB_HHZ_HHZ",
                vec![0.04, 0.1, 0.2, 0.5],
                vec![60.0, 55.0, 52.0, 50.0],
                vec![180.0; 4],
            ),
            DispersionCurve::new(
                "AAA_CCC_HHZ_HHZ",
                vec![0.05, 0.1, 0.3],
                vec![32.0, 30.0, 28.0],
                vec![95.0; 3],
            ),
        ];
        let grid = target_period_grid();
        let out = interpolate_onto_grid(curves, &grid).unwrap();
        let table = build_period_table(&out.curves, &pair_table(), &grid);
        (out.curves, table)
    }

    #[test]
    fn raytomo_files_and_numbering() {
        let (_, table) = gridded();
        let files = render_raytomo(&table, &pair_table(), &target_period_grid()).unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|(p, _)| p.to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"rays/rays01.dat".to_string()));
        assert!(names.contains(&"periods.dat".to_string()));
        assert!(names.contains(&"stations.dat".to_string()));

        // Ray files are numbered consecutively from 01.
        let ray_count = names.iter().filter(|n| n.starts_with("rays/")).count();
        for i in 1..=ray_count {
            assert!(names.contains(&format!("rays/rays{i:02}.dat")));
        }
    }

    #[test]
    fn raytomo_row_format_is_fixed_width() {
        let (_, table) = gridded();
        let files = render_raytomo(&table, &pair_table(), &[10.0]).unwrap();
        let rays = &files
            .iter()
            .find(|(p, _)| p.ends_with("rays01.dat"))
            .unwrap()
            .1;
        let first = rays.lines().next().unwrap();
        let cols: Vec<&str> = first.split_whitespace().collect();
        assert_eq!(cols.len(), 7);
        assert_eq!(cols[0], "50.0000");
        assert_eq!(cols[1], "10.0000");
        assert_eq!(cols[2], "100.0");
        assert_eq!(cols[3], "51.0000");
    }

    #[test]
    fn stations_are_lon_lat_el_sorted() {
        let (_, table) = gridded();
        let files = render_raytomo(&table, &pair_table(), &[10.0]).unwrap();
        let stations = &files
            .iter()
            .find(|(p, _)| p.ends_with("stations.dat"))
            .unwrap()
            .1;
        let lines: Vec<&str> = stations.lines().collect();
        assert_eq!(lines.len(), 3); // AAA, BBB, CCC
        // AAA first: lon 10, lat 50.
        let cols: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(cols[0], "10.0000");
        assert_eq!(cols[1], "50.0000");
    }

    #[test]
    fn matrix_shapes_and_indices() {
        let (curves, _) = gridded();
        let grid = target_period_grid();
        let files = render_matrix(&curves, &pair_table(), &grid).unwrap();

        let data = &files.iter().find(|(p, _)| p.ends_with("data.txt")).unwrap().1;
        let rows: Vec<&str> = data.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].split_whitespace().count(), grid.len());

        let si = &files.iter().find(|(p, _)| p.ends_with("si.txt")).unwrap().1;
        let ri = &files.iter().find(|(p, _)| p.ends_with("ri.txt")).unwrap().1;
        // Both curves start at AAA (index 1); receivers are BBB (2) and CCC (3).
        let si_vals: Vec<f64> = si.lines().map(|l| l.parse().unwrap()).collect();
        let ri_vals: Vec<f64> = ri.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(si_vals, vec![1.0, 1.0]);
        assert_eq!(ri_vals, vec![2.0, 3.0]);
    }

    #[test]
    fn matrix_has_nan_outside_curve_coverage() {
        let (curves, _) = gridded();
        let grid = target_period_grid();
        let files = render_matrix(&curves, &pair_table(), &grid).unwrap();
        let data = &files.iter().find(|(p, _)| p.ends_with("data.txt")).unwrap().1;
        // 30 s (first column) is outside both curves' ranges.
        for row in data.lines() {
            assert_eq!(row.split_whitespace().next().unwrap(), "nan");
        }
    }

    #[test]
    fn exports_are_idempotent() {
        let (curves, table) = gridded();
        let grid = target_period_grid();

        let a1 = render_raytomo(&table, &pair_table(), &grid).unwrap();
        let a2 = render_raytomo(&table, &pair_table(), &grid).unwrap();
        assert_eq!(a1, a2);

        let b1 = render_matrix(&curves, &pair_table(), &grid).unwrap();
        let b2 = render_matrix(&curves, &pair_table(), &grid).unwrap();
        assert_eq!(b1, b2);
    }
}
