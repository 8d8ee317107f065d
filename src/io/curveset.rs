//! Read/write curve-set JSON files.
//!
//! Curve-set JSON is the "portable" representation of a processed run:
//! every surviving curve with its raw picks and interpolated grid values,
//! plus the period grid that was in effect. It can be reloaded for
//! plotting or comparisons without re-running QC.
//!
//! The schema is defined by `domain::CurveSetFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{CurveSetFile, DispersionCurve};
use crate::error::{AppError, INPUT};

/// Write a curve-set JSON file.
pub fn write_curveset_json(
    path: &Path,
    curves: &[DispersionCurve],
    grid_periods: &[f64],
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io("create curve-set JSON", path, e))?;

    let set = CurveSetFile {
        tool: "disp".to_string(),
        grid_periods: grid_periods.to_vec(),
        curves: curves.to_vec(),
    };

    serde_json::to_writer_pretty(file, &set)
        .map_err(|e| AppError::new(INPUT, format!("Failed to write curve-set JSON: {e}")))?;

    Ok(())
}

/// Read a curve-set JSON file.
pub fn read_curveset_json(path: &Path) -> Result<CurveSetFile, AppError> {
    let file = File::open(path).map_err(|e| AppError::io("open curve-set JSON", path, e))?;
    let set: CurveSetFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(INPUT, format!("Invalid curve-set JSON: {e}")))?;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InterpCurve;

    #[test]
    fn json_roundtrip_preserves_curves() {
        let mut curve = DispersionCurve::new(
            "AAA_BBB_HHZ_HHZ",
            vec![0.05, 0.1, 0.2],
            vec![60.0, 55.0, 50.0],
            vec![180.0, 180.0, 180.0],
        );
        curve.interp = Some(InterpCurve {
            freqs: vec![0.1],
            periods: vec![10.0],
            times: vec![55.0],
            vels: vec![180.0 / 55.0],
        });

        let path = std::env::temp_dir().join("disp-curves-test-curveset.json");
        write_curveset_json(&path, std::slice::from_ref(&curve), &[10.0]).unwrap();
        let back = read_curveset_json(&path).unwrap();

        assert_eq!(back.tool, "disp");
        assert_eq!(back.grid_periods, vec![10.0]);
        assert_eq!(back.curves.len(), 1);
        assert_eq!(back.curves[0].name, curve.name);
        assert_eq!(back.curves[0].freq, curve.freq);
        let interp = back.curves[0].interp.as_ref().unwrap();
        assert_eq!(interp.periods, vec![10.0]);
    }
}
