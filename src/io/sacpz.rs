//! SAC pole-zero file parsing.
//!
//! Keyword-delimited blocks:
//!
//! ```text
//! ZEROS 3
//! 0.0  0.0
//! 0.0  0.0
//! POLES 2
//! -0.037  0.037
//! -0.037 -0.037
//! CONSTANT 2.304e9
//! ```
//!
//! A block declaring more entries than it lists is padded with `0+0i`
//! (the SAC convention for zeros at the origin), so parsed counts always
//! equal the declared counts. `gain` is fixed to 1.0 and `sensitivity`
//! takes the CONSTANT value; see `PolesZeros` for what the two scalars
//! mean.

use std::fs;
use std::path::Path;

use num_complex::Complex64;

use crate::domain::PolesZeros;
use crate::error::{AppError, INPUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Zeros,
    Poles,
}

/// Parse SAC pole-zero text.
pub fn parse_sacpz(text: &str) -> Result<PolesZeros, AppError> {
    let mut zeros: Vec<Complex64> = Vec::new();
    let mut poles: Vec<Complex64> = Vec::new();
    let mut declared_zeros = 0usize;
    let mut declared_poles = 0usize;
    let mut constant: Option<f64> = None;
    let mut block = Block::None;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        // Comment lines are common in pole-zero files fetched from data centers.
        if line.is_empty() || line.starts_with('*') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let lineno = idx + 1;

        match fields[0].to_ascii_uppercase().as_str() {
            "ZEROS" => {
                declared_zeros = parse_count(&fields, "ZEROS", lineno)?;
                block = Block::Zeros;
                continue;
            }
            "POLES" => {
                declared_poles = parse_count(&fields, "POLES", lineno)?;
                block = Block::Poles;
                continue;
            }
            "CONSTANT" => {
                let v = fields
                    .get(1)
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| {
                        AppError::new(INPUT, format!("sacpz: line {lineno}: invalid CONSTANT."))
                    })?;
                constant = Some(v);
                block = Block::None;
                continue;
            }
            _ => {}
        }

        let value = parse_complex(&fields)
            .ok_or_else(|| AppError::new(INPUT, format!("sacpz: line {lineno}: expected 're im' pair.")))?;
        match block {
            Block::Zeros if zeros.len() < declared_zeros => {
                zeros.push(value);
                if zeros.len() == declared_zeros {
                    block = Block::None;
                }
            }
            Block::Poles if poles.len() < declared_poles => {
                poles.push(value);
                if poles.len() == declared_poles {
                    block = Block::None;
                }
            }
            _ => {
                return Err(AppError::new(
                    INPUT,
                    format!("sacpz: line {lineno}: value outside any ZEROS/POLES block."),
                ));
            }
        }
    }

    // SAC leaves zeros (or poles) at the origin implicit.
    zeros.resize(declared_zeros, Complex64::new(0.0, 0.0));
    poles.resize(declared_poles, Complex64::new(0.0, 0.0));

    let sensitivity = constant
        .ok_or_else(|| AppError::new(INPUT, "sacpz: missing CONSTANT line."))?;

    Ok(PolesZeros {
        poles,
        zeros,
        gain: 1.0,
        sensitivity,
    })
}

/// Read a SAC pole-zero file from disk.
pub fn read_sacpz_file(path: &Path) -> Result<PolesZeros, AppError> {
    let text = fs::read_to_string(path).map_err(|e| AppError::io("read pole-zero file", path, e))?;
    parse_sacpz(&text)
}

fn parse_count(fields: &[&str], keyword: &str, lineno: usize) -> Result<usize, AppError> {
    fields
        .get(1)
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| {
            AppError::new(
                INPUT,
                format!("sacpz: line {lineno}: invalid {keyword} count."),
            )
        })
}

fn parse_complex(fields: &[&str]) -> Option<Complex64> {
    if fields.len() < 2 {
        return None;
    }
    let re: f64 = fields[0].parse().ok()?;
    let im: f64 = fields[1].parse().ok()?;
    Some(Complex64::new(re, im))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
* STS-2 style response
ZEROS 3
0.0 0.0
0.0 0.0
POLES 2
-0.037004 0.037016
-0.037004 -0.037016
CONSTANT 2.304000e+09
";

    #[test]
    fn counts_match_declared() {
        let paz = parse_sacpz(SAMPLE).unwrap();
        assert_eq!(paz.zeros.len(), 3);
        assert_eq!(paz.poles.len(), 2);
    }

    #[test]
    fn implicit_zero_is_padded_at_origin() {
        let paz = parse_sacpz(SAMPLE).unwrap();
        assert_eq!(paz.zeros[2], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn scalars() {
        let paz = parse_sacpz(SAMPLE).unwrap();
        assert!((paz.gain - 1.0).abs() < 1e-15);
        assert!((paz.sensitivity - 2.304e9).abs() < 1.0);
    }

    #[test]
    fn pole_values_parse_as_complex() {
        let paz = parse_sacpz(SAMPLE).unwrap();
        assert!((paz.poles[0].re + 0.037004).abs() < 1e-12);
        assert!((paz.poles[0].im - 0.037016).abs() < 1e-12);
        assert!((paz.poles[1].im + 0.037016).abs() < 1e-12);
    }

    #[test]
    fn missing_constant_is_an_error() {
        let text = "ZEROS 1\n0.0 0.0\nPOLES 1\n-1.0 0.0\n";
        assert!(parse_sacpz(text).is_err());
    }

    #[test]
    fn stray_value_outside_block_is_an_error() {
        let text = "0.0 0.0\nZEROS 1\n0.0 0.0\nCONSTANT 1.0\n";
        assert!(parse_sacpz(text).is_err());
    }
}
