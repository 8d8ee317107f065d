//! GMT-style multi-segment coordinate files.
//!
//! Segments are delimited by lines starting with `>`; everything between
//! two separators is a run of whitespace-separated float rows (typically
//! `lon lat value`, but any consistent width is accepted). Content before
//! the first separator is ignored, matching the `.xy` files these come
//! from.

use std::fs;
use std::path::Path;

use crate::error::{AppError, INPUT};

/// One polyline segment: rows of floats.
pub type Segment = Vec<Vec<f64>>;

/// Parse multi-segment text into ordered segments.
pub fn parse_segments(text: &str) -> Result<Vec<Segment>, AppError> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut current: Option<Segment> = None;

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('>') {
            if let Some(seg) = current.take() {
                segments.push(seg);
            }
            current = Some(Vec::new());
            continue;
        }
        let Some(seg) = current.as_mut() else {
            // Header junk before the first separator.
            continue;
        };
        if trimmed.is_empty() {
            continue;
        }
        let row: Result<Vec<f64>, _> = trimmed.split_whitespace().map(str::parse).collect();
        match row {
            Ok(r) => seg.push(r),
            Err(_) => {
                return Err(AppError::new(
                    INPUT,
                    format!("segments: line {}: non-numeric row '{trimmed}'.", idx + 1),
                ));
            }
        }
    }
    if let Some(seg) = current.take() {
        segments.push(seg);
    }

    if segments.is_empty() {
        return Err(AppError::new(INPUT, "segments: no '>' separators found."));
    }
    Ok(segments)
}

/// Read a multi-segment file from disk.
pub fn read_segments_file(path: &Path) -> Result<Vec<Segment>, AppError> {
    let text = fs::read_to_string(path).map_err(|e| AppError::io("read segments file", path, e))?;
    parse_segments(&text)
}
