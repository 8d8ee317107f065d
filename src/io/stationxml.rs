//! Pole-zero extraction from a StationXML catalog.
//!
//! We only read the pieces deconvolution needs: the first poles-zeros
//! response stage of the requested channel (poles, zeros, normalization
//! factor) and the channel's total instrument sensitivity. Everything else
//! in the catalog is ignored.

use std::fs;
use std::path::Path;

use num_complex::Complex64;
use roxmltree::{Document, Node};

use crate::domain::PolesZeros;
use crate::error::{AppError, INPUT};

fn is_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(tag)
}

fn child<'a>(node: Node<'a, 'a>, tag: &str) -> Option<Node<'a, 'a>> {
    node.children().find(|n| is_tag(*n, tag))
}

fn child_text<'a>(node: Node<'a, 'a>, tag: &str) -> Option<&'a str> {
    child(node, tag).and_then(|n| n.text()).map(str::trim)
}

fn child_f64(node: Node<'_, '_>, tag: &str) -> Option<f64> {
    child_text(node, tag).and_then(|s| s.parse().ok())
}

fn code_matches(node: Node<'_, '_>, attr: &str, want: &str) -> bool {
    node.attribute(attr)
        .map(|c| c.trim().eq_ignore_ascii_case(want))
        .unwrap_or(false)
}

/// Find the pole-zero response of `net.sta.loc.chan` in StationXML text.
///
/// `location` of `None` (or `""`/`"--"`) accepts any location code.
pub fn find_paz(
    xml: &str,
    network: &str,
    station: &str,
    location: Option<&str>,
    channel: &str,
) -> Result<PolesZeros, AppError> {
    let doc = Document::parse(xml)
        .map_err(|e| AppError::new(INPUT, format!("StationXML parse error: {e}")))?;

    let loc_filter = location.filter(|l| !l.is_empty() && *l != "--");

    let chan_node = doc
        .descendants()
        .filter(|n| is_tag(*n, "Network") && code_matches(*n, "code", network))
        .flat_map(|n| n.children().collect::<Vec<_>>())
        .filter(|n| is_tag(*n, "Station") && code_matches(*n, "code", station))
        .flat_map(|n| n.children().collect::<Vec<_>>())
        .find(|n| {
            is_tag(*n, "Channel")
                && code_matches(*n, "code", channel)
                && loc_filter.is_none_or(|loc| code_matches(*n, "locationCode", loc))
        })
        .ok_or_else(|| {
            AppError::new(
                INPUT,
                format!("StationXML: channel {network}.{station}.{channel} not found."),
            )
        })?;

    let response = child(chan_node, "Response").ok_or_else(|| {
        AppError::new(
            INPUT,
            format!("StationXML: {network}.{station}.{channel} has no Response element."),
        )
    })?;

    let sensitivity = child(response, "InstrumentSensitivity")
        .and_then(|n| child_f64(n, "Value"))
        .ok_or_else(|| {
            AppError::new(INPUT, "StationXML: missing InstrumentSensitivity value.")
        })?;

    // First stage carrying a PolesZeros block (stages are in document order).
    let paz_node = response
        .children()
        .filter(|n| is_tag(*n, "Stage"))
        .find_map(|stage| child(stage, "PolesZeros"))
        .ok_or_else(|| AppError::new(INPUT, "StationXML: no PolesZeros response stage."))?;

    let gain = child_f64(paz_node, "NormalizationFactor").ok_or_else(|| {
        AppError::new(INPUT, "StationXML: PolesZeros stage missing NormalizationFactor.")
    })?;

    let zeros = collect_complex(paz_node, "Zero")?;
    let poles = collect_complex(paz_node, "Pole")?;

    Ok(PolesZeros {
        poles,
        zeros,
        gain,
        sensitivity,
    })
}

/// Read a StationXML file and extract one channel's pole-zero response.
pub fn read_stationxml_paz(
    path: &Path,
    network: &str,
    station: &str,
    location: Option<&str>,
    channel: &str,
) -> Result<PolesZeros, AppError> {
    let xml = fs::read_to_string(path).map_err(|e| AppError::io("read StationXML", path, e))?;
    find_paz(&xml, network, station, location, channel)
}

fn collect_complex(paz_node: Node<'_, '_>, tag: &str) -> Result<Vec<Complex64>, AppError> {
    let mut out = Vec::new();
    for node in paz_node.children().filter(|n| is_tag(*n, tag)) {
        let re = child_f64(node, "Real");
        let im = child_f64(node, "Imaginary");
        match (re, im) {
            (Some(re), Some(im)) => out.push(Complex64::new(re, im)),
            _ => {
                return Err(AppError::new(
                    INPUT,
                    format!("StationXML: {tag} element missing Real/Imaginary."),
                ));
            }
        }
    }
    Ok(out)
}
