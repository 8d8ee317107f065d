//! Waveform traces.
//!
//! A `Trace` is one continuous segment of evenly sampled data from a single
//! channel. The sample kind is kept explicit because it decides the
//! miniSEED encoding on write: `f64` data is forced down to 32-bit floats,
//! `f32` and `i32` are written as-is.

use chrono::{DateTime, Utc};

/// Samples in their native storage kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceData {
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Int32(Vec<i32>),
}

impl TraceData {
    pub fn len(&self) -> usize {
        match self {
            TraceData::Float64(v) => v.len(),
            TraceData::Float32(v) => v.len(),
            TraceData::Int32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out as `f64` for signal processing.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            TraceData::Float64(v) => v.clone(),
            TraceData::Float32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TraceData::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        }
    }
}

/// One continuous, evenly sampled channel segment.
#[derive(Debug, Clone)]
pub struct Trace {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub starttime: DateTime<Utc>,
    /// Samples per second.
    pub sampling_rate: f64,
    pub data: TraceData,
}

impl Trace {
    /// SEED-style identifier `NET.STA.LOC.CHN`.
    pub fn id(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }

    /// Sample spacing in seconds.
    pub fn delta(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Replace the samples with `f64` data (after processing).
    pub fn set_f64(&mut self, data: Vec<f64>) {
        self.data = TraceData::Float64(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn trace() -> Trace {
        Trace {
            network: "XX".to_string(),
            station: "STA1".to_string(),
            location: "00".to_string(),
            channel: "HHZ".to_string(),
            starttime: Utc.with_ymd_and_hms(2018, 3, 15, 0, 0, 0).unwrap(),
            sampling_rate: 100.0,
            data: TraceData::Int32(vec![1, -2, 3]),
        }
    }

    #[test]
    fn id_and_delta() {
        let tr = trace();
        assert_eq!(tr.id(), "XX.STA1.00.HHZ");
        assert!((tr.delta() - 0.01).abs() < 1e-15);
    }

    #[test]
    fn to_f64_preserves_values() {
        let tr = trace();
        assert_eq!(tr.data.to_f64(), vec![1.0, -2.0, 3.0]);
    }
}
