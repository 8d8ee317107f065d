//! Minimal miniSEED 2.4 reader/writer.
//!
//! Scope: fixed 4096-byte big-endian records with a blockette 1000 and the
//! uncompressed encodings INT32 / FLOAT32 / FLOAT64. That covers every
//! file this toolbox produces and lets its own products be reloaded;
//! STEIM-compressed archive data is out of scope.
//!
//! Writing follows the disk-space rule used throughout the processing
//! chain: `f64` traces are cast to `f32` and written as FLOAT32 (SAC files
//! also store 32-bit floats), `f32` and `i32` traces keep their encoding.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use log::warn;

use crate::domain::{Trace, TraceData};
use crate::error::{AppError, INPUT, NUMERIC};

/// Record length used for all written records.
const RECORD_LEN: usize = 4096;
/// log2(RECORD_LEN), stored in blockette 1000.
const RECORD_LEN_POWER: u8 = 12;
/// Offset of the first (and only) blockette we write.
const BLOCKETTE_OFFSET: u16 = 48;
/// Offset of the first data sample in a written record.
const DATA_OFFSET: u16 = 64;

const ENC_INT32: u8 = 3;
const ENC_FLOAT32: u8 = 4;
const ENC_FLOAT64: u8 = 5;

/// Serialize traces into miniSEED records.
pub fn write_records(traces: &[Trace]) -> Result<Vec<u8>, AppError> {
    let mut out = Vec::new();
    let mut sequence = 1u32;

    for tr in traces {
        let (encoding, payload) = encode_payload(&tr.data);
        let sample_size = match encoding {
            ENC_INT32 | ENC_FLOAT32 => 4,
            _ => 8,
        };
        let samples_per_record = (RECORD_LEN - DATA_OFFSET as usize) / sample_size;
        let (factor, mult) = rate_to_factor_mult(tr.sampling_rate)?;

        let n = tr.len();
        let mut start = 0usize;
        while start < n {
            let count = (n - start).min(samples_per_record);
            let rec_start = advance_time(tr.starttime, start as f64 / tr.sampling_rate);

            let mut rec = vec![0u8; RECORD_LEN];
            write_header(&mut rec, tr, sequence, rec_start, count as u16, factor, mult);
            write_blockette_1000(&mut rec, encoding);

            let byte_start = start * sample_size;
            let byte_end = (start + count) * sample_size;
            rec[DATA_OFFSET as usize..DATA_OFFSET as usize + (byte_end - byte_start)]
                .copy_from_slice(&payload[byte_start..byte_end]);

            out.extend_from_slice(&rec);
            sequence = (sequence % 999_999) + 1;
            start += count;
        }
    }

    Ok(out)
}

/// Write traces to a miniSEED file, creating parent directories.
pub fn write_mseed_file(path: &Path, traces: &[Trace]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| AppError::io("create directory", parent, e))?;
        }
    }
    let bytes = write_records(traces)?;
    fs::write(path, bytes).map_err(|e| AppError::io("write miniSEED", path, e))
}

/// Parse miniSEED bytes into traces.
///
/// Consecutive records with the same channel id, the same rate and a
/// contiguous start time are merged into one trace; anything else starts a
/// new trace (gaps are reported, not filled).
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Trace>, AppError> {
    let mut traces: Vec<Trace> = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let (record, rec_len) = parse_one_record(bytes, offset)?;
        offset += rec_len;

        if traces.last().is_some_and(|last| can_append(last, &record)) {
            let last = traces.last_mut().expect("just checked non-empty");
            append_data(&mut last.data, record.data);
        } else {
            if traces.last().is_some_and(|last| last.id() == record.id()) {
                warn!(
                    "mseed: gap or rate change in {}; starting a new segment",
                    record.id()
                );
            }
            traces.push(record);
        }
    }

    Ok(traces)
}

/// Read a miniSEED file from disk.
pub fn read_mseed_file(path: &Path) -> Result<Vec<Trace>, AppError> {
    let bytes = fs::read(path).map_err(|e| AppError::io("read miniSEED", path, e))?;
    if bytes.is_empty() {
        return Err(AppError::new(INPUT, format!("'{}' is empty.", path.display())));
    }
    parse_records(&bytes)
}

fn encode_payload(data: &TraceData) -> (u8, Vec<u8>) {
    match data {
        TraceData::Float64(v) => {
            // Forced down to 32-bit floats to save disk space.
            let mut out = Vec::with_capacity(v.len() * 4);
            for &x in v {
                out.extend_from_slice(&(x as f32).to_be_bytes());
            }
            (ENC_FLOAT32, out)
        }
        TraceData::Float32(v) => {
            let mut out = Vec::with_capacity(v.len() * 4);
            for &x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
            (ENC_FLOAT32, out)
        }
        TraceData::Int32(v) => {
            let mut out = Vec::with_capacity(v.len() * 4);
            for &x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
            (ENC_INT32, out)
        }
    }
}

fn write_header(
    rec: &mut [u8],
    tr: &Trace,
    sequence: u32,
    start: DateTime<Utc>,
    nsamples: u16,
    factor: i16,
    mult: i16,
) {
    rec[0..6].copy_from_slice(format!("{sequence:06}").as_bytes());
    rec[6] = b'D';
    rec[7] = b' ';
    write_code(&mut rec[8..13], &tr.station);
    write_code(&mut rec[13..15], &tr.location);
    write_code(&mut rec[15..18], &tr.channel);
    write_code(&mut rec[18..20], &tr.network);

    rec[20..22].copy_from_slice(&(start.year() as u16).to_be_bytes());
    rec[22..24].copy_from_slice(&(start.ordinal() as u16).to_be_bytes());
    rec[24] = start.hour() as u8;
    rec[25] = start.minute() as u8;
    rec[26] = start.second() as u8;
    rec[27] = 0;
    let fract = (start.nanosecond() / 100_000) as u16;
    rec[28..30].copy_from_slice(&fract.to_be_bytes());

    rec[30..32].copy_from_slice(&nsamples.to_be_bytes());
    rec[32..34].copy_from_slice(&factor.to_be_bytes());
    rec[34..36].copy_from_slice(&mult.to_be_bytes());
    // activity/io/quality flags stay zero
    rec[39] = 1; // blockette count
    rec[44..46].copy_from_slice(&DATA_OFFSET.to_be_bytes());
    rec[46..48].copy_from_slice(&BLOCKETTE_OFFSET.to_be_bytes());
}

fn write_blockette_1000(rec: &mut [u8], encoding: u8) {
    let off = BLOCKETTE_OFFSET as usize;
    rec[off..off + 2].copy_from_slice(&1000u16.to_be_bytes());
    rec[off + 2..off + 4].copy_from_slice(&0u16.to_be_bytes());
    rec[off + 4] = encoding;
    rec[off + 5] = 1; // big endian
    rec[off + 6] = RECORD_LEN_POWER;
    rec[off + 7] = 0;
}

fn write_code(field: &mut [u8], code: &str) {
    field.fill(b' ');
    for (dst, &src) in field.iter_mut().zip(code.as_bytes()) {
        *dst = src;
    }
}

fn parse_one_record(bytes: &[u8], offset: usize) -> Result<(Trace, usize), AppError> {
    let header = bytes
        .get(offset..offset + 48)
        .ok_or_else(|| AppError::new(INPUT, "mseed: truncated record header."))?;

    let station = code_str(&header[8..13]);
    let location = code_str(&header[13..15]);
    let channel = code_str(&header[15..18]);
    let network = code_str(&header[18..20]);

    let year = u16::from_be_bytes([header[20], header[21]]) as i32;
    let doy = u16::from_be_bytes([header[22], header[23]]) as u32;
    let fract = u16::from_be_bytes([header[28], header[29]]) as u32;
    let starttime = chrono::NaiveDate::from_yo_opt(year, doy)
        .and_then(|d| {
            d.and_hms_nano_opt(
                header[24] as u32,
                header[25] as u32,
                header[26] as u32,
                fract * 100_000,
            )
        })
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| AppError::new(INPUT, "mseed: invalid record start time."))?;

    let nsamples = u16::from_be_bytes([header[30], header[31]]) as usize;
    let factor = i16::from_be_bytes([header[32], header[33]]);
    let mult = i16::from_be_bytes([header[34], header[35]]);
    let sampling_rate = factor_mult_to_rate(factor, mult)?;

    let data_offset = u16::from_be_bytes([header[44], header[45]]) as usize;
    let first_blockette = u16::from_be_bytes([header[46], header[47]]) as usize;

    // Walk the blockette chain for blockette 1000 (encoding + record length).
    let mut b1000: Option<(u8, u8, u8)> = None;
    let mut pos = first_blockette;
    while pos != 0 {
        let blk = bytes
            .get(offset + pos..offset + pos + 8)
            .ok_or_else(|| AppError::new(INPUT, "mseed: truncated blockette."))?;
        let btype = u16::from_be_bytes([blk[0], blk[1]]);
        let next = u16::from_be_bytes([blk[2], blk[3]]) as usize;
        if btype == 1000 {
            b1000 = Some((blk[4], blk[5], blk[6]));
            break;
        }
        if next <= pos {
            break;
        }
        pos = next;
    }

    let (encoding, word_order, len_power) = b1000
        .ok_or_else(|| AppError::new(INPUT, "mseed: record has no blockette 1000."))?;
    if word_order != 1 {
        return Err(AppError::new(INPUT, "mseed: little-endian records are not supported."));
    }
    // Record lengths above 2^20 are outside anything the format allows.
    if !(6..=20).contains(&len_power) {
        return Err(AppError::new(INPUT, "mseed: invalid record length exponent."));
    }
    let rec_len = 1usize << len_power;
    if rec_len < 64 || offset + rec_len > bytes.len() || data_offset >= rec_len {
        return Err(AppError::new(INPUT, "mseed: invalid record length."));
    }

    let data = decode_payload(
        &bytes[offset + data_offset..offset + rec_len],
        encoding,
        nsamples,
    )?;

    Ok((
        Trace {
            network,
            station,
            location,
            channel,
            starttime,
            sampling_rate,
            data,
        },
        rec_len,
    ))
}

fn decode_payload(raw: &[u8], encoding: u8, nsamples: usize) -> Result<TraceData, AppError> {
    let size = match encoding {
        ENC_INT32 | ENC_FLOAT32 => 4,
        ENC_FLOAT64 => 8,
        other => {
            return Err(AppError::new(
                INPUT,
                format!("mseed: unsupported encoding {other} (only INT32/FLOAT32/FLOAT64)."),
            ));
        }
    };
    let need = nsamples * size;
    let raw = raw
        .get(..need)
        .ok_or_else(|| AppError::new(INPUT, "mseed: record data shorter than sample count."))?;

    Ok(match encoding {
        ENC_INT32 => TraceData::Int32(
            raw.chunks_exact(4)
                .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        ENC_FLOAT32 => TraceData::Float32(
            raw.chunks_exact(4)
                .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        _ => TraceData::Float64(
            raw.chunks_exact(8)
                .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
    })
}

fn code_str(field: &[u8]) -> String {
    String::from_utf8_lossy(field).trim().to_string()
}

fn can_append(last: &Trace, next: &Trace) -> bool {
    if last.id() != next.id() || (last.sampling_rate - next.sampling_rate).abs() > 1e-9 {
        return false;
    }
    if !matches!(
        (&last.data, &next.data),
        (TraceData::Float32(_), TraceData::Float32(_))
            | (TraceData::Float64(_), TraceData::Float64(_))
            | (TraceData::Int32(_), TraceData::Int32(_))
    ) {
        return false;
    }
    let expected = advance_time(last.starttime, last.len() as f64 / last.sampling_rate);
    let gap = (next.starttime - expected).num_milliseconds().abs() as f64 / 1000.0;
    gap <= 0.5 / last.sampling_rate
}

fn append_data(dst: &mut TraceData, src: TraceData) {
    match (dst, src) {
        (TraceData::Float64(a), TraceData::Float64(b)) => a.extend(b),
        (TraceData::Float32(a), TraceData::Float32(b)) => a.extend(b),
        (TraceData::Int32(a), TraceData::Int32(b)) => a.extend(b),
        _ => unreachable!("checked by can_append"),
    }
}

fn advance_time(t: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    t + Duration::nanoseconds((seconds * 1e9).round() as i64)
}

fn rate_to_factor_mult(rate: f64) -> Result<(i16, i16), AppError> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(AppError::new(NUMERIC, format!("mseed: invalid sampling rate {rate}.")));
    }
    let is_integral = |x: f64| (x - x.round()).abs() < 1e-6 && x.round() >= 1.0;

    if is_integral(rate) && rate <= 32767.0 {
        return Ok((rate.round() as i16, 1));
    }
    let period = 1.0 / rate;
    if is_integral(period) && period <= 32767.0 {
        return Ok((-(period.round() as i16), 1));
    }
    // rate = -factor / mult with factor > 0, mult < 0.
    for scale in [10.0, 100.0, 1000.0, 10000.0] {
        let scaled = rate * scale;
        if is_integral(scaled) && scaled <= 32767.0 && scale <= 32767.0 {
            return Ok((scaled.round() as i16, -(scale as i16)));
        }
    }
    Err(AppError::new(
        NUMERIC,
        format!("mseed: sampling rate {rate} is not representable."),
    ))
}

fn factor_mult_to_rate(factor: i16, mult: i16) -> Result<f64, AppError> {
    let f = f64::from(factor);
    let m = f64::from(mult);
    let rate = match (factor, mult) {
        (f_, m_) if f_ > 0 && m_ > 0 => f * m,
        (f_, m_) if f_ > 0 && m_ < 0 => -f / m,
        (f_, m_) if f_ < 0 && m_ > 0 => -m / f,
        (f_, m_) if f_ < 0 && m_ < 0 => 1.0 / (f * m),
        _ => {
            return Err(AppError::new(INPUT, "mseed: zero sample-rate factor/multiplier."));
        }
    };
    if !(rate.is_finite() && rate > 0.0) {
        return Err(AppError::new(INPUT, "mseed: invalid sample rate in record."));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(data: TraceData, rate: f64) -> Trace {
        Trace {
            network: "XX".to_string(),
            station: "AAA".to_string(),
            location: "".to_string(),
            channel: "HHZ".to_string(),
            starttime: Utc.with_ymd_and_hms(2018, 3, 15, 12, 30, 0).unwrap(),
            sampling_rate: rate,
            data,
        }
    }

    #[test]
    fn f64_is_forced_to_float32_encoding() {
        let tr = trace(TraceData::Float64(vec![1.5, -2.25, 3.125]), 100.0);
        let bytes = write_records(&[tr]).unwrap();
        assert_eq!(bytes.len(), RECORD_LEN);
        // encoding byte of blockette 1000
        assert_eq!(bytes[BLOCKETTE_OFFSET as usize + 4], ENC_FLOAT32);

        let back = parse_records(&bytes).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(
            back[0].data,
            TraceData::Float32(vec![1.5, -2.25, 3.125])
        );
    }

    #[test]
    fn int32_roundtrip_is_exact() {
        let tr = trace(TraceData::Int32(vec![1, -200, 30_000, -4_000_000]), 50.0);
        let bytes = write_records(&[tr.clone()]).unwrap();
        let back = parse_records(&bytes).unwrap();
        assert_eq!(back[0].data, tr.data);
        assert_eq!(back[0].id(), tr.id());
        assert_eq!(back[0].starttime, tr.starttime);
        assert!((back[0].sampling_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn long_trace_spans_records_and_merges_back() {
        let n = 2500usize; // > 1008 samples per 4096-byte f32 record
        let data: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let tr = trace(TraceData::Float32(data.clone()), 100.0);
        let bytes = write_records(&[tr]).unwrap();
        assert_eq!(bytes.len(), 3 * RECORD_LEN);

        let back = parse_records(&bytes).unwrap();
        assert_eq!(back.len(), 1, "contiguous records should merge");
        assert_eq!(back[0].data, TraceData::Float32(data));
    }

    #[test]
    fn fractional_rates_are_representable() {
        assert_eq!(rate_to_factor_mult(6.25).unwrap(), (625, -100));
        assert_eq!(rate_to_factor_mult(0.1).unwrap(), (-10, 1));
        assert_eq!(rate_to_factor_mult(100.0).unwrap(), (100, 1));
        let r = factor_mult_to_rate(625, -100).unwrap();
        assert!((r - 6.25).abs() < 1e-12);
    }
}
