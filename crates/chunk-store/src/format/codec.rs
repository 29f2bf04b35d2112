//! Block codec: 16-bit quantisation, per-row delta coding along time, deflate.

use std::io::{self, Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

/// Quantised value used for NaN.
pub const NAN_SENTINEL: i16 = i16::MAX;

const MAX_FINITE: f32 = (i16::MAX - 1) as f32;

/// Caller-owned buffers reused across block decodes.
#[derive(Debug, Default)]
pub struct DecodeScratch {
    raw: Vec<u8>,
    values: Vec<f32>,
}

impl DecodeScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of the most recently decoded block, `rows x n_time`.
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

pub fn quantise(value: f32, scale_factor: f32) -> i16 {
    if value.is_nan() {
        return NAN_SENTINEL;
    }
    (value * scale_factor).round().clamp(-MAX_FINITE, MAX_FINITE) as i16
}

pub fn dequantise(value: i16, scale_factor: f32) -> f32 {
    if value == NAN_SENTINEL {
        f32::NAN
    } else {
        value as f32 / scale_factor
    }
}

/// Encode `values` (`rows x n_time`, row-major) into `out`.
pub fn encode_block(
    values: &[f32],
    n_time: usize,
    scale_factor: f32,
    level: u32,
    out: &mut Vec<u8>,
) -> io::Result<()> {
    out.clear();
    let mut encoder = DeflateEncoder::new(out, Compression::new(level));
    let mut deltas = Vec::with_capacity(n_time * 2);
    for row in values.chunks(n_time.max(1)) {
        deltas.clear();
        let mut previous: i16 = 0;
        for &v in row {
            let q = quantise(v, scale_factor);
            deltas.extend_from_slice(&q.wrapping_sub(previous).to_le_bytes());
            previous = q;
        }
        encoder.write_all(&deltas)?;
    }
    encoder.finish()?;
    Ok(())
}

/// Decode a block of `rows x n_time` values into `scratch`.
pub fn decode_block(
    compressed: &[u8],
    rows: usize,
    n_time: usize,
    scale_factor: f32,
    scratch: &mut DecodeScratch,
) -> io::Result<()> {
    scratch.raw.clear();
    DeflateDecoder::new(compressed).read_to_end(&mut scratch.raw)?;

    let expected = rows * n_time * 2;
    if scratch.raw.len() != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("block holds {} bytes, expected {expected}", scratch.raw.len()),
        ));
    }

    scratch.values.clear();
    scratch.values.reserve(rows * n_time);
    for row in scratch.raw.chunks_exact(n_time.max(1) * 2) {
        let mut previous: i16 = 0;
        for pair in row.chunks_exact(2) {
            previous = previous.wrapping_add(i16::from_le_bytes([pair[0], pair[1]]));
            scratch.values.push(dequantise(previous, scale_factor));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantise_sentinel_and_clamp() {
        assert_eq!(quantise(f32::NAN, 10.0), NAN_SENTINEL);
        assert_eq!(quantise(1e9, 10.0), i16::MAX - 1);
        assert_eq!(quantise(f32::NEG_INFINITY, 10.0), -(i16::MAX - 1));
        assert_eq!(quantise(1.26, 10.0), 13);
        assert!(dequantise(NAN_SENTINEL, 10.0).is_nan());
        assert_eq!(dequantise(13, 10.0), 1.3);
    }

    #[test]
    fn test_block_preserves_nan_and_precision() {
        // two rows, jumps large enough to exercise wrapping deltas
        let values = vec![
            1.0, 2.0, f32::NAN, 4.0, //
            -3000.0, 3000.0, -3000.0, 0.05,
        ];
        let mut compressed = Vec::new();
        encode_block(&values, 4, 10.0, 6, &mut compressed).unwrap();

        let mut scratch = DecodeScratch::new();
        decode_block(&compressed, 2, 4, 10.0, &mut scratch).unwrap();
        let out = scratch.values();
        assert_eq!(out.len(), 8);
        assert_eq!(&out[0..2], &[1.0, 2.0]);
        assert!(out[2].is_nan());
        assert_eq!(out[3], 4.0);
        assert_eq!(&out[4..7], &[-3000.0, 3000.0, -3000.0]);
        assert!((out[7] - 0.1).abs() < 1e-6 || (out[7] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let mut compressed = Vec::new();
        encode_block(&[1.0, 2.0], 2, 1.0, 1, &mut compressed).unwrap();
        let mut scratch = DecodeScratch::new();
        assert!(decode_block(&compressed, 2, 2, 1.0, &mut scratch).is_err());
    }
}
