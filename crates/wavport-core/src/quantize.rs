//! `f32` → signed 16-bit PCM.

/// Full-scale magnitude of a 16-bit sample. -32768 is never produced.
pub const PCM16_FULL_SCALE: f32 = i16::MAX as f32;

/// Quantizes one normalized sample.
///
/// NaN becomes silence, anything outside [-1, 1] saturates, and the scaled
/// value is rounded to nearest with ties away from zero (`f32::round`), so
/// `quantize(-x) == -quantize(x)` for every non-NaN `x`.
#[inline]
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * PCM16_FULL_SCALE).round() as i16
}

/// Quantizes `samples` and appends them to `out` as little-endian bytes.
pub fn quantize_into(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 2);
    for &s in samples {
        out.extend_from_slice(&quantize(s).to_le_bytes());
    }
}
