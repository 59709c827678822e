//! 16-bit PCM helpers: peak amplitude and gain.
//!
//! Frames are mono, signed 16-bit little-endian. Both functions reject
//! buffers with a dangling half sample instead of guessing.

use crate::error::{BridgeError, BridgeResult};

/// Default playback boost applied to synthesized speech before it reaches the caller.
pub const DEFAULT_GAIN: f32 = 1.3;

fn samples(frame: &[u8]) -> BridgeResult<impl Iterator<Item = i16> + '_> {
    if frame.len() % 2 != 0 {
        return Err(BridgeError::InvalidFrame(frame.len()));
    }
    Ok(frame
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]])))
}

/// Peak absolute amplitude of a PCM frame. Empty frames are silent (0).
///
/// Returned as `u16` so that `i16::MIN` reports 32768 rather than overflowing.
pub fn peak_amplitude(frame: &[u8]) -> BridgeResult<u16> {
    Ok(samples(frame)?
        .map(i16::unsigned_abs)
        .max()
        .unwrap_or(0))
}

/// Scale every sample by `gain`, truncating toward zero and saturating at the i16 range.
pub fn apply_gain(frame: &[u8], gain: f32) -> BridgeResult<Vec<u8>> {
    let mut out = Vec::with_capacity(frame.len());
    for sample in samples(frame)? {
        // f32 keeps decimal gains like 1.3 exact enough that 1000 scales to 1300, not 1299
        let scaled = (f32::from(sample) * gain)
            .trunc()
            .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
        out.extend_from_slice(&scaled.to_le_bytes());
    }
    Ok(out)
}
