//! Depth to grayscale mapping.
//!
//! Raw depth samples are unsigned 16-bit values in sensor units
//! (millimetres for the usual time-of-flight sensors). A sample inside the
//! frame's reliable range is divided by a fixed ratio and narrowed to a
//! byte; anything outside the range renders black.

use core::num::NonZeroU16;

use crate::types::{DepthRange, DepthStreamConfig, Narrowing};

/// Deepest reading the sensor reports as meaningful.
pub const SENSOR_MAX_DEPTH: u16 = 8000;

/// Divisor spreading `0..=SENSOR_MAX_DEPTH` over 256 gray levels.
pub const MAP_DEPTH_TO_BYTE: NonZeroU16 = match NonZeroU16::new(SENSOR_MAX_DEPTH / 256) {
    Some(ratio) => ratio,
    None => panic!("depth to byte ratio must be non-zero"),
};

/// Size of one raw depth sample.
pub const BYTES_PER_DEPTH_SAMPLE: usize = core::mem::size_of::<u16>();

/// Map a single depth reading to a gray level.
#[inline]
pub fn depth_to_byte(depth: u16, range: DepthRange, ratio: NonZeroU16, narrowing: Narrowing) -> u8 {
    if !range.contains(depth) {
        return 0;
    }
    let scaled = depth / ratio.get();
    match narrowing {
        Narrowing::Wrap => scaled as u8,
        Narrowing::Saturate => u8::try_from(scaled).unwrap_or(u8::MAX),
    }
}

/// Convert native-endian 16-bit samples from `src` into gray levels in
/// `dst`.
///
/// Returns the number of samples written, which is the smaller of the
/// sample count in `src` and `dst.len()`. A trailing odd byte in `src` is
/// ignored.
pub fn convert_depth_samples(
    src: &[u8],
    range: DepthRange,
    config: &DepthStreamConfig,
    dst: &mut [u8],
) -> usize {
    let ratio = config.depth_to_byte;
    let narrowing = config.narrowing;
    let mut written = 0;
    for (sample, out) in src.chunks_exact(BYTES_PER_DEPTH_SAMPLE).zip(dst.iter_mut()) {
        let depth = u16::from_ne_bytes([sample[0], sample[1]]);
        *out = depth_to_byte(depth, range, ratio, narrowing);
        written += 1;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_bytes(samples: &[u16]) -> [u8; 8] {
        let mut out = [0u8; 8];
        for (chunk, s) in out.chunks_exact_mut(2).zip(samples) {
            chunk.copy_from_slice(&s.to_ne_bytes());
        }
        out
    }

    #[test]
    fn ratio_is_integer_division() {
        assert_eq!(MAP_DEPTH_TO_BYTE.get(), 31);
    }

    #[test]
    fn reference_scenario() {
        let range = DepthRange::new(500, u16::MAX);
        let r = MAP_DEPTH_TO_BYTE;
        assert_eq!(depth_to_byte(4000, range, r, Narrowing::Wrap), 129);
        assert_eq!(depth_to_byte(50, range, r, Narrowing::Wrap), 0);
        // 65535 / 31 = 2114, whose low byte is 66.
        assert_eq!(depth_to_byte(u16::MAX, range, r, Narrowing::Wrap), 66);
        assert_eq!(depth_to_byte(u16::MAX, range, r, Narrowing::Saturate), 255);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = DepthRange::new(500, 4500);
        let r = MAP_DEPTH_TO_BYTE;
        assert_eq!(depth_to_byte(500, range, r, Narrowing::Wrap), 16);
        assert_eq!(depth_to_byte(4500, range, r, Narrowing::Wrap), 145);
        assert_eq!(depth_to_byte(499, range, r, Narrowing::Wrap), 0);
        assert_eq!(depth_to_byte(4501, range, r, Narrowing::Wrap), 0);
    }

    #[test]
    fn values_below_ratio_render_black_even_when_reliable() {
        let range = DepthRange::new(0, u16::MAX);
        assert_eq!(depth_to_byte(30, range, MAP_DEPTH_TO_BYTE, Narrowing::Wrap), 0);
        assert_eq!(depth_to_byte(31, range, MAP_DEPTH_TO_BYTE, Narrowing::Wrap), 1);
    }

    #[test]
    fn converts_a_buffer() {
        let config = DepthStreamConfig::default();
        let src = to_bytes(&[4000, 50, 500, u16::MAX]);
        let mut dst = [0xAAu8; 4];
        let n = convert_depth_samples(&src, config.range_for(500), &config, &mut dst);
        assert_eq!(n, 4);
        assert_eq!(dst, [129, 0, 16, 66]);
    }

    #[test]
    fn stops_at_the_shorter_side() {
        let config = DepthStreamConfig::default();
        let src = to_bytes(&[3100, 3100, 3100, 3100]);
        let mut dst = [0u8; 2];
        assert_eq!(convert_depth_samples(&src, config.range_for(0), &config, &mut dst), 2);
        assert_eq!(dst, [100, 100]);

        let mut dst = [0u8; 8];
        assert_eq!(convert_depth_samples(&src[..5], config.range_for(0), &config, &mut dst), 2);
        assert_eq!(&dst[..3], &[100, 100, 0]);
    }
}
