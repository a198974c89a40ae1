use embassy_time::{Duration, Instant};

/// Scale an 8-bit value by a factor (0-255 = 0.0-1.0)
///
/// Uses integer math for efficiency on embedded systems.
#[inline]
#[allow(clippy::cast_lossless, clippy::cast_possible_truncation)]
pub const fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Scale an 8-bit value, keeping non-zero inputs non-zero
#[inline]
pub const fn scale8_video(value: u8, scale: u8) -> u8 {
    let scaled = scale8(value, scale);
    if scaled == 0 && value != 0 && scale != 0 {
        1
    } else {
        scaled
    }
}

/// Linearly map `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// The result is clamped to the output range. A degenerate input range maps
/// everything to `out_min`.
#[allow(clippy::cast_possible_truncation)]
pub const fn map_range(value: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_max == in_min {
        return out_min;
    }
    let mapped = out_min as i64
        + (value as i64 - in_min as i64) * (out_max as i64 - out_min as i64)
            / (in_max as i64 - in_min as i64);
    let (low, high) = if out_min <= out_max {
        (out_min as i64, out_max as i64)
    } else {
        (out_max as i64, out_min as i64)
    };
    let clamped = if mapped < low {
        low
    } else if mapped > high {
        high
    } else {
        mapped
    };
    clamped as i32
}

/// Time elapsed from `since` to `now`.
///
/// Tick counters are subtracted with wrapping arithmetic, so a counter that
/// wrapped between the two samples still yields the true distance.
#[inline]
pub fn elapsed_since(now: Instant, since: Instant) -> Duration {
    Duration::from_ticks(now.as_ticks().wrapping_sub(since.as_ticks()))
}

/// Milliseconds elapsed from `since` to `now`, see [`elapsed_since`].
#[inline]
pub fn elapsed_ms(now: Instant, since: Instant) -> u64 {
    elapsed_since(now, since).as_millis()
}

/// Blend two 8-bit values
#[inline]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub const fn blend8(a: u8, b: u8, amount_of_b: u8) -> u8 {
    let delta = b as i16 - a as i16;

    let mut partial: u32 = (a as u32) << 16; // a * 65536
    partial = partial.wrapping_add(
        (delta as u32)
            .wrapping_mul(amount_of_b as u32)
            .wrapping_mul(257),
    ); // (b - a) * amount_of_b * 257
    partial = partial.wrapping_add(0x8000); // + 32768 for rounding

    (partial >> 16) as u8
}
