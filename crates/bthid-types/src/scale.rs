//! Fixed-width encoding of continuous axes.
//!
//! Axis values are normalised floats. Relative axes are scaled to the signed
//! range of their field width and written big-endian two's-complement;
//! absolute axes use the logical maximum their descriptor declares.

/// Scale factor for a signed field of `width` bytes: `2^(8*width-1) - 1`.
///
/// One byte scales by 127 and two bytes by 32767. Widths above eight bytes
/// are clamped to eight.
#[must_use]
pub const fn signed_scale(width: usize) -> i64 {
    let bits = if width == 0 {
        0
    } else if width > 8 {
        63
    } else {
        8 * width - 1
    };
    if bits == 0 {
        return 0;
    }
    ((1u64 << bits) - 1) as i64
}

/// Encode a normalised value in `[-1.0, 1.0]` as an `N`-byte big-endian
/// two's-complement integer scaled by [`signed_scale`].
///
/// Out-of-range and NaN inputs are clamped; the fractional part is truncated
/// toward zero.
#[must_use]
pub fn scale_signed<const N: usize>(value: f64) -> [u8; N] {
    let scaled = (clamp_unit(value) * signed_scale(N) as f64) as i64;
    let wide = scaled.to_be_bytes();
    let mut out = [0u8; N];
    let take = N.min(wide.len());
    out[N - take..].copy_from_slice(&wide[wide.len() - take..]);
    out
}

/// Encode a normalised value in `[-1.0, 1.0]` as a little-endian signed
/// 16-bit absolute coordinate in `[-max, max]`.
///
/// Used by axes whose descriptor declares an explicit logical range.
#[must_use]
pub fn scale_absolute(value: f64, max: i16) -> [u8; 2] {
    let scaled = (clamp_unit(value) * f64::from(max)) as i16;
    scaled.to_le_bytes()
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}
