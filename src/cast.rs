/// Casts i32 to i16, clamping values outside the i16 range.
#[allow(clippy::cast_possible_truncation)] // value has been clamped to the i16 range
#[inline(always)]
pub fn clamp_i32_to_i16(value: i32) -> i16 {
    if value > i32::from(i16::MAX) {
        i16::MAX
    } else if value < i32::from(i16::MIN) {
        i16::MIN
    } else {
        value as i16
    }
}

/// Casts usize to u64. Returns an error if usize doesn't fit in u64.
#[inline(always)]
pub fn usize_to_u64(value: usize, err: crate::AiffError) -> crate::AiffResult<u64> {
    // this should always succeed, unless usize is extended to be 128 bits long
    u64::try_from(value).map_err(|_| err)
}

/// Casts u64 to i64 for relative seeks. Returns an error if the value doesn't fit in i64.
#[inline(always)]
pub fn u64_to_i64(value: u64, err: crate::AiffError) -> crate::AiffResult<i64> {
    i64::try_from(value).map_err(|_| err)
}

/// Casts u64 to f64.
#[allow(clippy::cast_precision_loss)] // rounding to the nearest f64 is expected
#[inline(always)]
pub const fn u64_to_f64(value: u64) -> f64 {
    value as f64
}

/// Casts u32 to usize, saturating on targets where usize is narrower than 32 bits.
#[inline(always)]
pub fn u32_to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
