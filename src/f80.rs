use crate::cast;

const EXPONENT_BIAS: u16 = 16383;
const F64_EXPONENT_BIAS: u16 = 1023;
const POW_2_63: f64 = cast::u64_to_f64(1u64 << 63);

/// Returns 2 to the power of `exp`, where `exp` is in the normal f64 exponent range.
fn pow2(exp: u16, negative: bool) -> f64 {
    let pow = f64::from_bits(u64::from(exp + F64_EXPONENT_BIAS) << 52);
    if negative { 1.0 / pow } else { pow }
}

/// Converts an 80-bit extended precision float (the COMM chunk sample rate)
/// to f64.
///
/// Values too large for f64 become infinities and values too small become zeros.
/// Denormal values are always read as zeros.
pub fn f80_to_f64(bytes: &[u8; 10]) -> f64 {
    let sign = if bytes[0] & 0x80 == 0 { 1.0 } else { -1.0 };
    let exponent = u16::from_be_bytes([ bytes[0], bytes[1] ]) & 0x7fff;
    let mut mantissa_buf = [0u8; 8];
    mantissa_buf.copy_from_slice(&bytes[2..]);
    let mantissa = u64::from_be_bytes(mantissa_buf);

    if exponent == 0x7fff {
        // the integer bit is ignored: zero fraction is infinity, anything else NaN
        if mantissa & 0x7fff_ffff_ffff_ffff == 0 {
            return sign * f64::INFINITY;
        }
        return f64::NAN;
    }
    if mantissa == 0 || exponent < EXPONENT_BIAS - (F64_EXPONENT_BIAS - 1) {
        return sign * 0.0;
    }
    if exponent > EXPONENT_BIAS + F64_EXPONENT_BIAS {
        return sign * f64::INFINITY;
    }
    // may lose the lowest 11 bits of the mantissa
    let m = cast::u64_to_f64(mantissa) / POW_2_63;
    if exponent >= EXPONENT_BIAS {
        sign * m * pow2(exponent - EXPONENT_BIAS, false)
    } else {
        sign * m * pow2(EXPONENT_BIAS - exponent, true)
    }
}

/// Converts f64 to an 80-bit extended precision float. The conversion is exact.
pub fn f64_to_f80(value: f64) -> [u8; 10] {
    let sign: u16 = if value.is_sign_negative() { 0x8000 } else { 0 };
    let (exponent, mantissa) = if value.is_nan() {
        (0x7fff, u64::MAX)
    } else if value.is_infinite() {
        (0x7fff, 0)
    } else if value == 0.0 {
        (0, 0)
    } else {
        let bits = value.to_bits();
        let exp64 = (bits >> 52) & 0x7ff;
        let fraction = bits & 0x000f_ffff_ffff_ffff;
        if exp64 == 0 {
            // subnormal f64: normalize so that the integer bit is set
            let shift = fraction.leading_zeros();
            let exponent = u32::from(EXPONENT_BIAS) + 63 - 1074 - shift;
            (u16::try_from(exponent).unwrap_or(0), fraction << shift)
        } else {
            let exponent = exp64 + u64::from(EXPONENT_BIAS) - u64::from(F64_EXPONENT_BIAS);
            (u16::try_from(exponent).unwrap_or(0x7fff), 1u64 << 63 | fraction << 11)
        }
    };
    let mut out = [0u8; 10];
    let sign_and_exponent = if value.is_nan() { exponent } else { sign | exponent };
    out[0..2].copy_from_slice(&sign_and_exponent.to_be_bytes());
    out[2..10].copy_from_slice(&mantissa.to_be_bytes());
    out
}
