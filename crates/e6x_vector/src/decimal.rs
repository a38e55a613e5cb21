//! DECIMAL128 decoding.
//!
//! The engine ships decimals in two encodings. The metadata stream carries
//! them as UTF-8 decimal text. Columnar chunks carry 16 bytes of IEEE
//! 754-2008 Decimal128, big-endian. The binary decoder here is deliberately
//! conservative: it extracts the sign, the 17-bit combination field and the
//! 110-bit coefficient continuation, treats the continuation as a binary
//! integer holding the 33 digits after the most significant digit, and
//! refuses nothing. Inputs it cannot make sense of decode to zero, and the
//! special values (NaN and the infinities) decode to `None` so the caller
//! can surface a null cell. A full densely-packed-decimal table is not
//! attempted.

use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Zero};
use tracing::warn;

/// Exponent bias of the Decimal128 interchange format.
const EXPONENT_BIAS: i64 = 6176;

/// Largest coefficient continuation that still reads as 33 decimal digits.
const MAX_CONTINUATION: u128 = 10u128.pow(33);

/// Parse a decimal shipped as UTF-8 text. Unparseable input decodes to zero.
pub fn decimal_from_text(raw: &[u8]) -> BigDecimal {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(_) => {
            warn!("decimal text is not UTF-8, decoding as zero");
            return BigDecimal::zero();
        }
    };
    match BigDecimal::from_str(text) {
        Ok(value) => value.normalized(),
        Err(_) => {
            warn!(text, "unparseable decimal text, decoding as zero");
            BigDecimal::zero()
        }
    }
}

/// Decode 16 bytes of big-endian IEEE 754-2008 Decimal128.
///
/// Returns `None` for NaN and the infinities; every other input returns a
/// value, with zero standing in for encodings outside the subset this
/// decoder understands.
pub fn decimal_from_binary(raw: &[u8]) -> Option<BigDecimal> {
    let bytes: [u8; 16] = match raw.try_into() {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(len = raw.len(), "decimal128 payload is not 16 bytes, decoding as zero");
            return Some(BigDecimal::zero());
        }
    };
    let bits = u128::from_be_bytes(bytes);

    let negative = (bits >> 127) & 1 == 1;
    let combination = ((bits >> 110) & 0x1_FFFF) as u32;
    let continuation = bits & ((1u128 << 110) - 1);

    let (biased_exponent, msd) = if combination >> 15 == 0b11 {
        match combination >> 12 {
            0b11110 => return None, // infinity
            0b11111 => return None, // NaN
            _ => (combination & 0x3FFF, 8 + ((combination >> 14) & 1)),
        }
    } else {
        ((combination >> 3) & 0x3FFF, combination & 0x7)
    };

    if continuation >= MAX_CONTINUATION {
        warn!("decimal128 coefficient continuation out of range, decoding as zero");
        return Some(BigDecimal::zero());
    }

    let exponent = i64::from(biased_exponent) - EXPONENT_BIAS;
    let coefficient = u128::from(msd) * MAX_CONTINUATION + continuation;
    let mut digits = BigInt::from(coefficient);
    if negative {
        digits = -digits;
    }
    // BigDecimal scale is the negated power-of-ten exponent.
    Some(BigDecimal::new(digits, -exponent).normalized())
}
