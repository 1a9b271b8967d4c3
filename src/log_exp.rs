//! Natural logarithm and exponential over 18-decimal fixed point.
//!
//! Series are evaluated at 36 decimals so the terms keep precision well past
//! the 18 decimals callers see. Results are within a few units of 1e-18
//! relative error; `FixedPoint::pow_up`/`pow_down` pad that with
//! `MAX_POW_RELATIVE_ERROR` so the rounding direction still holds.

use crate::fixed_point::MathError;
use primitive_types::{U256, U512};

const ONE_18: u128 = 1_000_000_000_000_000_000;
const ONE_36: u128 = 1_000_000_000_000_000_000_000_000_000_000_000_000;
const ONE_36_BITS: i32 = 120;
const LN2_36: u128 = 693_147_180_559_945_309_417_232_121_458_176_568;

/// Largest `y * ln(x)` accepted, 18 decimals. e^130 is near the top of U256.
pub const MAX_NATURAL_EXPONENT: i128 = 130 * ONE_18 as i128;
/// Smallest `y * ln(x)` accepted, 18 decimals. e^-41 is about 1 wei.
pub const MIN_NATURAL_EXPONENT: i128 = -41 * ONE_18 as i128;

// x < 2^255, y < 2^254
const MILD_BASE_BITS: usize = 255;
const MILD_EXPONENT_BITS: usize = 254;

fn widen(v: U256) -> U512 {
    let w = v.0;
    U512([w[0], w[1], w[2], w[3], 0, 0, 0, 0])
}

fn narrow(v: U512) -> Result<U256, MathError> {
    if v.bits() > 256 {
        return Err(MathError::Overflow);
    }
    Ok(U256([v.0[0], v.0[1], v.0[2], v.0[3]]))
}

fn shift(v: U512, k: i32) -> U512 {
    if k >= 0 {
        v >> (k as usize)
    } else {
        v << ((-k) as usize)
    }
}

/// ln(x) at 36 decimals for an 18-decimal `x`.
pub(crate) fn ln_36(x: U256) -> Result<i128, MathError> {
    if x.is_zero() {
        return Err(MathError::PowOutOfBounds);
    }

    // x at 36 decimals, then pull out x = m * 2^k with m in [1, 2)
    let scaled = widen(x) * U512::from(ONE_18);
    let mut k = scaled.bits() as i32 - ONE_36_BITS;
    let mut m = narrow(shift(scaled, k))?;
    let one = U256::from(ONE_36);
    if m < one {
        k -= 1;
        m = narrow(shift(scaled, k))?;
    }

    // ln(m) = 2 * atanh((m - 1) / (m + 1)), z < 1/3 so this converges fast
    let z = (m - one) * one / (m + one);
    let z_squared = z * z / one;
    let mut term = z;
    let mut sum = z;
    let mut n = 3u64;
    loop {
        term = term * z_squared / one;
        if term.is_zero() {
            break;
        }
        sum += term / U256::from(n);
        n += 2;
    }
    let ln_m = (sum * U256::from(2u8)).low_u128() as i128;

    (k as i128)
        .checked_mul(LN2_36 as i128)
        .and_then(|v| v.checked_add(ln_m))
        .ok_or(MathError::Overflow)
}

/// e^x for `x` at 36 decimals, returned at 18 decimals.
pub(crate) fn exp_36(x: i128) -> Result<U256, MathError> {
    let max = MAX_NATURAL_EXPONENT * ONE_18 as i128;
    let min = MIN_NATURAL_EXPONENT * ONE_18 as i128;
    if x > max || x < min {
        return Err(MathError::PowOutOfBounds);
    }

    // x = k * ln2 + r with r in [0, ln2)
    let k = x.div_euclid(LN2_36 as i128);
    let r = U256::from(x.rem_euclid(LN2_36 as i128) as u128);

    let one = U256::from(ONE_36);
    let mut term = one;
    let mut sum = one;
    let mut n = 1u64;
    loop {
        term = term * r / (one * U256::from(n));
        if term.is_zero() {
            break;
        }
        sum += term;
        n += 1;
    }

    if k >= 0 {
        narrow((widen(sum) << (k as usize)) / U512::from(ONE_18))
    } else {
        Ok((sum >> ((-k) as usize)) / U256::from(ONE_18))
    }
}

/// x^y for 18-decimal `x` and `y`, computed as exp(y * ln(x)).
pub fn pow(x: U256, y: U256) -> Result<U256, MathError> {
    if y.is_zero() {
        return Ok(U256::from(ONE_18));
    }
    if x.is_zero() {
        return Ok(U256::zero());
    }
    if x.bits() > MILD_BASE_BITS || y.bits() > MILD_EXPONENT_BITS {
        return Err(MathError::PowOutOfBounds);
    }

    let ln_x = ln_36(x)?;
    let magnitude = U256::from(ln_x.unsigned_abs())
        .checked_mul(y)
        .ok_or(MathError::PowOutOfBounds)?
        / U256::from(ONE_18);

    let limit = if ln_x >= 0 {
        MAX_NATURAL_EXPONENT
    } else {
        -MIN_NATURAL_EXPONENT
    };
    if magnitude > U256::from(limit as u128) * U256::from(ONE_18) {
        return Err(MathError::PowOutOfBounds);
    }

    let exponent = magnitude.low_u128() as i128;
    exp_36(if ln_x >= 0 { exponent } else { -exponent })
}

/// e^x for a non-negative 18-decimal `x`.
pub fn exp(x: U256) -> Result<U256, MathError> {
    if x > U256::from(MAX_NATURAL_EXPONENT as u128) {
        return Err(MathError::PowOutOfBounds);
    }
    exp_36(x.low_u128() as i128 * ONE_18 as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(whole: u64) -> U256 {
        U256::from(whole) * U256::from(ONE_18)
    }

    fn assert_close(actual: U256, expected: U256, max_rel_err_e18: u64) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        let tolerance = expected * U256::from(max_rel_err_e18) / U256::from(ONE_18) + U256::one();
        assert!(
            diff <= tolerance,
            "actual {} expected {} diff {}",
            actual,
            expected,
            diff
        );
    }

    #[test]
    fn ln_of_one_is_zero() {
        assert_eq!(ln_36(fp(1)).unwrap(), 0);
    }

    #[test]
    fn ln_of_two() {
        let ln2 = ln_36(fp(2)).unwrap();
        assert!((ln2 - LN2_36 as i128).abs() < 1_000);
    }

    #[test]
    fn ln_of_fraction_is_negative() {
        // ln(0.5) = -ln(2)
        let half = U256::from(ONE_18 / 2);
        let ln_half = ln_36(half).unwrap();
        assert!((ln_half + LN2_36 as i128).abs() < 1_000);
    }

    #[test]
    fn ln_of_zero_fails() {
        assert_eq!(ln_36(U256::zero()), Err(MathError::PowOutOfBounds));
    }

    #[test]
    fn exp_of_zero_is_one() {
        assert_eq!(exp(U256::zero()).unwrap(), fp(1));
    }

    #[test]
    fn exp_of_one_is_euler() {
        let e = U256::from(2_718_281_828_459_045_235u128);
        assert_close(exp(fp(1)).unwrap(), e, 10);
    }

    #[test]
    fn exp_rejects_large_exponent() {
        assert_eq!(exp(fp(131)), Err(MathError::PowOutOfBounds));
    }

    #[test]
    fn pow_integer_exponent() {
        // 3^4 = 81
        assert_close(pow(fp(3), fp(4)).unwrap(), fp(81), 100);
    }

    #[test]
    fn pow_square_root() {
        let half = U256::from(ONE_18 / 2);
        assert_close(pow(fp(16), half).unwrap(), fp(4), 100);
    }

    #[test]
    fn pow_fractional_base() {
        // 0.25^0.5 = 0.5
        let quarter = U256::from(ONE_18 / 4);
        let half = U256::from(ONE_18 / 2);
        assert_close(pow(quarter, half).unwrap(), half, 100);
    }

    #[test]
    fn pow_edge_cases() {
        assert_eq!(pow(fp(7), U256::zero()).unwrap(), fp(1));
        assert_eq!(pow(U256::zero(), fp(2)).unwrap(), U256::zero());
        assert_eq!(pow(fp(1000), fp(1000)), Err(MathError::PowOutOfBounds));
    }
}
