// 2.0: fixed point numbers. 256-bit unsigned, scaled by 1e18.
// every multiply and divide names its rounding direction. overflow and
// division by zero are errors, never wraps.

use crate::log_exp;
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const ONE_RAW: u64 = 1_000_000_000_000_000_000;

/// Relative error bound padded onto `pow_up`/`pow_down` results (1e-14).
pub const MAX_POW_RELATIVE_ERROR: FixedPoint = FixedPoint(U256([10_000, 0, 0, 0]));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("fixed point overflow")]
    Overflow,

    #[error("fixed point underflow")]
    Underflow,

    #[error("power arguments out of bounds")]
    PowOutOfBounds,

    #[error("decimal not representable as fixed point: {0}")]
    InvalidDecimal(String),
}

/// A non-negative real number `raw / 1e18`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(U256);

// 2.1: constants
pub const ONE: FixedPoint = FixedPoint(U256([ONE_RAW, 0, 0, 0]));
pub const TWO: FixedPoint = FixedPoint(U256([2 * ONE_RAW, 0, 0, 0]));
pub const FOUR: FixedPoint = FixedPoint(U256([4 * ONE_RAW, 0, 0, 0]));
pub const HALF: FixedPoint = FixedPoint(U256([ONE_RAW / 2, 0, 0, 0]));

impl FixedPoint {
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));
    pub const ONE: Self = ONE;
    pub const MAX: Self = Self(U256::MAX);

    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub fn from_raw_u128(raw: u128) -> Self {
        Self(U256::from(raw))
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    /// Whole units, e.g. `from_int(5)` is 5.0.
    pub fn from_int(n: u64) -> Self {
        Self(U256::from(n) * U256::from(ONE_RAW))
    }

    /// `numerator / denominator` rounded down. Handy for literals like 0.4.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Result<Self, MathError> {
        Self::from_int(numerator).div_down(Self::from_int(denominator))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    // 2.2: add/sub
    pub fn add(self, other: Self) -> Result<Self, MathError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    pub fn sub(self, other: Self) -> Result<Self, MathError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(MathError::Underflow)
    }

    /// `self - other`, or zero when `other` is larger.
    pub fn sub_floor(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `1 - self`, floored at zero.
    pub fn complement(self) -> Self {
        ONE.sub_floor(self)
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    // 2.3: directional multiply/divide
    pub fn mul_down(self, other: Self) -> Result<Self, MathError> {
        let product = self.0.checked_mul(other.0).ok_or(MathError::Overflow)?;
        Ok(Self(product / U256::from(ONE_RAW)))
    }

    pub fn mul_up(self, other: Self) -> Result<Self, MathError> {
        let product = self.0.checked_mul(other.0).ok_or(MathError::Overflow)?;
        if product.is_zero() {
            return Ok(Self::ZERO);
        }
        Ok(Self((product - U256::one()) / U256::from(ONE_RAW) + U256::one()))
    }

    pub fn div_down(self, other: Self) -> Result<Self, MathError> {
        if other.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let inflated = self
            .0
            .checked_mul(U256::from(ONE_RAW))
            .ok_or(MathError::Overflow)?;
        Ok(Self(inflated / other.0))
    }

    pub fn div_up(self, other: Self) -> Result<Self, MathError> {
        if other.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::ZERO);
        }
        let inflated = self
            .0
            .checked_mul(U256::from(ONE_RAW))
            .ok_or(MathError::Overflow)?;
        Ok(Self((inflated - U256::one()) / other.0 + U256::one()))
    }

    // 2.4: powers. exact for 1, 2 and 4, otherwise exp(y * ln x) padded by
    // the relative error bound in the requested direction.
    pub fn pow_up(self, exponent: Self) -> Result<Self, MathError> {
        if exponent == ONE {
            return Ok(self);
        }
        if exponent == TWO {
            return self.mul_up(self);
        }
        if exponent == FOUR {
            let square = self.mul_up(self)?;
            return square.mul_up(square);
        }
        let raw = Self(log_exp::pow(self.0, exponent.0)?);
        let max_error = raw.mul_up(MAX_POW_RELATIVE_ERROR)?.add(Self(U256::one()))?;
        raw.add(max_error)
    }

    pub fn pow_down(self, exponent: Self) -> Result<Self, MathError> {
        if exponent == ONE {
            return Ok(self);
        }
        if exponent == TWO {
            return self.mul_down(self);
        }
        if exponent == FOUR {
            let square = self.mul_down(self)?;
            return square.mul_down(square);
        }
        let raw = Self(log_exp::pow(self.0, exponent.0)?);
        let max_error = raw.mul_up(MAX_POW_RELATIVE_ERROR)?.add(Self(U256::one()))?;
        Ok(raw.sub_floor(max_error))
    }

    /// e^self rounded up. `self` must be at most 130.
    pub fn exp_up(self) -> Result<Self, MathError> {
        let raw = Self(log_exp::exp(self.0)?);
        let max_error = raw.mul_up(MAX_POW_RELATIVE_ERROR)?.add(Self(U256::one()))?;
        raw.add(max_error)
    }

    pub fn exp_down(self) -> Result<Self, MathError> {
        let raw = Self(log_exp::exp(self.0)?);
        let max_error = raw.mul_up(MAX_POW_RELATIVE_ERROR)?.add(Self(U256::one()))?;
        Ok(raw.sub_floor(max_error))
    }

    // 2.5: decimal conversions for human facing config and display
    pub fn from_decimal(value: Decimal) -> Result<Self, MathError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MathError::InvalidDecimal(value.to_string()));
        }
        let mantissa = U256::from(value.mantissa().unsigned_abs());
        let scale = value.scale() as usize;
        let raw = if scale <= 18 {
            mantissa
                .checked_mul(U256::exp10(18 - scale))
                .ok_or(MathError::Overflow)?
        } else {
            mantissa / U256::exp10(scale - 18)
        };
        Ok(Self(raw))
    }

    /// Lossy when the value needs more than 28 significant digits.
    pub fn to_decimal(&self) -> Result<Decimal, MathError> {
        let max_mantissa = U256::from(Decimal::MAX.mantissa().unsigned_abs());
        let mut raw = self.0;
        let mut scale = 18u32;
        while raw > max_mantissa && scale > 0 {
            raw = raw / U256::from(10u8);
            scale -= 1;
        }
        if raw > max_mantissa {
            return Err(MathError::InvalidDecimal(self.to_string()));
        }
        Ok(Decimal::from_i128_with_scale(raw.low_u128() as i128, scale).normalize())
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let one = U256::from(ONE_RAW);
        let whole = self.0 / one;
        let frac = (self.0 % one).low_u64();
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

// raw integer as a decimal string, so json keeps full 256-bit precision
impl Serialize for FixedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s)
            .map(Self)
            .map_err(|e| serde::de::Error::custom(format!("invalid fixed point {s}: {e:?}")))
    }
}
