//! Oracle snapshot: the one structure every price feed produces.
//!
//! Three TWAP samples (micro window, macro window, the macro window before
//! that) and a reserve estimate over the micro window. Produced once per
//! update and consumed immediately.

use crate::fixed_point::{FixedPoint, MathError, ONE, TWO};
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSnapshot {
    pub timestamp: Timestamp,
    pub micro_window: u64,
    pub macro_window: u64,
    pub price_over_micro_window: FixedPoint,
    pub price_over_macro_window: FixedPoint,
    pub price_one_macro_window_ago: FixedPoint,
    /// Liquidity depth over the micro window, in the settlement asset.
    pub reserve_over_micro_window: FixedPoint,
    /// False only for venues without a liquidity curve.
    pub has_reserve: bool,
}

impl OracleSnapshot {
    /// Midpoint of the fresh and lagged prices.
    pub fn mid_price(&self) -> Result<FixedPoint, MathError> {
        self.price_over_micro_window
            .add(self.price_over_macro_window)?
            .div_down(TWO)
    }

    /// Whether the macro price moved less than the drift limit allows over
    /// one macro window. Zero prices are never valid.
    pub fn data_is_valid(&self, price_drift_upper_limit: FixedPoint) -> Result<bool, MathError> {
        let price_now = self.price_over_macro_window;
        let price_last = self.price_one_macro_window_ago;
        if price_now.is_zero() || price_last.is_zero() {
            return Ok(false);
        }

        let dp = price_now.div_up(price_last)?;
        let pow = price_drift_upper_limit.mul_up(FixedPoint::from_int(self.macro_window))?;
        let upper = pow.exp_up()?;
        let lower = ONE.div_down(upper)?;

        Ok(dp >= lower && dp <= upper)
    }

    /// Notional one build may take before it can front-run the micro window
    /// price: `lmbda * reserve`.
    pub fn front_run_bound(&self, lmbda: FixedPoint) -> Result<FixedPoint, MathError> {
        lmbda.mul_down(self.reserve_over_micro_window)
    }

    /// Notional that can be built over one macro window before it can
    /// back-run the macro price: `2 * delta * reserve * blocks per window`.
    pub fn back_run_bound(&self, delta: FixedPoint, average_block_time: u64) -> Result<FixedPoint, MathError> {
        let window = FixedPoint::from_int(self.macro_window).div_down(FixedPoint::from_int(average_block_time))?;
        delta
            .mul_down(self.reserve_over_micro_window)?
            .mul_down(window)?
            .mul_down(TWO)
    }
}
