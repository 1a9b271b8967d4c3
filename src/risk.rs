//! Market risk parameters and pooled open interest.
//!
//! `RiskConfig` is the human facing form (decimals, serde). It converts into
//! `RiskParams`, the fixed point values the valuation math consumes. The open
//! interest cap for new builds is derived here from the latest oracle snapshot.

use crate::config::ConfigError;
use crate::fixed_point::{FixedPoint, MathError, TWO};
use crate::oracle::OracleSnapshot;
use crate::types::Side;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Largest notional cap a market may be configured with.
pub const MAX_CAP_NOTIONAL: Decimal = dec!(8000000);
pub const MAX_LMBDA: Decimal = dec!(10);
pub const MAX_DELTA: Decimal = dec!(0.2);
/// Longest average block time accepted, one hour.
pub const MAX_AVERAGE_BLOCK_TIME: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Max multiple of initial oi a long can gain (e.g. 5 = 500%).
    pub cap_payoff: Decimal,
    /// Maintenance margin as a fraction of initial oi.
    pub maintenance_margin_fraction: Decimal,
    /// Fee charged on notional per trade.
    pub trading_fee_rate: Decimal,
    /// Max tolerated log price drift per second between macro windows.
    pub price_drift_upper_limit: Decimal,
    /// Notional cap on each side before any bound applies.
    pub cap_notional: Decimal,
    /// Multiple of the micro window reserve one build may take.
    pub lmbda: Decimal,
    /// Static spread. Also scales the back-run bound.
    pub delta: Decimal,
    /// Net settlement asset minted over the rolling window before the
    /// circuit breaker starts shrinking the cap.
    pub circuit_breaker_mint_target: Decimal,
    /// Assumed seconds between blocks.
    pub average_block_time: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            cap_payoff: dec!(5),
            maintenance_margin_fraction: dec!(0.01),
            trading_fee_rate: dec!(0.00075),
            price_drift_upper_limit: dec!(0.0001),
            cap_notional: dec!(800000),
            lmbda: dec!(1),
            delta: dec!(0.00025),
            circuit_breaker_mint_target: dec!(66670),
            average_block_time: 14,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cap_payoff <= Decimal::ZERO {
            return Err(ConfigError::InvalidRisk {
                reason: "cap payoff must be positive".to_string(),
            });
        }
        if self.maintenance_margin_fraction <= Decimal::ZERO
            || self.maintenance_margin_fraction >= Decimal::ONE
        {
            return Err(ConfigError::InvalidRisk {
                reason: "maintenance margin fraction must be between 0 and 1".to_string(),
            });
        }
        if self.trading_fee_rate < Decimal::ZERO || self.trading_fee_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidRisk {
                reason: "trading fee rate must be in [0, 1)".to_string(),
            });
        }
        if self.price_drift_upper_limit <= Decimal::ZERO {
            return Err(ConfigError::InvalidRisk {
                reason: "price drift upper limit must be positive".to_string(),
            });
        }
        if self.cap_notional <= Decimal::ZERO || self.cap_notional > MAX_CAP_NOTIONAL {
            return Err(ConfigError::InvalidRisk {
                reason: format!("cap notional must be in (0, {}]", MAX_CAP_NOTIONAL),
            });
        }
        if self.lmbda < Decimal::ZERO || self.lmbda > MAX_LMBDA {
            return Err(ConfigError::InvalidRisk {
                reason: format!("lmbda must be in [0, {}]", MAX_LMBDA),
            });
        }
        if self.delta < Decimal::ZERO || self.delta > MAX_DELTA {
            return Err(ConfigError::InvalidRisk {
                reason: format!("delta must be in [0, {}]", MAX_DELTA),
            });
        }
        if self.circuit_breaker_mint_target <= Decimal::ZERO {
            return Err(ConfigError::InvalidRisk {
                reason: "circuit breaker mint target must be positive".to_string(),
            });
        }
        if self.average_block_time == 0 || self.average_block_time > MAX_AVERAGE_BLOCK_TIME {
            return Err(ConfigError::InvalidBlockTime);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    pub cap_payoff: FixedPoint,
    pub maintenance_margin_fraction: FixedPoint,
    pub trading_fee_rate: FixedPoint,
    pub price_drift_upper_limit: FixedPoint,
    pub cap_notional: FixedPoint,
    pub lmbda: FixedPoint,
    pub delta: FixedPoint,
    pub circuit_breaker_mint_target: FixedPoint,
    pub average_block_time: u64,
}

impl TryFrom<&RiskConfig> for RiskParams {
    type Error = ConfigError;

    fn try_from(config: &RiskConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            cap_payoff: FixedPoint::from_decimal(config.cap_payoff)?,
            maintenance_margin_fraction: FixedPoint::from_decimal(config.maintenance_margin_fraction)?,
            trading_fee_rate: FixedPoint::from_decimal(config.trading_fee_rate)?,
            price_drift_upper_limit: FixedPoint::from_decimal(config.price_drift_upper_limit)?,
            cap_notional: FixedPoint::from_decimal(config.cap_notional)?,
            lmbda: FixedPoint::from_decimal(config.lmbda)?,
            delta: FixedPoint::from_decimal(config.delta)?,
            circuit_breaker_mint_target: FixedPoint::from_decimal(config.circuit_breaker_mint_target)?,
            average_block_time: config.average_block_time,
        })
    }
}

// 3.1: open interest cap

impl RiskParams {
    /// Shrinks `cap_notional` linearly once more than the mint target has
    /// been minted, reaching zero at twice the target. Net burns pass as zero.
    pub fn circuit_breaker(&self, minted: FixedPoint, cap_notional: FixedPoint) -> Result<FixedPoint, MathError> {
        let target = self.circuit_breaker_mint_target;
        if minted <= target {
            return Ok(cap_notional);
        }

        let ratio = minted.div_up(target)?;
        if ratio >= TWO {
            return Ok(FixedPoint::ZERO);
        }
        cap_notional.mul_down(TWO.sub(ratio)?)
    }

    /// `cap_notional` clamped to the front-run and back-run bounds of the
    /// snapshot. Unchanged when the venue reports no reserve.
    pub fn cap_notional_adjusted_for_bounds(
        &self,
        data: &OracleSnapshot,
        cap_notional: FixedPoint,
    ) -> Result<FixedPoint, MathError> {
        if !data.has_reserve {
            return Ok(cap_notional);
        }
        let front_run = data.front_run_bound(self.lmbda)?;
        let back_run = data.back_run_bound(self.delta, self.average_block_time)?;
        Ok(cap_notional.min(front_run).min(back_run))
    }

    /// Open interest a side may hold after the next build: the configured
    /// notional cap through the circuit breaker and the snapshot bounds,
    /// framed at the mid price.
    pub fn cap_oi(&self, data: &OracleSnapshot, minted: FixedPoint) -> Result<FixedPoint, MathError> {
        let cap = self.circuit_breaker(minted, self.cap_notional)?;
        let cap = self.cap_notional_adjusted_for_bounds(data, cap)?;
        oi_from_notional(cap, data.mid_price()?)
    }
}

/// Notional over the mid price. Rounds down so the cap never overshoots.
pub fn oi_from_notional(notional: FixedPoint, mid_price: FixedPoint) -> Result<FixedPoint, MathError> {
    notional.div_down(mid_price)
}

/// Pool totals for both sides of a market. Positions hold shares of their
/// side; funding moves `long`/`short` while shares stay put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenInterest {
    pub long: FixedPoint,
    pub long_shares: FixedPoint,
    pub short: FixedPoint,
    pub short_shares: FixedPoint,
}

impl OpenInterest {
    /// (total oi, total oi shares) for one side.
    pub fn totals(&self, side: Side) -> (FixedPoint, FixedPoint) {
        match side {
            Side::Long => (self.long, self.long_shares),
            Side::Short => (self.short, self.short_shares),
        }
    }
}
