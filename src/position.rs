// 4.0: leveraged position record and the valuation pipeline.
// shares -> current oi -> value -> notional -> fee. every step rounds so
// the position is never worth more than the pool can pay out.
// 4.1 (liquidation checks) lives in liquidation.rs.

use crate::fixed_point::{FixedPoint, MathError, ONE, TWO};
use crate::risk::RiskParams;
use crate::types::Side;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Shares and debt are stored in 120 bits.
pub const MAX_U120: FixedPoint = FixedPoint::from_raw(U256([u64::MAX, (1u64 << 56) - 1, 0, 0]));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Claim on one side's pooled open interest, fixed at build.
    pub oi_shares: FixedPoint,
    /// Borrowed notional backing the leverage, fixed at build.
    pub debt: FixedPoint,
    pub is_long: bool,
    /// Terminal. Once set the position never exists again.
    pub liquidated: bool,
    pub entry_price: FixedPoint,
}

impl Position {
    pub fn new(side: Side, oi_shares: FixedPoint, debt: FixedPoint, entry_price: FixedPoint) -> Self {
        Self {
            oi_shares,
            debt,
            is_long: side.is_long(),
            liquidated: false,
            entry_price,
        }
    }

    pub fn side(&self) -> Side {
        Side::from_is_long(self.is_long)
    }

    pub fn exists(&self) -> bool {
        !self.liquidated && !self.oi_shares.is_zero()
    }

    pub fn oi_shares_current(&self, fraction: FixedPoint) -> Result<FixedPoint, MathError> {
        self.oi_shares.mul_down(fraction)
    }

    pub fn debt_current(&self, fraction: FixedPoint) -> Result<FixedPoint, MathError> {
        self.debt.mul_down(fraction)
    }

    /// Open interest at build. Shares are minted 1:1 against oi when built.
    pub fn oi_initial(&self, fraction: FixedPoint) -> Result<FixedPoint, MathError> {
        self.oi_shares.mul_up(fraction)
    }

    // 4.2: shares -> oi, pro rata to the side's pool. zero shares and an
    // empty pool both collapse to zero.
    pub fn oi_current(
        &self,
        fraction: FixedPoint,
        total_oi: FixedPoint,
        total_oi_shares: FixedPoint,
    ) -> Result<FixedPoint, MathError> {
        let shares = self.oi_shares_current(fraction)?;
        if shares.is_zero() || total_oi.is_zero() || total_oi_shares.is_zero() {
            return Ok(FixedPoint::ZERO);
        }
        shares.mul_down(total_oi)?.div_up(total_oi_shares)
    }

    // 4.3: value = collateral + pnl, floored at zero.
    //   long:  oi * min(price / entry, 1 + cap) - debt
    //   short: 2 * oi - (debt + oi * price / entry)
    pub fn value(
        &self,
        fraction: FixedPoint,
        total_oi: FixedPoint,
        total_oi_shares: FixedPoint,
        current_price: FixedPoint,
        cap_payoff: FixedPoint,
    ) -> Result<FixedPoint, MathError> {
        let oi = self.oi_current(fraction, total_oi, total_oi_shares)?;
        let debt = self.debt_current(fraction)?;

        if self.is_long {
            let cap = ONE.add(cap_payoff)?;
            let price_frame = current_price.div_down(self.entry_price)?.min(cap);
            Ok(oi.mul_down(price_frame)?.sub_floor(debt))
        } else {
            let price_frame = current_price.div_up(self.entry_price)?;
            if price_frame >= TWO {
                // loss already covers the whole 2 * oi
                return Ok(FixedPoint::ZERO);
            }
            let liabilities = debt.add(oi.mul_up(price_frame)?)?;
            Ok(oi.add(oi)?.sub_floor(liabilities))
        }
    }

    /// value + debt. Never below the current debt.
    pub fn notional(
        &self,
        fraction: FixedPoint,
        total_oi: FixedPoint,
        total_oi_shares: FixedPoint,
        current_price: FixedPoint,
        cap_payoff: FixedPoint,
    ) -> Result<FixedPoint, MathError> {
        let value = self.value(fraction, total_oi, total_oi_shares, current_price, cap_payoff)?;
        value.add(self.debt_current(fraction)?)
    }

    pub fn trading_fee(
        &self,
        fraction: FixedPoint,
        total_oi: FixedPoint,
        total_oi_shares: FixedPoint,
        current_price: FixedPoint,
        cap_payoff: FixedPoint,
        trading_fee_rate: FixedPoint,
    ) -> Result<FixedPoint, MathError> {
        self.notional(fraction, total_oi, total_oi_shares, current_price, cap_payoff)?
            .mul_up(trading_fee_rate)
    }

    // 4.4: full pipeline at once for callers that need every figure
    pub fn valuation(
        &self,
        fraction: FixedPoint,
        total_oi: FixedPoint,
        total_oi_shares: FixedPoint,
        current_price: FixedPoint,
        params: &RiskParams,
    ) -> Result<PositionValuation, MathError> {
        let oi_current = self.oi_current(fraction, total_oi, total_oi_shares)?;
        let debt_current = self.debt_current(fraction)?;
        let value = self.value(fraction, total_oi, total_oi_shares, current_price, params.cap_payoff)?;
        let notional = value.add(debt_current)?;
        let trading_fee = notional.mul_up(params.trading_fee_rate)?;
        let liquidatable = self.is_liquidatable(
            total_oi,
            total_oi_shares,
            current_price,
            params.cap_payoff,
            params.maintenance_margin_fraction,
        )?;

        Ok(PositionValuation {
            oi_current,
            debt_current,
            value,
            notional,
            trading_fee,
            liquidatable,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValuation {
    pub oi_current: FixedPoint,
    pub debt_current: FixedPoint,
    pub value: FixedPoint,
    pub notional: FixedPoint,
    pub trading_fee: FixedPoint,
    pub liquidatable: bool,
}
