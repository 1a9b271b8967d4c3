//! Liquidation checks.
//!
//! A position is liquidatable once its value drops under the maintenance
//! margin, which is pinned to the open interest at build rather than the
//! funding-adjusted current amount. The liquidation price solves the value
//! formula for that threshold and rounds up so liquidation triggers early
//! rather than late.

use crate::fixed_point::{FixedPoint, MathError, ONE, TWO};
use crate::position::Position;

impl Position {
    /// Maintenance margin required of the full position.
    pub fn maintenance_margin(&self, maintenance_margin_fraction: FixedPoint) -> Result<FixedPoint, MathError> {
        self.oi_initial(ONE)?.mul_up(maintenance_margin_fraction)
    }

    pub fn is_liquidatable(
        &self,
        total_oi: FixedPoint,
        total_oi_shares: FixedPoint,
        current_price: FixedPoint,
        cap_payoff: FixedPoint,
        maintenance_margin_fraction: FixedPoint,
    ) -> Result<bool, MathError> {
        if self.liquidated || self.oi_initial(ONE)?.is_zero() {
            return Ok(false);
        }

        let value = self.value(ONE, total_oi, total_oi_shares, current_price, cap_payoff)?;
        let margin = self.maintenance_margin(maintenance_margin_fraction)?;
        Ok(value < margin)
    }

    /// Price at which value equals maintenance margin.
    ///
    /// Zero is returned in two opposite cases. For a liquidated, empty or
    /// zero-oi position no price can liquidate it. For a short whose margin
    /// plus debt is at least twice its current oi, no price keeps it above
    /// margin, so it is liquidatable at every price. Pair a zero result with
    /// `is_liquidatable` to tell them apart.
    pub fn liquidation_price(
        &self,
        total_oi: FixedPoint,
        total_oi_shares: FixedPoint,
        maintenance_margin_fraction: FixedPoint,
    ) -> Result<FixedPoint, MathError> {
        if self.liquidated || self.oi_initial(ONE)?.is_zero() {
            return Ok(FixedPoint::ZERO);
        }

        let oi_current = self.oi_current(ONE, total_oi, total_oi_shares)?;
        if oi_current.is_zero() {
            return Ok(FixedPoint::ZERO);
        }

        // (mm + debt) / oi, the price frame where value hits the margin
        let margin = self.maintenance_margin(maintenance_margin_fraction)?;
        let oi_frame = margin.add(self.debt_current(ONE)?)?.div_up(oi_current)?;

        if self.is_long {
            self.entry_price.mul_up(oi_frame)
        } else {
            self.entry_price.mul_up(TWO.sub_floor(oi_frame))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn fp(d: Decimal) -> FixedPoint {
        FixedPoint::from_decimal(d).unwrap()
    }

    fn cap() -> FixedPoint {
        fp(dec!(5))
    }

    fn mmf() -> FixedPoint {
        fp(dec!(0.01))
    }

    #[test]
    fn healthy_long_not_liquidatable() {
        let pos = Position::new(Side::Long, fp(dec!(1000)), fp(dec!(400)), ONE);
        let oi = fp(dec!(1000));
        assert!(!pos.is_liquidatable(oi, oi, ONE, cap(), mmf()).unwrap());
    }

    #[test]
    fn underwater_long_liquidatable() {
        let pos = Position::new(Side::Long, fp(dec!(1000)), fp(dec!(400)), ONE);
        let oi = fp(dec!(1000));
        // value = 1000 * 0.405 - 400 = 5 < 10
        assert!(pos.is_liquidatable(oi, oi, fp(dec!(0.405)), cap(), mmf()).unwrap());
        // value = 1000 * 0.42 - 400 = 20 > 10
        assert!(!pos.is_liquidatable(oi, oi, fp(dec!(0.42)), cap(), mmf()).unwrap());
    }

    #[test]
    fn liquidated_position_never_liquidatable() {
        let mut pos = Position::new(Side::Long, fp(dec!(1000)), fp(dec!(400)), ONE);
        pos.liquidated = true;
        let oi = fp(dec!(1000));
        assert!(!pos.is_liquidatable(oi, oi, FixedPoint::ZERO, cap(), mmf()).unwrap());
        assert_eq!(pos.liquidation_price(oi, oi, mmf()).unwrap(), FixedPoint::ZERO);
    }

    #[test]
    fn empty_position_never_liquidatable() {
        let pos = Position::default();
        let oi = fp(dec!(1000));
        assert!(!pos.is_liquidatable(oi, oi, ONE, cap(), mmf()).unwrap());
        assert_eq!(pos.liquidation_price(oi, oi, mmf()).unwrap(), FixedPoint::ZERO);
    }

    #[test]
    fn margin_pinned_to_initial_oi() {
        // funding halved the pool oi; margin still uses the 1000 at build
        let pos = Position::new(Side::Long, fp(dec!(1000)), fp(dec!(400)), ONE);
        assert_eq!(pos.maintenance_margin(mmf()).unwrap(), fp(dec!(10)));
        // value = 500 * 0.82 - 400 = 10, not below 10
        assert!(!pos
            .is_liquidatable(fp(dec!(500)), fp(dec!(1000)), fp(dec!(0.82)), cap(), mmf())
            .unwrap());
        assert!(pos
            .is_liquidatable(fp(dec!(500)), fp(dec!(1000)), fp(dec!(0.81)), cap(), mmf())
            .unwrap());
    }

    #[test]
    fn long_liquidation_price() {
        let pos = Position::new(Side::Long, fp(dec!(1000)), fp(dec!(400)), fp(dec!(2)));
        let oi = fp(dec!(1000));
        // frame = (10 + 400) / 1000 = 0.41, price = 2 * 0.41
        assert_eq!(pos.liquidation_price(oi, oi, mmf()).unwrap(), fp(dec!(0.82)));
    }

    #[test]
    fn short_liquidation_price() {
        let pos = Position::new(Side::Short, fp(dec!(1000)), fp(dec!(400)), fp(dec!(2)));
        let oi = fp(dec!(1000));
        // frame = 0.41, price = 2 * (2 - 0.41)
        assert_eq!(pos.liquidation_price(oi, oi, mmf()).unwrap(), fp(dec!(3.18)));
    }

    #[test]
    fn short_already_underwater_has_zero_liquidation_price() {
        // debt alone exceeds twice the remaining oi
        let pos = Position::new(Side::Short, fp(dec!(1000)), fp(dec!(900)), ONE);
        let liq = pos
            .liquidation_price(fp(dec!(400)), fp(dec!(1000)), mmf())
            .unwrap();
        assert_eq!(liq, FixedPoint::ZERO);

        // zero here means every price liquidates, even a price of zero
        for price in [FixedPoint::ZERO, fp(dec!(0.5)), ONE] {
            assert!(pos
                .is_liquidatable(fp(dec!(400)), fp(dec!(1000)), price, cap(), mmf())
                .unwrap());
        }
    }

    #[test]
    fn unwound_pool_has_zero_liquidation_price() {
        let pos = Position::new(Side::Long, fp(dec!(1000)), fp(dec!(400)), ONE);
        let liq = pos
            .liquidation_price(FixedPoint::ZERO, fp(dec!(1000)), mmf())
            .unwrap();
        assert_eq!(liq, FixedPoint::ZERO);
    }
}
