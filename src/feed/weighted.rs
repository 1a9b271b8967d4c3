// 6.2 weighted.rs: feed over weighted-invariant pools.
// the invariant V = B0^w0 * B1^w1 and the pair price pin down both
// balances, so the bridge reserve is solved from the two TWAPs.

use crate::config::WeightedFeedConfig;
use crate::fixed_point::{FixedPoint, MathError, ONE};
use crate::oracle::OracleSnapshot;
use crate::types::Timestamp;

use super::venue::{TwapQuery, WeightedPoolVenue};
use super::{expect_len, orient, resolve_layout, FeedError, PoolLayout, PriceFeed};

/// Balance of token i given the invariant, the price of token i in token j
/// and both weights.
///
/// With p_i = (B_j / w_j) / (B_i / w_i) the other balance is
/// B_j = p_i * B_i * w_j / w_i, so
/// B_i = (V / (p_i * w_j / w_i)^w_j)^(1 / (w_i + w_j)).
/// Every step rounds up.
pub fn weighted_pool_reserve(
    invariant: FixedPoint,
    price_i_in_j: FixedPoint,
    weight_i: FixedPoint,
    weight_j: FixedPoint,
) -> Result<FixedPoint, MathError> {
    let denominator = price_i_in_j.mul_up(weight_j)?.div_up(weight_i)?.pow_up(weight_j)?;
    let power = ONE.div_up(weight_i.add(weight_j)?)?;
    invariant.div_up(denominator)?.pow_up(power)
}

pub struct WeightedPoolFeed<V> {
    venue: V,
    config: WeightedFeedConfig,
    layout: PoolLayout,
}

impl<V: WeightedPoolVenue> WeightedPoolFeed<V> {
    pub fn new(venue: V, config: WeightedFeedConfig) -> Result<Self, FeedError> {
        config.validate()?;

        let assets = config.assets;
        let layout = resolve_layout(
            &assets,
            venue.pool_tokens(assets.market_pool),
            venue.pool_tokens(assets.settlement_bridge_pool),
        )?;

        tracing::debug!(
            market_pool = %assets.market_pool,
            settlement_pool = %assets.settlement_bridge_pool,
            micro_window = config.windows.micro_window,
            macro_window = config.windows.macro_window,
            "weighted pool feed configured"
        );
        Ok(Self { venue, config, layout })
    }

    pub fn config(&self) -> &WeightedFeedConfig {
        &self.config
    }

    fn weights(&self) -> Result<(FixedPoint, FixedPoint), FeedError> {
        let weights = expect_len(
            self.venue.normalized_weights(self.config.assets.market_pool),
            2,
            "weights",
        )?;
        if weights[0].add(weights[1])? != ONE {
            return Err(FeedError::VenueResponse {
                reason: format!("weights {} and {} do not sum to one", weights[0], weights[1]),
            });
        }
        Ok((weights[0], weights[1]))
    }

    /// Settlement asset per bridge asset over the micro window.
    fn settlement_per_bridge(&self) -> Result<FixedPoint, FeedError> {
        let queries = [TwapQuery::pair_price(self.config.windows.micro_window, 0)];
        let prices = expect_len(
            self.venue
                .time_weighted_averages(self.config.assets.settlement_bridge_pool, &queries),
            1,
            "settlement prices",
        )?;
        Ok(orient(prices[0], self.layout.settlement_bridge_is_token0)?)
    }

    fn bridge_reserve(&self, invariant: FixedPoint, pair_price: FixedPoint) -> Result<FixedPoint, FeedError> {
        let (w0, w1) = self.weights()?;
        // pair price is token0 priced in token1
        let reserve = if self.layout.market_bridge_is_token0 {
            weighted_pool_reserve(invariant, pair_price, w0, w1)?
        } else {
            weighted_pool_reserve(invariant, ONE.div_up(pair_price)?, w1, w0)?
        };
        Ok(reserve)
    }
}

impl<V: WeightedPoolVenue> PriceFeed for WeightedPoolFeed<V> {
    fn micro_window(&self) -> u64 {
        self.config.windows.micro_window
    }

    fn macro_window(&self) -> u64 {
        self.config.windows.macro_window
    }

    fn latest(&self, now: Timestamp) -> Result<OracleSnapshot, FeedError> {
        let micro = self.micro_window();
        let macro_ = self.macro_window();

        let queries = [
            TwapQuery::pair_price(micro, 0),
            TwapQuery::pair_price(macro_, 0),
            TwapQuery::pair_price(macro_, macro_),
            TwapQuery::invariant(micro, 0),
        ];
        let twaps = expect_len(
            self.venue
                .time_weighted_averages(self.config.assets.market_pool, &queries),
            queries.len(),
            "market twaps",
        )?;

        let base_is_token0 = self.layout.market_base_is_token0;
        let price_over_micro_window = orient(twaps[0], base_is_token0)?;
        let price_over_macro_window = orient(twaps[1], base_is_token0)?;
        let price_one_macro_window_ago = orient(twaps[2], base_is_token0)?;

        let reserve = self.bridge_reserve(twaps[3], twaps[0])?;
        let reserve_over_micro_window = reserve.mul_up(self.settlement_per_bridge()?)?;

        tracing::debug!(
            %now,
            price_micro = %price_over_micro_window,
            price_macro = %price_over_macro_window,
            price_macro_ago = %price_one_macro_window_ago,
            reserve = %reserve_over_micro_window,
            "weighted pool snapshot"
        );

        Ok(OracleSnapshot {
            timestamp: now,
            micro_window: micro,
            macro_window: macro_,
            price_over_micro_window,
            price_over_macro_window,
            price_one_macro_window_ago,
            reserve_over_micro_window,
            has_reserve: true,
        })
    }
}
