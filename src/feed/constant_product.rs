// 6.3 constant_product.rs: feed over tick based constant-product pools.
// prices come from geometric mean ticks, reserves from harmonic mean
// liquidity: x = L / sqrt(P), y = L * sqrt(P).

use crate::config::{ConfigError, ConstantProductFeedConfig};
use crate::fixed_point::{FixedPoint, MathError, HALF, ONE};
use crate::oracle::OracleSnapshot;
use crate::types::{Address, Timestamp};

use super::venue::ConstantProductVenue;
use super::{expect_len, orient, resolve_layout, FeedError, PoolLayout, PriceFeed};

// 1.0001, the price step of one tick
const TICK_BASE: FixedPoint = FixedPoint::from_raw(primitive_types::U256([1_000_100_000_000_000_000, 0, 0, 0]));

/// 1.0001^tick as token1 per token0, rounded up for positive ticks.
pub fn tick_to_price(tick: i32) -> Result<FixedPoint, MathError> {
    if tick == 0 {
        return Ok(ONE);
    }
    let magnitude = TICK_BASE.pow_up(FixedPoint::from_int(u64::from(tick.unsigned_abs())))?;
    if tick > 0 {
        Ok(magnitude)
    } else {
        ONE.div_down(magnitude)
    }
}

pub struct ConstantProductFeed<V> {
    venue: V,
    config: ConstantProductFeedConfig,
    layout: PoolLayout,
}

impl<V: ConstantProductVenue> ConstantProductFeed<V> {
    pub fn new(venue: V, config: ConstantProductFeedConfig) -> Result<Self, FeedError> {
        config.validate()?;

        let assets = config.assets;
        for pool in [assets.market_pool, assets.settlement_bridge_pool] {
            check_cardinality(&venue, pool, config.min_cardinality)?;
        }

        let layout = resolve_layout(
            &assets,
            venue.pool_tokens(assets.market_pool),
            venue.pool_tokens(assets.settlement_bridge_pool),
        )?;

        tracing::debug!(
            market_pool = %assets.market_pool,
            settlement_pool = %assets.settlement_bridge_pool,
            min_cardinality = config.min_cardinality,
            "constant product feed configured"
        );
        Ok(Self { venue, config, layout })
    }

    pub fn config(&self) -> &ConstantProductFeedConfig {
        &self.config
    }

    fn settlement_per_bridge(&self) -> Result<FixedPoint, FeedError> {
        let windows = [(self.config.windows.micro_window, 0)];
        let ticks = expect_len(
            self.venue
                .arithmetic_mean_ticks(self.config.assets.settlement_bridge_pool, &windows),
            1,
            "settlement ticks",
        )?;
        Ok(orient(tick_to_price(ticks[0])?, self.layout.settlement_bridge_is_token0)?)
    }

    /// Bridge token balance implied by liquidity and the token1/token0 price.
    fn bridge_reserve(&self, price: FixedPoint) -> Result<FixedPoint, FeedError> {
        let liquidity = self.venue.harmonic_mean_liquidity(
            self.config.assets.market_pool,
            self.config.windows.micro_window,
            0,
        );
        let liquidity = FixedPoint::from_raw_u128(liquidity);
        let sqrt_price = price.pow_up(HALF)?;

        let reserve = if self.layout.market_bridge_is_token0 {
            liquidity.div_up(sqrt_price)?
        } else {
            liquidity.mul_up(sqrt_price)?
        };
        Ok(reserve)
    }
}

fn check_cardinality<V: ConstantProductVenue>(venue: &V, pool: Address, required: u16) -> Result<(), ConfigError> {
    let available = venue.observation_cardinality(pool);
    if available < required {
        tracing::warn!(%pool, available, required, "pool observation history too short");
        return Err(ConfigError::InsufficientCardinality {
            required: u64::from(required),
            available: u64::from(available),
        });
    }
    Ok(())
}

impl<V: ConstantProductVenue> PriceFeed for ConstantProductFeed<V> {
    fn micro_window(&self) -> u64 {
        self.config.windows.micro_window
    }

    fn macro_window(&self) -> u64 {
        self.config.windows.macro_window
    }

    fn latest(&self, now: Timestamp) -> Result<OracleSnapshot, FeedError> {
        let micro = self.micro_window();
        let macro_ = self.macro_window();

        let windows = [(micro, 0), (macro_, 0), (macro_, macro_)];
        let ticks = expect_len(
            self.venue
                .arithmetic_mean_ticks(self.config.assets.market_pool, &windows),
            windows.len(),
            "market ticks",
        )?;

        let raw_micro = tick_to_price(ticks[0])?;
        let base_is_token0 = self.layout.market_base_is_token0;
        let price_over_micro_window = orient(raw_micro, base_is_token0)?;
        let price_over_macro_window = orient(tick_to_price(ticks[1])?, base_is_token0)?;
        let price_one_macro_window_ago = orient(tick_to_price(ticks[2])?, base_is_token0)?;

        let reserve = self.bridge_reserve(raw_micro)?;
        let reserve_over_micro_window = reserve.mul_up(self.settlement_per_bridge()?)?;

        tracing::debug!(
            %now,
            tick_micro = ticks[0],
            tick_macro = ticks[1],
            tick_macro_ago = ticks[2],
            reserve = %reserve_over_micro_window,
            "constant product snapshot"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedAssets, WindowConfig};
    use crate::feed::mock::MockConstantProductVenue;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn fp(d: Decimal) -> FixedPoint {
        FixedPoint::from_decimal(d).unwrap()
    }

    fn token(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn near(actual: FixedPoint, expected: Decimal) -> bool {
        let expected = fp(expected);
        actual >= expected.mul_down(fp(dec!(0.999999))).unwrap()
            && actual <= expected.mul_up(fp(dec!(1.000001))).unwrap()
    }

    fn config() -> ConstantProductFeedConfig {
        ConstantProductFeedConfig {
            windows: WindowConfig {
                micro_window: 600,
                macro_window: 3600,
            },
            assets: FeedAssets {
                market_pool: token(1),
                settlement_bridge_pool: token(2),
                market_base_token: token(10),
                market_quote_token: token(11),
                bridge_token: token(10),
                settlement_token: token(12),
            },
            min_cardinality: 300,
            average_block_time: 12,
        }
    }

    fn venue() -> MockConstantProductVenue {
        let mut venue = MockConstantProductVenue::new();
        venue.add_pool(token(1), [token(10), token(11)], 400);
        venue.add_pool(token(2), [token(12), token(10)], 400);
        venue.set_tick(token(1), 600, 0, 76012);
        venue.set_tick(token(1), 3600, 0, 75900);
        venue.set_tick(token(1), 3600, 3600, 75000);
        venue.set_liquidity(token(1), 600, 0, 1_000_000 * 10u128.pow(18));
        // bridge per settlement ~0.5
        venue.set_tick(token(2), 600, 0, -6932);
        venue
    }

    #[test]
    fn tick_prices() {
        assert_eq!(tick_to_price(0).unwrap(), ONE);
        assert!(near(tick_to_price(6932).unwrap(), dec!(2.000036323830947322)));
        assert!(near(tick_to_price(-6932).unwrap(), dec!(0.499990919207187760)));
        assert!(tick_to_price(76012).unwrap() > tick_to_price(75900).unwrap());
    }

    #[test]
    fn latest_builds_snapshot() {
        let feed = ConstantProductFeed::new(venue(), config()).unwrap();
        let data = feed.latest(Timestamp::from_secs(1_000)).unwrap();

        assert!(near(data.price_over_micro_window, dec!(1999.835018391808649836)));
        assert!(near(data.price_over_macro_window, dec!(1977.562936236809025645)));
        assert!(near(data.price_one_macro_window_ago, dec!(1807.364570843460110410)));
        // L / sqrt(P) bridge, at ~2 settlement per bridge
        assert!(near(data.reserve_over_micro_window, dec!(44724.016473631898855133)));
        assert!(data.has_reserve);
    }

    #[test]
    fn bridge_as_token1_uses_liquidity_times_sqrt_price() {
        let mut venue = venue();
        venue.add_pool(token(1), [token(11), token(10)], 400);
        let feed = ConstantProductFeed::new(venue, config()).unwrap();
        let data = feed.latest(Timestamp::from_secs(1_000)).unwrap();
        // base is token1 now, so the quote per base price inverts
        assert!(near(data.price_over_micro_window, dec!(0.000500041248804694)));
        assert!(near(data.reserve_over_micro_window, dec!(89440654.307101201482124499)));
    }

    #[test]
    fn short_pool_history_rejected() {
        let mut venue = venue();
        venue.add_pool(token(2), [token(12), token(10)], 100);
        assert_eq!(
            ConstantProductFeed::new(venue, config()).err(),
            Some(FeedError::Config(ConfigError::InsufficientCardinality {
                required: 300,
                available: 100
            }))
        );
    }

    #[test]
    fn config_cardinality_must_cover_macro_window() {
        let mut config = config();
        config.min_cardinality = 100;
        assert_eq!(
            ConstantProductFeed::new(venue(), config).err(),
            Some(FeedError::Config(ConfigError::InsufficientCardinality {
                required: 300,
                available: 100
            }))
        );
    }

    // answers every query with a single tick
    struct OneTickVenue(MockConstantProductVenue);

    impl ConstantProductVenue for OneTickVenue {
        fn pool_tokens(&self, pool: Address) -> [Address; 2] {
            self.0.pool_tokens(pool)
        }

        fn observation_cardinality(&self, pool: Address) -> u16 {
            self.0.observation_cardinality(pool)
        }

        fn arithmetic_mean_ticks(&self, _pool: Address, _windows: &[(u64, u64)]) -> Vec<i32> {
            vec![0]
        }

        fn harmonic_mean_liquidity(&self, pool: Address, window: u64, ago: u64) -> u128 {
            self.0.harmonic_mean_liquidity(pool, window, ago)
        }
    }

    #[test]
    fn missing_ticks_rejected() {
        let feed = ConstantProductFeed::new(OneTickVenue(venue()), config()).unwrap();
        assert!(matches!(
            feed.latest(Timestamp::from_secs(0)),
            Err(FeedError::VenueResponse { .. })
        ));
    }

    #[test]
    fn feed_accepts_borrowed_venue() {
        let venue = venue();
        let feed = ConstantProductFeed::new(&venue, config()).unwrap();
        assert_eq!(feed.micro_window(), 600);
        assert_eq!(feed.macro_window(), 3600);
        assert!(feed.latest(Timestamp::from_secs(0)).is_ok());
    }
}
