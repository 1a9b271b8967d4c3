//! In-memory venues. Used by tests and the simulator in place of real pools.
//!
//! Unset TWAPs read as zero, unset ticks as tick 0 and unset liquidity as
//! zero. Unknown pools report zero-address tokens so feed construction
//! fails on them.

use std::collections::HashMap;

use crate::fixed_point::FixedPoint;
use crate::types::Address;

use super::venue::{ConstantProductVenue, TwapQuery, WeightedPoolVenue};

#[derive(Debug, Clone, Default)]
struct WeightedPoolState {
    tokens: [Address; 2],
    weights: Vec<FixedPoint>,
    twaps: HashMap<TwapQuery, FixedPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct MockWeightedVenue {
    pools: HashMap<Address, WeightedPoolState>,
}

impl MockWeightedVenue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pool, or replaces tokens and weights of a known one.
    /// Recorded TWAPs are kept.
    pub fn add_pool(&mut self, pool: Address, tokens: [Address; 2], weights: Vec<FixedPoint>) {
        let state = self.pools.entry(pool).or_default();
        state.tokens = tokens;
        state.weights = weights;
    }

    pub fn set_pair_price(&mut self, pool: Address, window: u64, ago: u64, price: FixedPoint) {
        self.set_twap(pool, TwapQuery::pair_price(window, ago), price);
    }

    pub fn set_invariant(&mut self, pool: Address, window: u64, ago: u64, invariant: FixedPoint) {
        self.set_twap(pool, TwapQuery::invariant(window, ago), invariant);
    }

    fn set_twap(&mut self, pool: Address, query: TwapQuery, value: FixedPoint) {
        self.pools.entry(pool).or_default().twaps.insert(query, value);
    }
}

impl WeightedPoolVenue for MockWeightedVenue {
    fn pool_tokens(&self, pool: Address) -> [Address; 2] {
        self.pools.get(&pool).map(|p| p.tokens).unwrap_or_default()
    }

    fn normalized_weights(&self, pool: Address) -> Vec<FixedPoint> {
        self.pools.get(&pool).map(|p| p.weights.clone()).unwrap_or_default()
    }

    fn time_weighted_averages(&self, pool: Address, queries: &[TwapQuery]) -> Vec<FixedPoint> {
        let state = self.pools.get(&pool);
        queries
            .iter()
            .map(|query| {
                state
                    .and_then(|p| p.twaps.get(query).copied())
                    .unwrap_or(FixedPoint::ZERO)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct ConstantProductPoolState {
    tokens: [Address; 2],
    cardinality: u16,
    ticks: HashMap<(u64, u64), i32>,
    liquidity: HashMap<(u64, u64), u128>,
}

#[derive(Debug, Clone, Default)]
pub struct MockConstantProductVenue {
    pools: HashMap<Address, ConstantProductPoolState>,
}

impl MockConstantProductVenue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pool, or replaces tokens and cardinality of a known one.
    pub fn add_pool(&mut self, pool: Address, tokens: [Address; 2], cardinality: u16) {
        let state = self.pools.entry(pool).or_default();
        state.tokens = tokens;
        state.cardinality = cardinality;
    }

    pub fn set_tick(&mut self, pool: Address, window: u64, ago: u64, tick: i32) {
        self.pools.entry(pool).or_default().ticks.insert((window, ago), tick);
    }

    pub fn set_liquidity(&mut self, pool: Address, window: u64, ago: u64, liquidity: u128) {
        self.pools
            .entry(pool)
            .or_default()
            .liquidity
            .insert((window, ago), liquidity);
    }
}

impl ConstantProductVenue for MockConstantProductVenue {
    fn pool_tokens(&self, pool: Address) -> [Address; 2] {
        self.pools.get(&pool).map(|p| p.tokens).unwrap_or_default()
    }

    fn observation_cardinality(&self, pool: Address) -> u16 {
        self.pools.get(&pool).map(|p| p.cardinality).unwrap_or(0)
    }

    fn arithmetic_mean_ticks(&self, pool: Address, windows: &[(u64, u64)]) -> Vec<i32> {
        let state = self.pools.get(&pool);
        windows
            .iter()
            .map(|key| state.and_then(|p| p.ticks.get(key).copied()).unwrap_or(0))
            .collect()
    }

    fn harmonic_mean_liquidity(&self, pool: Address, window: u64, ago: u64) -> u128 {
        self.pools
            .get(&pool)
            .and_then(|p| p.liquidity.get(&(window, ago)).copied())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_pool_reads_empty() {
        let venue = MockWeightedVenue::new();
        let pool = Address::from_low_u64(1);
        assert_eq!(venue.pool_tokens(pool), [Address::ZERO; 2]);
        assert!(venue.normalized_weights(pool).is_empty());
        assert_eq!(
            venue.time_weighted_averages(pool, &[TwapQuery::pair_price(600, 0)]),
            vec![FixedPoint::ZERO]
        );
    }

    #[test]
    fn re_adding_pool_keeps_history() {
        let mut venue = MockConstantProductVenue::new();
        let pool = Address::from_low_u64(1);
        venue.set_tick(pool, 600, 0, 42);
        venue.add_pool(pool, [Address::from_low_u64(2), Address::from_low_u64(3)], 50);
        assert_eq!(venue.arithmetic_mean_ticks(pool, &[(600, 0), (60, 0)]), vec![42, 0]);
        assert_eq!(venue.observation_cardinality(pool), 50);
    }
}
