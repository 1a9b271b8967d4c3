//! Venue collaborators. Implemented by whatever reaches the actual pools;
//! the feeds only validate and combine what these return.

use crate::fixed_point::FixedPoint;
use crate::types::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    /// token1 per token0, spot form (B1 / w1) / (B0 / w0)
    PairPrice,
    /// B0^w0 * B1^w1
    Invariant,
}

/// TWAP of `variable` over `window` seconds, ending `ago` seconds back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TwapQuery {
    pub variable: Variable,
    pub window: u64,
    pub ago: u64,
}

impl TwapQuery {
    pub fn pair_price(window: u64, ago: u64) -> Self {
        Self {
            variable: Variable::PairPrice,
            window,
            ago,
        }
    }

    pub fn invariant(window: u64, ago: u64) -> Self {
        Self {
            variable: Variable::Invariant,
            window,
            ago,
        }
    }
}

pub trait WeightedPoolVenue {
    fn pool_tokens(&self, pool: Address) -> [Address; 2];
    fn normalized_weights(&self, pool: Address) -> Vec<FixedPoint>;
    /// One result per query, in query order.
    fn time_weighted_averages(&self, pool: Address, queries: &[TwapQuery]) -> Vec<FixedPoint>;
}

pub trait ConstantProductVenue {
    fn pool_tokens(&self, pool: Address) -> [Address; 2];
    fn observation_cardinality(&self, pool: Address) -> u16;
    /// Geometric mean tick per (window, ago), in order.
    fn arithmetic_mean_ticks(&self, pool: Address, windows: &[(u64, u64)]) -> Vec<i32>;
    fn harmonic_mean_liquidity(&self, pool: Address, window: u64, ago: u64) -> u128;
}

impl<T: WeightedPoolVenue + ?Sized> WeightedPoolVenue for &T {
    fn pool_tokens(&self, pool: Address) -> [Address; 2] {
        (**self).pool_tokens(pool)
    }

    fn normalized_weights(&self, pool: Address) -> Vec<FixedPoint> {
        (**self).normalized_weights(pool)
    }

    fn time_weighted_averages(&self, pool: Address, queries: &[TwapQuery]) -> Vec<FixedPoint> {
        (**self).time_weighted_averages(pool, queries)
    }
}

impl<T: ConstantProductVenue + ?Sized> ConstantProductVenue for &T {
    fn pool_tokens(&self, pool: Address) -> [Address; 2] {
        (**self).pool_tokens(pool)
    }

    fn observation_cardinality(&self, pool: Address) -> u16 {
        (**self).observation_cardinality(pool)
    }

    fn arithmetic_mean_ticks(&self, pool: Address, windows: &[(u64, u64)]) -> Vec<i32> {
        (**self).arithmetic_mean_ticks(pool, windows)
    }

    fn harmonic_mean_liquidity(&self, pool: Address, window: u64, ago: u64) -> u128 {
        (**self).harmonic_mean_liquidity(pool, window, ago)
    }
}
