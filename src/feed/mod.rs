// 6.0 feed/: turns venue TWAPs into an OracleSnapshot.
//
// Both feeds sample the market pool over three windows, (micro, 0),
// (macro, 0) and (macro, macro), then price the bridge asset reserve in the
// settlement asset through a second pool. Venues are reached only through
// the traits in venue.rs.
//
//   weighted.rs          - weighted-invariant pools (invariant TWAP)
//   constant_product.rs  - tick/liquidity pools (geometric mean ticks)
//   mock.rs              - in-memory venues for tests and the simulator

mod constant_product;
pub mod mock;
mod venue;
mod weighted;

pub use constant_product::{tick_to_price, ConstantProductFeed};
pub use venue::{ConstantProductVenue, TwapQuery, Variable, WeightedPoolVenue};
pub use weighted::{weighted_pool_reserve, WeightedPoolFeed};

use crate::config::{ConfigError, FeedAssets};
use crate::fixed_point::{FixedPoint, MathError, ONE};
use crate::oracle::OracleSnapshot;
use crate::types::{Address, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("math error: {0}")]
    Math(#[from] MathError),

    // malformed collaborator output
    #[error("bad venue response: {reason}")]
    VenueResponse { reason: String },
}

/// A source of oracle snapshots.
pub trait PriceFeed {
    fn micro_window(&self) -> u64;
    fn macro_window(&self) -> u64;
    fn latest(&self, now: Timestamp) -> Result<OracleSnapshot, FeedError>;
}

/// Where each asset sits in the two pools, resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PoolLayout {
    pub market_base_is_token0: bool,
    pub market_bridge_is_token0: bool,
    pub settlement_bridge_is_token0: bool,
}

// 6.1: the market pool holds base/quote (one of them the bridge asset), the
// settlement pool holds bridge/settlement. anything else is a wiring error
pub(crate) fn resolve_layout(
    assets: &FeedAssets,
    market_tokens: [Address; 2],
    settlement_tokens: [Address; 2],
) -> Result<PoolLayout, ConfigError> {
    let reject = |reason: &str| {
        tracing::warn!(market_pool = %assets.market_pool, reason, "feed config rejected");
        Err(ConfigError::TokenMismatch {
            reason: reason.to_string(),
        })
    };

    let [m0, m1] = market_tokens;
    if m0 != assets.bridge_token && m1 != assets.bridge_token {
        return reject("market pool does not contain the bridge token");
    }

    let market_base_is_token0 = if m0 == assets.market_base_token && m1 == assets.market_quote_token {
        true
    } else if m1 == assets.market_base_token && m0 == assets.market_quote_token {
        false
    } else {
        return reject("market base and quote tokens are not the market pool tokens");
    };

    let [s0, s1] = settlement_tokens;
    let settlement_bridge_is_token0 = if s0 == assets.bridge_token && s1 == assets.settlement_token {
        true
    } else if s1 == assets.bridge_token && s0 == assets.settlement_token {
        false
    } else {
        return reject("settlement pool must pair the bridge and settlement tokens");
    };

    Ok(PoolLayout {
        market_base_is_token0,
        market_bridge_is_token0: m0 == assets.bridge_token,
        settlement_bridge_is_token0,
    })
}

/// Venue prices are token1 per token0. Flip when the wanted unit sits in
/// token0.
pub(crate) fn orient(price_token1_per_token0: FixedPoint, token0_is_priced: bool) -> Result<FixedPoint, MathError> {
    if token0_is_priced {
        Ok(price_token1_per_token0)
    } else {
        ONE.div_down(price_token1_per_token0)
    }
}

pub(crate) fn expect_len<T>(values: Vec<T>, len: usize, what: &str) -> Result<Vec<T>, FeedError> {
    if values.len() != len {
        return Err(FeedError::VenueResponse {
            reason: format!("expected {} {}, got {}", len, what, values.len()),
        });
    }
    Ok(values)
}
