// perps-risk-core: position valuation and oracle aggregation for a
// pooled-open-interest perpetuals market.
// every rounding direction favours the pool; no I/O, no threads.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, PositionId, Side, Timestamp
//   2.x  fixed_point.rs: 18-decimal fixed point, directional rounding
//   2.6  log_exp.rs: ln/exp at 36 decimals backing pow and exp
//   3.x  risk.rs: cap, margin, fee and drift params, pool open interest
//   3.1  risk.rs: oi cap from snapshot bounds and the circuit breaker
//   4.x  position.rs: position record and valuation pipeline
//   4.1  liquidation.rs: liquidation check and liquidation price
//   5.x  ledger.rs: keyed position store: build, unwind, liquidate
//   6.x  feed/: price feeds over weighted and constant-product venues
//   7.x  config.rs: windows, venue wiring, env presets
//   8.x  oracle.rs: oracle snapshot, mid price, drift validity

// math
pub mod fixed_point;
pub mod log_exp;

// positions
pub mod ledger;
pub mod liquidation;
pub mod position;
pub mod risk;
pub mod types;

// oracle
pub mod config;
pub mod feed;
pub mod oracle;

// re exports for convenience
pub use config::{
    ConfigError, ConstantProductFeedConfig, CoreConfig, Environment, FeedAssets, WeightedFeedConfig,
    WindowConfig,
};
pub use feed::{ConstantProductFeed, FeedError, PriceFeed, WeightedPoolFeed};
pub use fixed_point::{FixedPoint, MathError};
pub use ledger::{LedgerError, PositionKey, PositionLedger, UnwindResult};
pub use oracle::OracleSnapshot;
pub use position::{Position, PositionValuation};
pub use risk::{oi_from_notional, OpenInterest, RiskConfig, RiskParams};
pub use types::*;
