// 7.0 config.rs: construction-time settings. windows, venue wiring, risk.
// everything here is validated once and immutable afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fixed_point::MathError;
use crate::log_exp::MAX_NATURAL_EXPONENT;
use crate::risk::RiskConfig;
use crate::types::Address;

/// Longest macro window a feed may sample, one day.
pub const MAX_MACRO_WINDOW: u64 = 86_400;

// Configuration validation errors. all fatal, none retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid windows: micro {micro_window}s, macro {macro_window}s")]
    InvalidWindows { micro_window: u64, macro_window: u64 },

    #[error("token mismatch: {reason}")]
    TokenMismatch { reason: String },

    #[error("insufficient observation cardinality: required {required}, available {available}")]
    InsufficientCardinality { required: u64, available: u64 },

    #[error("average block time must be positive")]
    InvalidBlockTime,

    #[error("invalid risk parameter: {reason}")]
    InvalidRisk { reason: String },

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

// TWAP windows in seconds. 0 < micro <= macro <= 1 day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub micro_window: u64,
    pub macro_window: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            micro_window: 600,  // 10 minutes
            macro_window: 3600, // 1 hour
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.micro_window == 0
            || self.micro_window > self.macro_window
            || self.macro_window > MAX_MACRO_WINDOW
        {
            return Err(ConfigError::InvalidWindows {
                micro_window: self.micro_window,
                macro_window: self.macro_window,
            });
        }
        Ok(())
    }
}

/** 7.1: the assets a feed ties together. the market pair, the bridge asset
both venues share, and the settlement asset reserves are quoted in */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAssets {
    // Pool quoting the market pair. must contain the bridge asset
    pub market_pool: Address,
    // Pool pairing the settlement asset with the bridge asset
    pub settlement_bridge_pool: Address,
    pub market_base_token: Address,
    pub market_quote_token: Address,
    // Common intermediate asset (e.g. WETH)
    pub bridge_token: Address,
    // Protocol settlement asset (e.g. OVL)
    pub settlement_token: Address,
}

// Weighted-invariant venue feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedFeedConfig {
    pub windows: WindowConfig,
    pub assets: FeedAssets,
}

impl WeightedFeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.windows.validate()
    }
}

// Constant-product (tick) venue feed. observation history must reach back
// over the macro window at the assumed block time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantProductFeedConfig {
    pub windows: WindowConfig,
    pub assets: FeedAssets,
    // Minimum observation slots the pools must keep
    pub min_cardinality: u16,
    // Assumed seconds between blocks
    pub average_block_time: u64,
}

impl ConstantProductFeedConfig {
    pub fn required_cardinality(&self) -> Result<u64, ConfigError> {
        if self.average_block_time == 0 {
            return Err(ConfigError::InvalidBlockTime);
        }
        Ok(self.windows.macro_window / self.average_block_time)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.windows.validate()?;
        let required = self.required_cardinality()?;
        if u64::from(self.min_cardinality) < required {
            return Err(ConfigError::InsufficientCardinality {
                required,
                available: u64::from(self.min_cardinality),
            });
        }
        Ok(())
    }
}

// The complete core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub windows: WindowConfig,
    pub risk: RiskConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            windows: WindowConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl CoreConfig {
    // Short windows and a loose drift limit for test deployments
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.windows.micro_window = 60;
        config.windows.macro_window = 600;
        config.risk.price_drift_upper_limit = rust_decimal_macros::dec!(0.001);
        config
    }

    // Longer windows and a higher maintenance margin
    pub fn mainnet_conservative() -> Self {
        let mut config = Self::default();
        config.windows.micro_window = 600;
        config.windows.macro_window = 2 * 3600;
        config.risk.maintenance_margin_fraction = rust_decimal_macros::dec!(0.05);
        config.risk.cap_payoff = rust_decimal_macros::dec!(2);
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.windows.validate()?;
        self.risk.validate()?;

        // the drift check takes exp(drift * macro window)
        let max_exponent = Decimal::from_i128_with_scale(MAX_NATURAL_EXPONENT, 18);
        let exponent = self
            .risk
            .price_drift_upper_limit
            .checked_mul(Decimal::from(self.windows.macro_window))
            .unwrap_or(Decimal::MAX);
        if exponent > max_exponent {
            return Err(ConfigError::InvalidRisk {
                reason: format!(
                    "price drift upper limit over a {}s macro window gives exponent {}, max {}",
                    self.windows.macro_window, exponent, max_exponent
                ),
            });
        }
        Ok(())
    }
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> CoreConfig {
        match self {
            Environment::Development => CoreConfig::default(),
            Environment::Testnet => CoreConfig::testnet(),
            Environment::Mainnet => CoreConfig::mainnet_conservative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn assets() -> FeedAssets {
        FeedAssets {
            market_pool: Address::from_low_u64(1),
            settlement_bridge_pool: Address::from_low_u64(2),
            market_base_token: Address::from_low_u64(10),
            market_quote_token: Address::from_low_u64(11),
            bridge_token: Address::from_low_u64(10),
            settlement_token: Address::from_low_u64(12),
        }
    }

    #[test]
    fn test_default_windows_valid() {
        assert!(WindowConfig::default().validate().is_ok());
    }

    #[test]
    fn test_window_ordering() {
        let windows = WindowConfig {
            micro_window: 3600,
            macro_window: 600,
        };
        assert_eq!(
            windows.validate(),
            Err(ConfigError::InvalidWindows {
                micro_window: 3600,
                macro_window: 600
            })
        );
    }

    #[test]
    fn test_window_bounds() {
        let zero_micro = WindowConfig {
            micro_window: 0,
            macro_window: 600,
        };
        assert!(zero_micro.validate().is_err());

        let too_long = WindowConfig {
            micro_window: 600,
            macro_window: MAX_MACRO_WINDOW + 1,
        };
        assert!(too_long.validate().is_err());

        let equal = WindowConfig {
            micro_window: MAX_MACRO_WINDOW,
            macro_window: MAX_MACRO_WINDOW,
        };
        assert!(equal.validate().is_ok());
    }

    #[test]
    fn test_cardinality_covers_macro_window() {
        let config = ConstantProductFeedConfig {
            windows: WindowConfig::default(),
            assets: assets(),
            min_cardinality: 10,
            average_block_time: 14,
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InsufficientCardinality {
                required: 257,
                available: 10
            })
        );

        let config = ConstantProductFeedConfig {
            min_cardinality: 300,
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_block_time_rejected() {
        let config = ConstantProductFeedConfig {
            windows: WindowConfig::default(),
            assets: assets(),
            min_cardinality: 300,
            average_block_time: 0,
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBlockTime));
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.config().validate().is_ok());
        assert!(Environment::Testnet.config().validate().is_ok());
        assert!(Environment::Mainnet.config().validate().is_ok());
    }

    #[test]
    fn test_drift_exponent_bounded_by_macro_window() {
        let mut config = CoreConfig::default();
        config.windows.macro_window = MAX_MACRO_WINDOW;

        // 0.0015 * 86400 = 129.6
        config.risk.price_drift_upper_limit = dec!(0.0015);
        assert!(config.validate().is_ok());

        // 0.002 * 86400 = 172.8
        config.risk.price_drift_upper_limit = dec!(0.002);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRisk { .. })
        ));

        // the same limit is fine over a shorter window
        config.windows.macro_window = 3600;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = CoreConfig::mainnet_conservative();
        let json = serde_json::to_string(&config).unwrap();
        let back: CoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_feed_config_serialization() {
        let config = WeightedFeedConfig {
            windows: WindowConfig::default(),
            assets: assets(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: WeightedFeedConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
