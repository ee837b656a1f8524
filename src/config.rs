// 7.0 config.rs: all settings in one place. fees, leverage, funding, assets, feeds, orders.
// 7.1 fees are basis points of the amount they apply to. 100 bps = 1%.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::types::{AssetId, TokenAmount, Usd, BASIS_POINTS_DIVISOR, PRICE_PRECISION};

pub const MAX_FEE_BASIS_POINTS: u32 = 500; // 5%
pub const MAX_LIQUIDATION_FEE_UNITS: u64 = 100; // 100 USD
pub const MIN_LEVERAGE_BPS: u32 = 10_000; // 1x
pub const MIN_FUNDING_RATE_INTERVAL_SECS: u64 = 3600;
pub const MAX_FUNDING_RATE_FACTOR: u32 = 10_000; // 1%

/** 7.2: vault-wide settings. changed only through governance setters */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    // Asset id of the pool share token
    pub share_asset: AssetId,
    // Position open/close fee in bps of size delta
    pub margin_fee_bps: u32,
    pub swap_fee_bps: u32,
    pub stable_swap_fee_bps: u32,
    // Fee on share token mint and redeem
    pub mint_burn_fee_bps: u32,
    // Max leverage in bps, 500_000 = 50x
    pub max_leverage_bps: u32,
    // Flat fee paid to the liquidator
    pub liquidation_fee_usd: Usd,
    pub funding_interval_secs: u64,
    // Funding rate per interval at full utilization, precision 1_000_000
    pub funding_rate_factor: u32,
    pub stable_funding_rate_factor: u32,
    // Window after an increase during which tiny profits are reported as zero. 0 = always
    pub min_profit_time_secs: u64,
    pub is_swap_enabled: bool,
    pub is_leverage_enabled: bool,
    // Longs normally post the index asset itself as collateral
    pub allow_cross_collateral_longs: bool,
    pub in_private_liquidation_mode: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            share_asset: AssetId(0),
            margin_fee_bps: 10,      // 0.1%
            swap_fee_bps: 30,        // 0.3%
            stable_swap_fee_bps: 4,  // 0.04%
            mint_burn_fee_bps: 30,   // 0.3%
            max_leverage_bps: 500_000,
            liquidation_fee_usd: Usd::from_units(5),
            funding_interval_secs: 8 * 3600,
            funding_rate_factor: 600,
            stable_funding_rate_factor: 600,
            min_profit_time_secs: 0,
            is_swap_enabled: true,
            is_leverage_enabled: true,
            allow_cross_collateral_longs: false,
            in_private_liquidation_mode: false,
        }
    }
}

impl VaultConfig {
    pub fn testnet() -> Self {
        Self {
            swap_fee_bps: 10,
            mint_burn_fee_bps: 10,
            ..Self::default()
        }
    }

    // lower leverage, registered liquidators only, min profit window of 3h
    pub fn mainnet_conservative() -> Self {
        Self {
            max_leverage_bps: 300_000, // 30x
            min_profit_time_secs: 3 * 3600,
            in_private_liquidation_mode: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fees = [
            self.margin_fee_bps,
            self.swap_fee_bps,
            self.stable_swap_fee_bps,
            self.mint_burn_fee_bps,
        ];
        if fees.iter().any(|bps| *bps > MAX_FEE_BASIS_POINTS) {
            return Err(ConfigError::InvalidFees {
                reason: format!("fees above {} bps", MAX_FEE_BASIS_POINTS),
            });
        }

        if self.liquidation_fee_usd > Usd::from_units(MAX_LIQUIDATION_FEE_UNITS) {
            return Err(ConfigError::InvalidFees {
                reason: "liquidation fee above 100 USD".to_string(),
            });
        }

        if self.max_leverage_bps <= MIN_LEVERAGE_BPS {
            return Err(ConfigError::InvalidLeverage {
                reason: "max leverage must exceed 1x".to_string(),
            });
        }

        if self.funding_interval_secs < MIN_FUNDING_RATE_INTERVAL_SECS {
            return Err(ConfigError::InvalidFunding {
                reason: "funding interval shorter than 1h".to_string(),
            });
        }

        if self.funding_rate_factor > MAX_FUNDING_RATE_FACTOR
            || self.stable_funding_rate_factor > MAX_FUNDING_RATE_FACTOR
        {
            return Err(ConfigError::InvalidFunding {
                reason: "funding rate factor too high".to_string(),
            });
        }

        Ok(())
    }
}

/** 7.3: per-asset settings. an asset is whitelisted iff it has one of these */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub decimals: u32,
    pub is_stable: bool,
    pub is_shortable: bool,
    // Profits below this many bps of size are ignored inside the min profit window
    pub min_profit_bps: u32,
    // Max share of the unreserved pool one redemption may take
    pub redemption_bps: u32,
}

impl AssetConfig {
    pub fn volatile(decimals: u32) -> Self {
        Self {
            decimals,
            is_stable: false,
            is_shortable: true,
            min_profit_bps: 75,
            redemption_bps: BASIS_POINTS_DIVISOR,
        }
    }

    pub fn stable(decimals: u32) -> Self {
        Self {
            decimals,
            is_stable: true,
            is_shortable: false,
            min_profit_bps: 0,
            redemption_bps: BASIS_POINTS_DIVISOR,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decimals > 30 {
            return Err(ConfigError::InvalidAsset {
                reason: "more than 30 decimals".to_string(),
            });
        }
        if self.is_stable && self.is_shortable {
            return Err(ConfigError::InvalidAsset {
                reason: "stable assets cannot be shorted".to_string(),
            });
        }
        if self.min_profit_bps > BASIS_POINTS_DIVISOR || self.redemption_bps > BASIS_POINTS_DIVISOR {
            return Err(ConfigError::InvalidAsset {
                reason: "bps above 10000".to_string(),
            });
        }
        Ok(())
    }
}

// Reference price feed settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeedConfig {
    // Rounds sampled for the max/min answer
    pub sample_space: usize,
    // Submissions needed before a round counts
    pub min_sources: usize,
    pub max_price_age_secs: u64,
    // Spread applied to assets registered without their own
    pub spread_bps: u32,
    // Band around 1 USD inside which strict stable assets report exactly 1 USD
    pub max_strict_price_deviation: U256,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            sample_space: 3,
            min_sources: 1,
            max_price_age_secs: 3600,
            spread_bps: 0,
            max_strict_price_deviation: U256::from(PRICE_PRECISION / 100), // 0.01 USD
        }
    }
}

impl PriceFeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_space == 0 {
            return Err(ConfigError::InvalidPriceFeed {
                reason: "sample space must be at least 1".to_string(),
            });
        }
        if self.min_sources == 0 {
            return Err(ConfigError::InvalidPriceFeed {
                reason: "need at least 1 price source".to_string(),
            });
        }
        if self.spread_bps >= BASIS_POINTS_DIVISOR {
            return Err(ConfigError::InvalidPriceFeed {
                reason: "spread must be below 100%".to_string(),
            });
        }
        Ok(())
    }
}

// Trigger order book settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookConfig {
    // Paid in the native asset
    pub min_execution_fee: TokenAmount,
    pub min_purchase_token_amount_usd: Usd,
    // Asset that can be sent as value alongside a call
    pub native_asset: AssetId,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            min_execution_fee: U256::from(500_000u64),
            min_purchase_token_amount_usd: Usd::from_units(5),
            native_asset: AssetId(1),
        }
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid fees: {reason}")]
    InvalidFees { reason: String },
    #[error("invalid leverage: {reason}")]
    InvalidLeverage { reason: String },
    #[error("invalid funding: {reason}")]
    InvalidFunding { reason: String },
    #[error("invalid asset: {reason}")]
    InvalidAsset { reason: String },
    #[error("invalid price feed: {reason}")]
    InvalidPriceFeed { reason: String },
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
    pub fn config(&self) -> VaultConfig {
        match self {
            Environment::Development => VaultConfig::default(),
            Environment::Testnet => VaultConfig::testnet(),
            Environment::Mainnet => VaultConfig::mainnet_conservative(),
        }
    }
}
