// 8.0.2: result types and errors for vault operations.

use crate::config::ConfigError;
use crate::custody::TokenError;
use crate::liquidation::LiquidationState;
use crate::math::MathError;
use crate::price_feed::OracleError;
use crate::types::{AccountId, AssetId, Price, SignedUsd, TokenAmount, Usd};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecreaseResult {
    /// Tokens sent to the receiver after fees.
    pub amount_out: TokenAmount,
    pub usd_out: Usd,
    pub fee_usd: Usd,
    pub realised_pnl: SignedUsd,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationResult {
    pub account: AccountId,
    pub state: LiquidationState,
    pub mark_price: Price,
    pub margin_fees: Usd,
    // tokens paid to the fee receiver
    pub liquidation_fee_tokens: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    pub amount_in: TokenAmount,
    pub amount_out: TokenAmount,
    pub fee_amount: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("{caller} may not act for {account}")]
    InvalidSender { caller: AccountId, account: AccountId },

    #[error("long collateral {collateral} must match index {index}")]
    MismatchedTokens { collateral: AssetId, index: AssetId },

    #[error("short collateral {0} must be a stable asset")]
    CollateralAssetNotStable(AssetId),

    #[error("long collateral {0} must not be a stable asset")]
    CollateralAssetMustNotBeStable(AssetId),

    #[error("short index {0} must not be a stable asset")]
    IndexAssetMustNotBeStable(AssetId),

    #[error("{0} is not shortable")]
    IndexAssetNotShortable(AssetId),

    #[error("collateral {0} is not whitelisted")]
    CollateralAssetNotWhitelisted(AssetId),

    #[error("{0} is not whitelisted")]
    AssetNotWhitelisted(AssetId),

    #[error("position is empty")]
    EmptyPosition,

    #[error("size delta {requested} exceeds position size {size}")]
    PositionSizeExceeded { size: Usd, requested: Usd },

    #[error("collateral delta {requested} exceeds position collateral {collateral}")]
    PositionCollateralExceeded { collateral: Usd, requested: Usd },

    #[error("collateral {collateral} does not cover fee {fee}")]
    InsufficientCollateral { collateral: Usd, fee: Usd },

    #[error("position size {size} is below collateral {collateral}")]
    InvalidPositionSize { size: Usd, collateral: Usd },

    #[error("insufficient pool liquidity for {asset}: pool {pool}, reserved {reserved}")]
    InsufficientPoolLiquidity { asset: AssetId, pool: TokenAmount, reserved: TokenAmount },

    #[error("pool of {asset} holds {pool}, cannot remove {requested}")]
    PoolAmountExceeded { asset: AssetId, pool: TokenAmount, requested: TokenAmount },

    #[error("reserve of {asset} is {reserved}, cannot release {requested}")]
    InsufficientReserve { asset: AssetId, reserved: TokenAmount, requested: TokenAmount },

    #[error("losses exceed collateral")]
    LossesExceedCollateral,

    #[error("fees exceed collateral")]
    FeesExceedCollateral,

    #[error("liquidation fees exceed collateral")]
    LiquidationFeesExceedCollateral,

    #[error("max leverage exceeded")]
    MaxLeverageExceeded,

    #[error("position cannot be liquidated")]
    PositionCannotBeLiquidated,

    #[error("{0} is not a registered liquidator")]
    InvalidLiquidator(AccountId),

    #[error("swap path must use two different assets")]
    InvalidPath,

    #[error("amount in must be positive")]
    InvalidAmountIn,

    #[error("swaps are disabled")]
    SwapsDisabled,

    #[error("leverage is disabled")]
    LeverageDisabled,

    #[error("redemption of {requested} exceeds cap {cap}")]
    RedemptionCapExceeded { requested: TokenAmount, cap: TokenAmount },

    #[error("forbidden")]
    Forbidden,

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("not initialized")]
    NotInitialized,

    #[error("config error: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}
