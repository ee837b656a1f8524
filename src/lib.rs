// perps-vault: leveraged trading vault core.
// one shared pool per asset backs long and short positions, swaps and share token
// mint/redeem. all math is checked U256 at 10^30 usd precision, no floats anywhere.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AssetId, AccountId, Side, Usd, Price, SignedUsd, Timestamp
//   1.5  math.rs: checked U256 helpers, bps fee split, decimal rescaling
//   2.x  orders/: trigger orders (increase/decrease), keeper execution
//   4.x  position.rs: position record, pnl delta, average price, position fee
//   5.x  funding.rs: utilization based funding accrual
//   6.x  liquidation.rs: liquidation classification
//   7.x  config.rs: vault, asset, price feed and order book settings
//   8.x  vault/: the vault: positions, liquidations, swaps, pricing, funding
//   9.x  price_feed.rs: oracle trait + sampled reference feed
//   9.2  custody.rs: token balances, share token supply (mocked)
//   9.3  pool.rs: per-asset pool ledger
//   9.4  router.rs: plugin approvals
//   11.x events.rs: state transition events for audit

// core accounting modules
pub mod events;
pub mod funding;
pub mod liquidation;
pub mod math;
pub mod pool;
pub mod position;
pub mod types;
pub mod vault;

// order layer
pub mod orders;

// integration modules
pub mod config;
pub mod custody;
pub mod price_feed;
pub mod router;

// re exports for convenience
pub use events::*;
pub use liquidation::{LiquidationCheck, LiquidationReason, LiquidationState};
pub use math::MathError;
pub use pool::{PoolLedger, PoolState};
pub use position::{Position, PositionDelta, PositionKey};
pub use types::*;
pub use vault::*;
pub use orders::{DecreaseOrder, DecreaseOrderRequest, IncreaseOrder, IncreaseOrderRequest, OrderBook, OrderError, SwapPath, validate_position_order_price};
pub use config::{AssetConfig, ConfigError, Environment, OrderBookConfig, PriceFeedConfig, VaultConfig};
pub use custody::{SupplyAdjuster, TokenError, TokenLedger};
pub use price_feed::{OracleError, PriceOracle, PriceRound, PriceSourceId, SampledPriceFeed};
pub use router::{Router, RouterApprovals};
