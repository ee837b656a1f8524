// 8.0: the vault. one shared pool per asset backs leveraged positions, swaps and
// share token mint/redeem. every public operation is all-or-nothing.

mod config;
mod core;
mod funding;
mod ledger;
mod liquidations;
mod positions;
mod pricing;
mod results;
mod swaps;

pub use config::EngineConfig;
pub use core::Vault;
pub use results::{DecreaseResult, LiquidationResult, SwapResult, VaultError};
