//! Trigger order records and their per-account store.
//!
//! Orders sit here until a keeper sees the trigger condition met. Both kinds
//! are keyed by (account, index) with one index counter per account per kind,
//! so indexes are never reused even after an order is executed or cancelled.

use crate::types::{AccountId, AssetId, Price, Side, TokenAmount, Usd};
use crate::vault::VaultError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Conversion applied to the purchase asset before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapPath {
    /// Keep the input asset as is.
    Direct(AssetId),
    /// Swap through the vault once.
    OneHop { from: AssetId, to: AssetId },
}

impl SwapPath {
    pub fn input(&self) -> AssetId {
        match self {
            SwapPath::Direct(asset) => *asset,
            SwapPath::OneHop { from, .. } => *from,
        }
    }

    pub fn output(&self) -> AssetId {
        match self {
            SwapPath::Direct(asset) => *asset,
            SwapPath::OneHop { to, .. } => *to,
        }
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        match self {
            SwapPath::OneHop { from, to } if from == to => Err(OrderError::InvalidPath),
            _ => Ok(()),
        }
    }
}

/// Everything a caller supplies to place an increase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncreaseOrderRequest {
    pub path: SwapPath,
    pub amount_in: TokenAmount,
    pub index_asset: AssetId,
    // guard for the swap on a one hop path
    pub min_out: TokenAmount,
    pub size_delta: Usd,
    pub collateral_asset: AssetId,
    pub side: Side,
    pub trigger_price: Price,
    pub trigger_above_threshold: bool,
    pub execution_fee: TokenAmount,
    /// Pay the input in the native asset as part of the sent value.
    pub should_wrap: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecreaseOrderRequest {
    pub index_asset: AssetId,
    pub size_delta: Usd,
    pub collateral_asset: AssetId,
    pub collateral_delta: Usd,
    pub side: Side,
    pub trigger_price: Price,
    pub trigger_above_threshold: bool,
    pub execution_fee: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncreaseOrder {
    pub account: AccountId,
    pub index: u64,
    pub purchase_asset: AssetId,
    pub purchase_amount: TokenAmount,
    pub collateral_asset: AssetId,
    pub index_asset: AssetId,
    pub size_delta: Usd,
    pub side: Side,
    pub trigger_price: Price,
    pub trigger_above_threshold: bool,
    pub execution_fee: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecreaseOrder {
    pub account: AccountId,
    pub index: u64,
    pub collateral_asset: AssetId,
    pub collateral_delta: Usd,
    pub index_asset: AssetId,
    pub size_delta: Usd,
    pub side: Side,
    pub trigger_price: Price,
    pub trigger_above_threshold: bool,
    pub execution_fee: TokenAmount,
}

/// Above: fires at or over the trigger. Below: at or under it.
pub fn is_price_valid(trigger_above_threshold: bool, trigger_price: Price, current: Price) -> bool {
    if trigger_above_threshold {
        current >= trigger_price
    } else {
        current <= trigger_price
    }
}

pub(crate) trait Keyed {
    fn account(&self) -> AccountId;
    fn index(&self) -> u64;
}

impl Keyed for IncreaseOrder {
    fn account(&self) -> AccountId {
        self.account
    }
    fn index(&self) -> u64 {
        self.index
    }
}

impl Keyed for DecreaseOrder {
    fn account(&self) -> AccountId {
        self.account
    }
    fn index(&self) -> u64 {
        self.index
    }
}

/// Orders of one kind.
#[derive(Debug, Clone)]
pub(crate) struct OrderStore<T> {
    orders: HashMap<(AccountId, u64), T>,
    next_index: HashMap<AccountId, u64>,
}

impl<T: Keyed> OrderStore<T> {
    pub(crate) fn new() -> Self {
        Self { orders: HashMap::new(), next_index: HashMap::new() }
    }

    /// Index the next order of `account` will get.
    pub(crate) fn next_index(&self, account: AccountId) -> u64 {
        self.next_index.get(&account).copied().unwrap_or(0)
    }

    pub(crate) fn insert(&mut self, order: T) {
        let account = order.account();
        let index = order.index();
        self.next_index.insert(account, index + 1);
        self.orders.insert((account, index), order);
    }

    pub(crate) fn get(&self, account: AccountId, index: u64) -> Option<&T> {
        self.orders.get(&(account, index))
    }

    pub(crate) fn get_mut(&mut self, account: AccountId, index: u64) -> Option<&mut T> {
        self.orders.get_mut(&(account, index))
    }

    pub(crate) fn remove(&mut self, account: AccountId, index: u64) -> Option<T> {
        self.orders.remove(&(account, index))
    }

    pub(crate) fn by_account(&self, account: AccountId) -> Vec<&T> {
        let mut orders: Vec<&T> = self.orders.values().filter(|o| o.account() == account).collect();
        orders.sort_by_key(|o| o.index());
        orders
    }

    pub(crate) fn len(&self) -> usize {
        self.orders.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("execution fee {fee} below minimum {min}")]
    InsufficientExecutionFee { fee: TokenAmount, min: TokenAmount },

    #[error("sent value {value} must equal the execution fee {fee}")]
    IncorrectExecutionFeeTransferred { value: TokenAmount, fee: TokenAmount },

    #[error("sent value {value} must equal {expected}")]
    IncorrectValueTransferred { value: TokenAmount, expected: TokenAmount },

    #[error("purchase worth {value} is below minimum {min}")]
    InsufficientCollateral { value: Usd, min: Usd },

    #[error("invalid swap path")]
    InvalidPath,

    #[error("no order {index} for {account}")]
    NonExistentOrder { account: AccountId, index: u64 },

    #[error("price {current} does not satisfy trigger {trigger}")]
    InvalidPriceForExecution { current: Price, trigger: Price },

    #[error("swap returned {amount_out}, below minimum {min_out}")]
    InsufficientAmountOut { amount_out: TokenAmount, min_out: TokenAmount },

    #[error("order book is not an approved plugin for {0}")]
    PluginNotApproved(AccountId),

    #[error("forbidden")]
    Forbidden,

    #[error("already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Vault(#[from] VaultError),
}
