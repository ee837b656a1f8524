// 2.0 orders/book.rs: keeper-executed trigger orders on top of the vault.
// the book is a token holder and router plugin of its own. escrow (execution fee in
// the native asset plus the purchase tokens) sits in its balance until execute or cancel.
// vault-side effects of each call run in one vault unit, the order maps and order
// events change only once that unit has committed.

use super::types::{
    is_price_valid, DecreaseOrder, DecreaseOrderRequest, IncreaseOrder, IncreaseOrderRequest, OrderError, OrderStore,
    SwapPath,
};
use crate::config::OrderBookConfig;
use crate::events::{DecreaseOrderEvent, EventPayload, IncreaseOrderEvent};
use crate::price_feed::PriceOracle;
use crate::router::RouterApprovals;
use crate::types::{AccountId, AssetId, Price, TokenAmount, Usd};
use crate::vault::{Vault, VaultError};
use primitive_types::U256;

/// Trigger order book. Operations take the vault they trade against.
#[derive(Debug, Clone)]
pub struct OrderBook {
    gov: AccountId,
    account: AccountId,
    config: OrderBookConfig,
    is_initialized: bool,
    increase_orders: OrderStore<IncreaseOrder>,
    decrease_orders: OrderStore<DecreaseOrder>,
}

impl OrderBook {
    /// `account` is the book's holder id, also the id it is registered under as a plugin.
    pub fn new(gov: AccountId, account: AccountId) -> Self {
        Self {
            gov,
            account,
            config: OrderBookConfig::default(),
            is_initialized: false,
            increase_orders: OrderStore::new(),
            decrease_orders: OrderStore::new(),
        }
    }

    pub fn initialize(&mut self, caller: AccountId, config: OrderBookConfig) -> Result<(), OrderError> {
        self.ensure_gov(caller)?;
        if self.is_initialized {
            return Err(OrderError::AlreadyInitialized);
        }
        self.config = config;
        self.is_initialized = true;
        tracing::info!(book = %self.account, "order book initialized");
        Ok(())
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn gov(&self) -> AccountId {
        self.gov
    }

    pub fn config(&self) -> &OrderBookConfig {
        &self.config
    }

    pub fn transfer_governance(&mut self, caller: AccountId, new_gov: AccountId) -> Result<(), OrderError> {
        self.ensure_gov(caller)?;
        self.gov = new_gov;
        Ok(())
    }

    pub fn set_min_execution_fee(&mut self, caller: AccountId, fee: TokenAmount) -> Result<(), OrderError> {
        self.ensure_gov(caller)?;
        self.config.min_execution_fee = fee;
        Ok(())
    }

    pub fn set_min_purchase_token_amount_usd(&mut self, caller: AccountId, min: Usd) -> Result<(), OrderError> {
        self.ensure_gov(caller)?;
        self.config.min_purchase_token_amount_usd = min;
        Ok(())
    }

    // ---- increase orders ----

    /// Escrow the fee and input, swap a one hop path right away and store the order.
    /// `value` is the native amount sent along with the call.
    pub fn create_increase_order<O: PriceOracle>(
        &mut self,
        vault: &mut Vault<O>,
        caller: AccountId,
        request: IncreaseOrderRequest,
        value: TokenAmount,
    ) -> Result<u64, OrderError> {
        request.path.validate()?;
        self.check_execution_fee(request.execution_fee)?;

        let native = self.config.native_asset;
        let input = request.path.input();
        if request.should_wrap {
            if input != native {
                return Err(OrderError::InvalidPath);
            }
            let expected = request.execution_fee.saturating_add(request.amount_in);
            if value != expected {
                return Err(OrderError::IncorrectValueTransferred { value, expected });
            }
        } else if value != request.execution_fee {
            return Err(OrderError::IncorrectExecutionFeeTransferred { value, fee: request.execution_fee });
        }

        let book = self.account;
        let min_purchase = self.config.min_purchase_token_amount_usd;
        let purchase_amount = vault.atomic(|vault| -> Result<TokenAmount, OrderError> {
            vault.transfer_tokens(caller, native, book, value)?;
            if !request.should_wrap {
                if !vault.router().is_approved_plugin(caller, book) {
                    return Err(OrderError::PluginNotApproved(caller));
                }
                vault.plugin_transfer(book, input, caller, book, request.amount_in)?;
            }

            let purchase_amount = match request.path {
                SwapPath::Direct(_) => request.amount_in,
                SwapPath::OneHop { from, to } => swap_through(vault, book, from, to, request.amount_in, request.min_out)?,
            };

            let value_usd = vault.token_to_usd_min(request.path.output(), purchase_amount)?;
            if value_usd < min_purchase {
                return Err(OrderError::InsufficientCollateral { value: value_usd, min: min_purchase });
            }
            Ok(purchase_amount)
        })?;

        let index = self.increase_orders.next_index(caller);
        let order = IncreaseOrder {
            account: caller,
            index,
            purchase_asset: request.path.output(),
            purchase_amount,
            collateral_asset: request.collateral_asset,
            index_asset: request.index_asset,
            size_delta: request.size_delta,
            side: request.side,
            trigger_price: request.trigger_price,
            trigger_above_threshold: request.trigger_above_threshold,
            execution_fee: request.execution_fee,
        };
        tracing::info!(account = %caller, index, trigger = %order.trigger_price, "increase order created");
        vault.emit_event(EventPayload::CreateIncreaseOrder(IncreaseOrderEvent {
            order: order.clone(),
            execution_price: None,
        }));
        self.increase_orders.insert(order);
        Ok(index)
    }

    pub fn update_increase_order<O: PriceOracle>(
        &mut self,
        vault: &mut Vault<O>,
        caller: AccountId,
        index: u64,
        size_delta: Usd,
        trigger_price: Price,
        trigger_above_threshold: bool,
    ) -> Result<(), OrderError> {
        let order = self
            .increase_orders
            .get_mut(caller, index)
            .ok_or(OrderError::NonExistentOrder { account: caller, index })?;
        order.size_delta = size_delta;
        order.trigger_price = trigger_price;
        order.trigger_above_threshold = trigger_above_threshold;

        let event = IncreaseOrderEvent { order: order.clone(), execution_price: None };
        vault.emit_event(EventPayload::UpdateIncreaseOrder(event));
        Ok(())
    }

    /// Delete the order and hand the escrow back to its owner.
    pub fn cancel_increase_order<O: PriceOracle>(
        &mut self,
        vault: &mut Vault<O>,
        caller: AccountId,
        index: u64,
    ) -> Result<(), OrderError> {
        let order = self
            .increase_orders
            .get(caller, index)
            .cloned()
            .ok_or(OrderError::NonExistentOrder { account: caller, index })?;

        let book = self.account;
        let native = self.config.native_asset;
        vault.atomic(|vault| -> Result<(), OrderError> {
            if order.purchase_asset == native {
                let total = order.purchase_amount.saturating_add(order.execution_fee);
                vault.transfer_tokens(book, native, caller, total)?;
            } else {
                vault.transfer_tokens(book, order.purchase_asset, caller, order.purchase_amount)?;
                vault.transfer_tokens(book, native, caller, order.execution_fee)?;
            }
            Ok(())
        })?;

        self.increase_orders.remove(caller, index);
        tracing::info!(account = %caller, index, "increase order cancelled");
        vault.emit_event(EventPayload::CancelIncreaseOrder(IncreaseOrderEvent { order, execution_price: None }));
        Ok(())
    }

    /// Keeper entry point. Opens or grows the position once the trigger holds and
    /// pays the execution fee to `fee_receiver`.
    pub fn execute_increase_order<O: PriceOracle>(
        &mut self,
        vault: &mut Vault<O>,
        account: AccountId,
        index: u64,
        fee_receiver: AccountId,
    ) -> Result<Price, OrderError> {
        let order = self
            .increase_orders
            .get(account, index)
            .cloned()
            .ok_or(OrderError::NonExistentOrder { account, index })?;

        let book = self.account;
        let native = self.config.native_asset;
        let current = vault.atomic(|vault| -> Result<Price, OrderError> {
            let current = validate_position_order_price(
                vault,
                order.trigger_above_threshold,
                order.trigger_price,
                order.index_asset,
                order.side.is_long(),
                true,
            )?
            .0;

            let vault_account = vault.account();
            let collateral_amount = if order.purchase_asset == order.collateral_asset {
                order.purchase_amount
            } else {
                swap_through(vault, book, order.purchase_asset, order.collateral_asset, order.purchase_amount, U256::zero())?
            };
            vault.transfer_tokens(book, order.collateral_asset, vault_account, collateral_amount)?;
            vault.increase_position(
                book,
                order.account,
                order.collateral_asset,
                order.index_asset,
                order.size_delta,
                order.side,
            )?;
            vault.transfer_tokens(book, native, fee_receiver, order.execution_fee)?;
            Ok(current)
        })?;

        self.increase_orders.remove(account, index);
        tracing::info!(account = %account, index, price = %current, "increase order executed");
        vault.emit_event(EventPayload::ExecuteIncreaseOrder(IncreaseOrderEvent {
            order,
            execution_price: Some(current),
        }));
        Ok(current)
    }

    // ---- decrease orders ----

    pub fn create_decrease_order<O: PriceOracle>(
        &mut self,
        vault: &mut Vault<O>,
        caller: AccountId,
        request: DecreaseOrderRequest,
        value: TokenAmount,
    ) -> Result<u64, OrderError> {
        self.check_execution_fee(request.execution_fee)?;
        if value != request.execution_fee {
            return Err(OrderError::IncorrectExecutionFeeTransferred { value, fee: request.execution_fee });
        }

        let book = self.account;
        let native = self.config.native_asset;
        vault.atomic(|vault| vault.transfer_tokens(caller, native, book, value))?;

        let index = self.decrease_orders.next_index(caller);
        let order = DecreaseOrder {
            account: caller,
            index,
            collateral_asset: request.collateral_asset,
            collateral_delta: request.collateral_delta,
            index_asset: request.index_asset,
            size_delta: request.size_delta,
            side: request.side,
            trigger_price: request.trigger_price,
            trigger_above_threshold: request.trigger_above_threshold,
            execution_fee: request.execution_fee,
        };
        tracing::info!(account = %caller, index, trigger = %order.trigger_price, "decrease order created");
        vault.emit_event(EventPayload::CreateDecreaseOrder(DecreaseOrderEvent {
            order: order.clone(),
            execution_price: None,
        }));
        self.decrease_orders.insert(order);
        Ok(index)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_decrease_order<O: PriceOracle>(
        &mut self,
        vault: &mut Vault<O>,
        caller: AccountId,
        index: u64,
        collateral_delta: Usd,
        size_delta: Usd,
        trigger_price: Price,
        trigger_above_threshold: bool,
    ) -> Result<(), OrderError> {
        let order = self
            .decrease_orders
            .get_mut(caller, index)
            .ok_or(OrderError::NonExistentOrder { account: caller, index })?;
        order.collateral_delta = collateral_delta;
        order.size_delta = size_delta;
        order.trigger_price = trigger_price;
        order.trigger_above_threshold = trigger_above_threshold;

        let event = DecreaseOrderEvent { order: order.clone(), execution_price: None };
        vault.emit_event(EventPayload::UpdateDecreaseOrder(event));
        Ok(())
    }

    pub fn cancel_decrease_order<O: PriceOracle>(
        &mut self,
        vault: &mut Vault<O>,
        caller: AccountId,
        index: u64,
    ) -> Result<(), OrderError> {
        let order = self
            .decrease_orders
            .get(caller, index)
            .cloned()
            .ok_or(OrderError::NonExistentOrder { account: caller, index })?;

        let book = self.account;
        let native = self.config.native_asset;
        vault.atomic(|vault| vault.transfer_tokens(book, native, caller, order.execution_fee))?;

        self.decrease_orders.remove(caller, index);
        tracing::info!(account = %caller, index, "decrease order cancelled");
        vault.emit_event(EventPayload::CancelDecreaseOrder(DecreaseOrderEvent { order, execution_price: None }));
        Ok(())
    }

    /// Keeper entry point. Released collateral goes to the order owner.
    pub fn execute_decrease_order<O: PriceOracle>(
        &mut self,
        vault: &mut Vault<O>,
        account: AccountId,
        index: u64,
        fee_receiver: AccountId,
    ) -> Result<Price, OrderError> {
        let order = self
            .decrease_orders
            .get(account, index)
            .cloned()
            .ok_or(OrderError::NonExistentOrder { account, index })?;

        let book = self.account;
        let native = self.config.native_asset;
        let current = vault.atomic(|vault| -> Result<Price, OrderError> {
            // a decrease exits at the opposite side of the entry price
            let current = validate_position_order_price(
                vault,
                order.trigger_above_threshold,
                order.trigger_price,
                order.index_asset,
                !order.side.is_long(),
                true,
            )?
            .0;

            vault.decrease_position(
                book,
                order.account,
                order.collateral_asset,
                order.index_asset,
                order.collateral_delta,
                order.size_delta,
                order.side,
                order.account,
            )?;
            vault.transfer_tokens(book, native, fee_receiver, order.execution_fee)?;
            Ok(current)
        })?;

        self.decrease_orders.remove(account, index);
        tracing::info!(account = %account, index, price = %current, "decrease order executed");
        vault.emit_event(EventPayload::ExecuteDecreaseOrder(DecreaseOrderEvent {
            order,
            execution_price: Some(current),
        }));
        Ok(current)
    }

    // ---- queries ----

    pub fn increase_order(&self, account: AccountId, index: u64) -> Option<&IncreaseOrder> {
        self.increase_orders.get(account, index)
    }

    pub fn decrease_order(&self, account: AccountId, index: u64) -> Option<&DecreaseOrder> {
        self.decrease_orders.get(account, index)
    }

    /// Index the next increase order of `account` will get.
    pub fn increase_orders_index(&self, account: AccountId) -> u64 {
        self.increase_orders.next_index(account)
    }

    pub fn decrease_orders_index(&self, account: AccountId) -> u64 {
        self.decrease_orders.next_index(account)
    }

    pub fn increase_orders_of(&self, account: AccountId) -> Vec<&IncreaseOrder> {
        self.increase_orders.by_account(account)
    }

    pub fn decrease_orders_of(&self, account: AccountId) -> Vec<&DecreaseOrder> {
        self.decrease_orders.by_account(account)
    }

    pub fn open_order_count(&self) -> usize {
        self.increase_orders.len() + self.decrease_orders.len()
    }

    fn check_execution_fee(&self, fee: TokenAmount) -> Result<(), OrderError> {
        if fee < self.config.min_execution_fee {
            return Err(OrderError::InsufficientExecutionFee { fee, min: self.config.min_execution_fee });
        }
        Ok(())
    }

    fn ensure_gov(&self, caller: AccountId) -> Result<(), OrderError> {
        if caller != self.gov {
            return Err(OrderError::Forbidden);
        }
        Ok(())
    }
}

/// Current order price of `index_asset` and whether it meets the trigger. Reads
/// the max price when `maximise` is set. With `raise` an unmet trigger is an error.
pub fn validate_position_order_price<O: PriceOracle>(
    vault: &Vault<O>,
    trigger_above_threshold: bool,
    trigger_price: Price,
    index_asset: AssetId,
    maximise: bool,
    raise: bool,
) -> Result<(Price, bool), OrderError> {
    let current = vault
        .oracle()
        .get_price(index_asset, maximise, false, true)
        .map_err(VaultError::from)?;
    let valid = is_price_valid(trigger_above_threshold, trigger_price, current);
    if raise && !valid {
        return Err(OrderError::InvalidPriceForExecution { current, trigger: trigger_price });
    }
    Ok((current, valid))
}

// moves `amount` of `from` held by the book into the vault and swaps it back to the book
fn swap_through<O: PriceOracle>(
    vault: &mut Vault<O>,
    book: AccountId,
    from: AssetId,
    to: AssetId,
    amount: TokenAmount,
    min_out: TokenAmount,
) -> Result<TokenAmount, OrderError> {
    let vault_account = vault.account();
    vault.transfer_tokens(book, from, vault_account, amount)?;
    let result = vault.swap(from, to, book)?;
    if result.amount_out < min_out {
        return Err(OrderError::InsufficientAmountOut { amount_out: result.amount_out, min_out });
    }
    Ok(result.amount_out)
}

