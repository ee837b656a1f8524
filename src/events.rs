// 11.0: every state change produces an event. used for audit trails and for
// following pool and position state from outside. the EventPayload enum lists all types.
// events emitted inside a failed unit are rolled back with it.

use crate::liquidation::LiquidationState;
use crate::orders::{DecreaseOrder, IncreaseOrder};
use crate::position::PositionKey;
use crate::types::{AccountId, AssetId, Price, SignedUsd, Timestamp, TokenAmount, Usd};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Pool events
    BuyUsdg(UsdgEvent),
    SellUsdg(UsdgEvent),
    Swap(SwapEvent),
    DirectPoolDeposit(PoolAmountEvent),
    WithdrawFees(WithdrawFeesEvent),

    // Position events
    IncreasePosition(PositionChangeEvent),
    DecreasePosition(PositionChangeEvent),
    UpdatePosition(PositionSnapshotEvent),
    ClosePosition(PositionSnapshotEvent),
    LiquidatePosition(LiquidatePositionEvent),

    // Fee and funding events
    CollectMarginFees(FeeEvent),
    CollectSwapFees(FeeEvent),
    UpdateFundingRate(FundingRateEvent),

    // Order events
    CreateIncreaseOrder(IncreaseOrderEvent),
    UpdateIncreaseOrder(IncreaseOrderEvent),
    CancelIncreaseOrder(IncreaseOrderEvent),
    ExecuteIncreaseOrder(IncreaseOrderEvent),
    CreateDecreaseOrder(DecreaseOrderEvent),
    UpdateDecreaseOrder(DecreaseOrderEvent),
    CancelDecreaseOrder(DecreaseOrderEvent),
    ExecuteDecreaseOrder(DecreaseOrderEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsdgEvent {
    pub account: AccountId,
    pub asset: AssetId,
    pub token_amount: TokenAmount,
    pub usdg_amount: TokenAmount,
    pub fee_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapEvent {
    pub receiver: AccountId,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: TokenAmount,
    pub amount_out: TokenAmount,
    pub amount_out_after_fees: TokenAmount,
    pub fee_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolAmountEvent {
    pub asset: AssetId,
    pub amount: TokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawFeesEvent {
    pub asset: AssetId,
    pub receiver: AccountId,
    pub amount: TokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionChangeEvent {
    pub key: PositionKey,
    pub collateral_delta: Usd,
    pub size_delta: Usd,
    pub price: Price,
    pub fee: Usd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshotEvent {
    pub key: PositionKey,
    pub size: Usd,
    pub collateral: Usd,
    pub average_price: Price,
    pub entry_funding_rate: U256,
    pub reserve_amount: TokenAmount,
    pub realised_pnl: SignedUsd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidatePositionEvent {
    pub key: PositionKey,
    pub state: LiquidationState,
    pub size: Usd,
    pub collateral: Usd,
    pub reserve_amount: TokenAmount,
    pub realised_pnl: SignedUsd,
    pub mark_price: Price,
    pub fee_receiver: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEvent {
    pub asset: AssetId,
    pub fee_usd: Usd,
    pub fee_tokens: TokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRateEvent {
    pub asset: AssetId,
    pub cumulative_funding_rate: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncreaseOrderEvent {
    pub order: IncreaseOrder,
    pub execution_price: Option<Price>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecreaseOrderEvent {
    pub order: DecreaseOrder,
    pub execution_price: Option<Price>,
}

/// Bounded in-memory journal. Oldest events are dropped past `max_events`.
#[derive(Debug, Clone)]
pub struct EventJournal {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventJournal {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn push(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push_back(Event::new(id, timestamp, payload));

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
        id
    }

    /// Id the next event will get. Pass it to `rollback_to` to undo everything after.
    pub fn mark(&self) -> EventId {
        EventId(self.next_id)
    }

    pub fn rollback_to(&mut self, mark: EventId) {
        while self.events.back().map_or(false, |e| e.id >= mark) {
            self.events.pop_back();
        }
        self.next_id = mark.0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn recent(&self, count: usize) -> impl Iterator<Item = &Event> {
        self.events.iter().skip(self.events.len().saturating_sub(count))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
