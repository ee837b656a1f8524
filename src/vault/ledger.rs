// 8.2 vault/ledger.rs: pools, positions and token balances behind an undo log.
// inside an atomic unit every write first logs the value it replaces, so a
// rollback only touches what the unit touched. units nest; the log is dropped
// once the outermost unit commits.

use crate::custody::{SupplyAdjuster, TokenError, TokenLedger};
use crate::pool::{PoolLedger, PoolState};
use crate::position::{Position, PositionKey};
use crate::types::{AccountId, AssetId, TokenAmount};
use std::collections::HashMap;

#[derive(Debug)]
enum Undo {
    Pool(AssetId, Option<PoolState>),
    Position(PositionKey, Option<Position>),
    Balance(AccountId, AssetId, Option<TokenAmount>),
    Supply(AssetId, Option<TokenAmount>),
    Recorded(AssetId, Option<TokenAmount>),
}

#[derive(Debug, Default)]
pub(super) struct Ledger {
    pools: PoolLedger,
    positions: HashMap<PositionKey, Position>,
    tokens: TokenLedger,
    // vault balances as of the last transfer in or out
    recorded_balances: HashMap<AssetId, TokenAmount>,
    undo: Vec<Undo>,
    depth: usize,
}

impl Ledger {
    // ---- units ----

    /// Opens a unit and returns its rollback mark.
    pub(super) fn begin(&mut self) -> usize {
        self.depth += 1;
        self.undo.len()
    }

    pub(super) fn commit(&mut self) {
        self.close_unit();
    }

    /// Restores every value written since `mark`, newest first.
    pub(super) fn rollback(&mut self, mark: usize) {
        while self.undo.len() > mark {
            let Some(entry) = self.undo.pop() else {
                break;
            };
            match entry {
                Undo::Pool(asset, prior) => self.pools.restore(asset, prior),
                Undo::Position(key, Some(position)) => {
                    self.positions.insert(key, position);
                }
                Undo::Position(key, None) => {
                    self.positions.remove(&key);
                }
                Undo::Balance(holder, asset, prior) => self.tokens.restore_balance(holder, asset, prior),
                Undo::Supply(asset, prior) => self.tokens.restore_supply(asset, prior),
                Undo::Recorded(asset, Some(amount)) => {
                    self.recorded_balances.insert(asset, amount);
                }
                Undo::Recorded(asset, None) => {
                    self.recorded_balances.remove(&asset);
                }
            }
        }
        self.close_unit();
    }

    fn close_unit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.undo.clear();
        }
    }

    fn logging(&self) -> bool {
        self.depth > 0
    }

    fn log_balance(&mut self, holder: AccountId, asset: AssetId) {
        if self.logging() {
            let prior = self.tokens.stored_balance(holder, asset);
            self.undo.push(Undo::Balance(holder, asset, prior));
        }
    }

    fn log_supply(&mut self, asset: AssetId) {
        if self.logging() {
            let prior = self.tokens.stored_supply(asset);
            self.undo.push(Undo::Supply(asset, prior));
        }
    }

    // ---- pools ----

    pub(super) fn pool(&self, asset: AssetId) -> Option<&PoolState> {
        self.pools.get(asset)
    }

    pub(super) fn pool_mut(&mut self, asset: AssetId) -> &mut PoolState {
        if self.logging() {
            let prior = self.pools.get(asset).cloned();
            self.undo.push(Undo::Pool(asset, prior));
        }
        self.pools.get_mut(asset)
    }

    // ---- positions ----

    pub(super) fn position(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    pub(super) fn positions(&self) -> impl Iterator<Item = (&PositionKey, &Position)> {
        self.positions.iter()
    }

    pub(super) fn insert_position(&mut self, key: PositionKey, position: Position) {
        let prior = self.positions.insert(key, position);
        if self.logging() {
            self.undo.push(Undo::Position(key, prior));
        }
    }

    pub(super) fn remove_position(&mut self, key: &PositionKey) -> Option<Position> {
        let prior = self.positions.remove(key);
        if self.logging() && prior.is_some() {
            self.undo.push(Undo::Position(*key, prior.clone()));
        }
        prior
    }

    // ---- tokens ----

    pub(super) fn balance_of(&self, holder: AccountId, asset: AssetId) -> TokenAmount {
        self.tokens.balance_of(holder, asset)
    }

    pub(super) fn total_supply(&self, asset: AssetId) -> TokenAmount {
        self.tokens.total_supply(asset)
    }

    pub(super) fn transfer(
        &mut self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: TokenAmount,
    ) -> Result<(), TokenError> {
        self.log_balance(from, asset);
        self.log_balance(to, asset);
        self.tokens.transfer(asset, from, to, amount)
    }

    pub(super) fn mint(&mut self, asset: AssetId, to: AccountId, amount: TokenAmount) -> Result<(), TokenError> {
        self.log_balance(to, asset);
        self.log_supply(asset);
        SupplyAdjuster::mint(&mut self.tokens, asset, to, amount)
    }

    pub(super) fn burn(&mut self, asset: AssetId, from: AccountId, amount: TokenAmount) -> Result<(), TokenError> {
        self.log_balance(from, asset);
        self.log_supply(asset);
        SupplyAdjuster::burn(&mut self.tokens, asset, from, amount)
    }

    pub(super) fn recorded_balance(&self, asset: AssetId) -> TokenAmount {
        self.recorded_balances.get(&asset).copied().unwrap_or_default()
    }

    pub(super) fn set_recorded_balance(&mut self, asset: AssetId, amount: TokenAmount) {
        let prior = self.recorded_balances.insert(asset, amount);
        if self.logging() {
            self.undo.push(Undo::Recorded(asset, prior));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Side, Timestamp, Usd};
    use primitive_types::U256;

    const ALICE: AccountId = AccountId(1);
    const VAULT: AccountId = AccountId(2);
    const BTC: AssetId = AssetId(2);

    fn key() -> PositionKey {
        PositionKey::new(ALICE, BTC, BTC, Side::Long)
    }

    fn funded() -> Ledger {
        let mut ledger = Ledger::default();
        ledger.mint(BTC, ALICE, U256::from(1000)).unwrap();
        ledger
    }

    #[test]
    fn test_rollback_restores_touched_state() {
        let mut ledger = funded();

        let mark = ledger.begin();
        ledger.transfer(BTC, ALICE, VAULT, U256::from(400)).unwrap();
        ledger.set_recorded_balance(BTC, U256::from(400));
        ledger.pool_mut(BTC).increase_pool_amount(U256::from(400)).unwrap();
        let opening = Position::opening(Price::one_usd(), Timestamp::default());
        ledger.insert_position(key(), opening);
        ledger.rollback(mark);

        assert_eq!(ledger.balance_of(ALICE, BTC), U256::from(1000));
        assert_eq!(ledger.balance_of(VAULT, BTC), U256::zero());
        assert_eq!(ledger.recorded_balance(BTC), U256::zero());
        assert!(ledger.pool(BTC).is_none());
        assert!(ledger.position(&key()).is_none());
        assert!(ledger.undo.is_empty());
    }

    #[test]
    fn test_inner_rollback_keeps_outer_writes() {
        let mut ledger = funded();

        let outer = ledger.begin();
        ledger.transfer(BTC, ALICE, VAULT, U256::from(100)).unwrap();

        let inner = ledger.begin();
        ledger.burn(BTC, ALICE, U256::from(900)).unwrap();
        ledger.rollback(inner);

        assert_eq!(ledger.balance_of(ALICE, BTC), U256::from(900));
        assert_eq!(ledger.total_supply(BTC), U256::from(1000));

        ledger.rollback(outer);
        assert_eq!(ledger.balance_of(ALICE, BTC), U256::from(1000));
        assert_eq!(ledger.balance_of(VAULT, BTC), U256::zero());
    }

    #[test]
    fn test_commit_drops_log() {
        let mut ledger = funded();

        let _ = ledger.begin();
        let mut position = Position::opening(Price::one_usd(), Timestamp::default());
        position.size = Usd::from_units(10);
        ledger.insert_position(key(), position);
        ledger.remove_position(&key());
        ledger.commit();

        assert!(ledger.undo.is_empty());
        assert!(ledger.position(&key()).is_none());

        // outside a unit nothing is logged
        ledger.transfer(BTC, ALICE, VAULT, U256::from(1)).unwrap();
        assert!(ledger.undo.is_empty());
    }
}
