// 9.2 custody.rs: MOCKED. just balance changes, no real token transfers.
// every asset, the share token included, lives in one ledger keyed by (holder, asset).
// the vault and the order book are plain holders with their own account ids.

use primitive_types::U256;
use std::collections::HashMap;

use crate::types::{AccountId, AssetId, TokenAmount};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("{holder} holds {available} of {asset}, needs {requested}")]
    InsufficientBalance {
        holder: AccountId,
        asset: AssetId,
        available: TokenAmount,
        requested: TokenAmount,
    },

    #[error("supply of {asset} would overflow")]
    SupplyOverflow { asset: AssetId },
}

/// Mint/burn interface of the pool share token. The vault only changes supply
/// through this trait and never touches holder balances of that asset directly.
pub trait SupplyAdjuster {
    fn mint(&mut self, asset: AssetId, to: AccountId, amount: TokenAmount) -> Result<(), TokenError>;
    fn burn(&mut self, asset: AssetId, from: AccountId, amount: TokenAmount) -> Result<(), TokenError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: HashMap<(AccountId, AssetId), TokenAmount>,
    supplies: HashMap<AssetId, TokenAmount>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, holder: AccountId, asset: AssetId) -> TokenAmount {
        self.balances.get(&(holder, asset)).copied().unwrap_or_default()
    }

    pub fn total_supply(&self, asset: AssetId) -> TokenAmount {
        self.supplies.get(&asset).copied().unwrap_or_default()
    }

    pub(crate) fn stored_balance(&self, holder: AccountId, asset: AssetId) -> Option<TokenAmount> {
        self.balances.get(&(holder, asset)).copied()
    }

    pub(crate) fn stored_supply(&self, asset: AssetId) -> Option<TokenAmount> {
        self.supplies.get(&asset).copied()
    }

    pub(crate) fn restore_balance(&mut self, holder: AccountId, asset: AssetId, prior: Option<TokenAmount>) {
        match prior {
            Some(amount) => self.balances.insert((holder, asset), amount),
            None => self.balances.remove(&(holder, asset)),
        };
    }

    pub(crate) fn restore_supply(&mut self, asset: AssetId, prior: Option<TokenAmount>) {
        match prior {
            Some(amount) => self.supplies.insert(asset, amount),
            None => self.supplies.remove(&asset),
        };
    }

    pub fn transfer(
        &mut self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: TokenAmount,
    ) -> Result<(), TokenError> {
        if amount.is_zero() || from == to {
            return self.debit(from, asset, U256::zero());
        }
        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount);
        Ok(())
    }

    fn debit(&mut self, holder: AccountId, asset: AssetId, amount: TokenAmount) -> Result<(), TokenError> {
        let available = self.balance_of(holder, asset);
        if available < amount {
            return Err(TokenError::InsufficientBalance { holder, asset, available, requested: amount });
        }
        if !amount.is_zero() {
            self.balances.insert((holder, asset), available - amount);
        }
        Ok(())
    }

    // a credit never exceeds the matching supply, which is itself overflow checked
    fn credit(&mut self, holder: AccountId, asset: AssetId, amount: TokenAmount) {
        let entry = self.balances.entry((holder, asset)).or_default();
        *entry = entry.saturating_add(amount);
    }
}

impl SupplyAdjuster for TokenLedger {
    fn mint(&mut self, asset: AssetId, to: AccountId, amount: TokenAmount) -> Result<(), TokenError> {
        let supply = self.total_supply(asset);
        let next = supply.checked_add(amount).ok_or(TokenError::SupplyOverflow { asset })?;
        self.supplies.insert(asset, next);
        self.credit(to, asset, amount);
        Ok(())
    }

    fn burn(&mut self, asset: AssetId, from: AccountId, amount: TokenAmount) -> Result<(), TokenError> {
        self.debit(from, asset, amount)?;
        let supply = self.total_supply(asset);
        self.supplies.insert(asset, supply.saturating_sub(amount));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);
    const BTC: AssetId = AssetId(1);

    #[test]
    fn test_mint_transfer_burn() {
        let mut ledger = TokenLedger::new();
        ledger.mint(BTC, ALICE, U256::from(1000)).unwrap();
        ledger.transfer(BTC, ALICE, BOB, U256::from(400)).unwrap();

        assert_eq!(ledger.balance_of(ALICE, BTC), U256::from(600));
        assert_eq!(ledger.balance_of(BOB, BTC), U256::from(400));

        ledger.burn(BTC, BOB, U256::from(100)).unwrap();
        assert_eq!(ledger.total_supply(BTC), U256::from(900));
    }

    #[test]
    fn test_insufficient_balance() {
        let mut ledger = TokenLedger::new();
        ledger.mint(BTC, ALICE, U256::from(10)).unwrap();

        let result = ledger.transfer(BTC, ALICE, BOB, U256::from(11));
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        assert_eq!(ledger.balance_of(ALICE, BTC), U256::from(10));
        assert_eq!(ledger.balance_of(BOB, BTC), U256::zero());
    }

    #[test]
    fn test_supply_overflow() {
        let mut ledger = TokenLedger::new();
        ledger.mint(BTC, ALICE, U256::MAX).unwrap();
        assert_eq!(ledger.mint(BTC, BOB, U256::one()), Err(TokenError::SupplyOverflow { asset: BTC }));
    }
}
