//! # In-Memory Asset Ledger
//!
//! A plain balance/allowance book for any number of fungible assets. It is
//! the ledger the CLI persists and the one every test runs against, so it
//! follows the usual token rules to the letter: pulls consume allowances,
//! an allowance of `u128::MAX` never decreases, and nothing goes negative.
//!
//! Settlement stages every touched balance and allowance in a scratch map
//! and only writes back once the whole batch has validated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AssetError, AssetLedger, AssetMetadata, Transfer};
use crate::types::{Address, Amount};

// ---------------------------------------------------------------------------
// MockAsset
// ---------------------------------------------------------------------------

/// One fungible asset's supply, balances, and allowances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockAsset {
    metadata: AssetMetadata,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    /// `owner -> (spender -> remaining)`.
    allowances: HashMap<Address, HashMap<Address, Amount>>,
}

impl MockAsset {
    fn new(metadata: AssetMetadata) -> Self {
        Self {
            metadata,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Name, symbol, decimals.
    pub fn metadata(&self) -> &AssetMetadata {
        &self.metadata
    }

    /// Total minted.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of `holder`, zero if never credited.
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Remaining allowance from `owner` to `spender`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

/// A multi-asset ledger held entirely in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    assets: HashMap<Address, MockAsset>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new asset under `asset` with zero supply.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidAsset`] for the zero address and
    /// [`AssetError::DuplicateAsset`] if the handle is taken.
    pub fn register(&mut self, asset: Address, metadata: AssetMetadata) -> Result<(), AssetError> {
        if asset.is_zero() {
            return Err(AssetError::InvalidAsset);
        }
        if self.assets.contains_key(&asset) {
            return Err(AssetError::DuplicateAsset(asset));
        }
        debug!(%asset, symbol = %metadata.symbol, "asset registered");
        self.assets.insert(asset, MockAsset::new(metadata));
        Ok(())
    }

    /// Creates `amount` new units of `asset` in `to`'s balance.
    pub fn mint(&mut self, asset: &Address, to: &Address, amount: Amount) -> Result<(), AssetError> {
        let token = self
            .assets
            .get_mut(asset)
            .ok_or(AssetError::UnknownAsset(*asset))?;
        let overflow = AssetError::Overflow {
            asset: *asset,
            holder: *to,
        };
        let supply = token
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| overflow.clone())?;
        let balance = token
            .balance_of(to)
            .checked_add(amount)
            .ok_or(overflow)?;
        token.total_supply = supply;
        token.balances.insert(*to, balance);
        Ok(())
    }

    /// Sets `spender`'s allowance over `owner`'s balance to exactly `amount`.
    pub fn approve(
        &mut self,
        asset: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let token = self
            .assets
            .get_mut(asset)
            .ok_or(AssetError::UnknownAsset(*asset))?;
        token
            .allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        Ok(())
    }

    /// Direct transfer between two holders.
    pub fn transfer(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        self.settle(&[Transfer::Push {
            asset: *asset,
            from: *from,
            to: *to,
            amount,
        }])
    }

    /// Total minted supply of `asset`, zero if unknown.
    pub fn total_supply(&self, asset: &Address) -> Amount {
        self.assets.get(asset).map(|t| t.total_supply).unwrap_or(0)
    }

    /// The full record of one asset.
    pub fn asset(&self, asset: &Address) -> Option<&MockAsset> {
        self.assets.get(asset)
    }

    /// Number of registered assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    fn token(&self, asset: &Address) -> Result<&MockAsset, AssetError> {
        self.assets.get(asset).ok_or(AssetError::UnknownAsset(*asset))
    }
}

impl AssetLedger for InMemoryLedger {
    fn balance_of(&self, asset: &Address, holder: &Address) -> Amount {
        self.assets
            .get(asset)
            .map(|t| t.balance_of(holder))
            .unwrap_or(0)
    }

    fn allowance(&self, asset: &Address, owner: &Address, spender: &Address) -> Amount {
        self.assets
            .get(asset)
            .map(|t| t.allowance(owner, spender))
            .unwrap_or(0)
    }

    fn metadata(&self, asset: &Address) -> Option<AssetMetadata> {
        self.assets.get(asset).map(|t| t.metadata.clone())
    }

    fn settle(&mut self, batch: &[Transfer]) -> Result<(), AssetError> {
        let mut staging = Staging::new(self);
        for transfer in batch {
            match *transfer {
                Transfer::Pull {
                    asset,
                    from,
                    spender,
                    amount,
                } => {
                    staging.spend_allowance(asset, from, spender, amount)?;
                    staging.move_funds(asset, from, spender, amount)?;
                }
                Transfer::Push {
                    asset,
                    from,
                    to,
                    amount,
                } => staging.move_funds(asset, from, to, amount)?,
            }
        }

        let Staging {
            balances,
            allowances,
            ..
        } = staging;
        for ((asset, holder), balance) in balances {
            if let Some(token) = self.assets.get_mut(&asset) {
                token.balances.insert(holder, balance);
            }
        }
        for ((asset, owner, spender), remaining) in allowances {
            if let Some(token) = self.assets.get_mut(&asset) {
                token
                    .allowances
                    .entry(owner)
                    .or_default()
                    .insert(spender, remaining);
            }
        }
        debug!(transfers = batch.len(), "settlement batch applied");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

/// Scratch copy of every balance and allowance a batch touches.
struct Staging<'a> {
    ledger: &'a InMemoryLedger,
    balances: HashMap<(Address, Address), Amount>,
    allowances: HashMap<(Address, Address, Address), Amount>,
}

impl<'a> Staging<'a> {
    fn new(ledger: &'a InMemoryLedger) -> Self {
        Self {
            ledger,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    fn balance(&self, asset: Address, holder: Address) -> Result<Amount, AssetError> {
        match self.balances.get(&(asset, holder)) {
            Some(staged) => Ok(*staged),
            None => Ok(self.ledger.token(&asset)?.balance_of(&holder)),
        }
    }

    fn move_funds(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let available = self.balance(asset, from)?;
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                asset,
                holder: from,
                available,
                requested: amount,
            });
        }
        self.balances.insert((asset, from), available - amount);

        // Read after the debit so a self-transfer nets to zero.
        let credited = self
            .balance(asset, to)?
            .checked_add(amount)
            .ok_or(AssetError::Overflow { asset, holder: to })?;
        self.balances.insert((asset, to), credited);
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        asset: Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let key = (asset, owner, spender);
        let available = match self.allowances.get(&key) {
            Some(staged) => *staged,
            None => self.ledger.token(&asset)?.allowance(&owner, &spender),
        };
        if available == Amount::MAX {
            return Ok(());
        }
        if available < amount {
            return Err(AssetError::InsufficientAllowance {
                asset,
                owner,
                spender,
                available,
                requested: amount,
            });
        }
        self.allowances.insert(key, available - amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> Address {
        Address::from_label("weth")
    }

    fn ledger_with_weth() -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger
            .register(weth(), AssetMetadata::new("Wrapped Ether", "WETH", 18))
            .unwrap();
        ledger
    }

    #[test]
    fn register_rejects_zero_and_duplicates() {
        let mut ledger = ledger_with_weth();
        assert_eq!(
            ledger.register(Address::ZERO, AssetMetadata::new("x", "X", 18)),
            Err(AssetError::InvalidAsset)
        );
        assert_eq!(
            ledger.register(weth(), AssetMetadata::new("again", "W", 18)),
            Err(AssetError::DuplicateAsset(weth()))
        );
        assert_eq!(ledger.asset_count(), 1);
    }

    #[test]
    fn mint_credits_balance_and_supply() {
        let mut ledger = ledger_with_weth();
        let alice = Address::from_label("alice");
        ledger.mint(&weth(), &alice, 500).unwrap();
        assert_eq!(ledger.balance_of(&weth(), &alice), 500);
        assert_eq!(ledger.total_supply(&weth()), 500);
    }

    #[test]
    fn mint_unknown_asset_fails() {
        let mut ledger = InMemoryLedger::new();
        let result = ledger.mint(&weth(), &Address::from_label("alice"), 1);
        assert_eq!(result, Err(AssetError::UnknownAsset(weth())));
    }

    #[test]
    fn pull_requires_and_consumes_allowance() {
        let mut ledger = ledger_with_weth();
        let alice = Address::from_label("alice");
        let vault = Address::from_label("vault");
        ledger.mint(&weth(), &alice, 1_000).unwrap();

        let pull = Transfer::Pull {
            asset: weth(),
            from: alice,
            spender: vault,
            amount: 400,
        };
        assert!(matches!(
            ledger.settle(&[pull]),
            Err(AssetError::InsufficientAllowance { .. })
        ));

        ledger.approve(&weth(), &alice, &vault, 500).unwrap();
        ledger.settle(&[pull]).unwrap();
        assert_eq!(ledger.balance_of(&weth(), &alice), 600);
        assert_eq!(ledger.balance_of(&weth(), &vault), 400);
        assert_eq!(ledger.allowance(&weth(), &alice, &vault), 100);
    }

    #[test]
    fn unlimited_allowance_is_not_consumed() {
        let mut ledger = ledger_with_weth();
        let alice = Address::from_label("alice");
        let vault = Address::from_label("vault");
        ledger.mint(&weth(), &alice, 1_000).unwrap();
        ledger.approve(&weth(), &alice, &vault, Amount::MAX).unwrap();
        ledger
            .settle(&[Transfer::Pull {
                asset: weth(),
                from: alice,
                spender: vault,
                amount: 1_000,
            }])
            .unwrap();
        assert_eq!(ledger.allowance(&weth(), &alice, &vault), Amount::MAX);
    }

    #[test]
    fn failed_batch_leaves_everything_untouched() {
        let mut ledger = ledger_with_weth();
        let vault = Address::from_label("vault");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        ledger.mint(&weth(), &vault, 100).unwrap();

        // First push is fine on its own; the second overdraws.
        let batch = [
            Transfer::Push {
                asset: weth(),
                from: vault,
                to: alice,
                amount: 60,
            },
            Transfer::Push {
                asset: weth(),
                from: vault,
                to: bob,
                amount: 60,
            },
        ];
        let err = ledger.settle(&batch).unwrap_err();
        assert_eq!(
            err,
            AssetError::InsufficientBalance {
                asset: weth(),
                holder: vault,
                available: 40,
                requested: 60,
            }
        );
        assert_eq!(ledger.balance_of(&weth(), &vault), 100);
        assert_eq!(ledger.balance_of(&weth(), &alice), 0);
        assert_eq!(ledger.balance_of(&weth(), &bob), 0);
    }

    #[test]
    fn self_transfer_is_a_no_op() {
        let mut ledger = ledger_with_weth();
        let alice = Address::from_label("alice");
        ledger.mint(&weth(), &alice, 10).unwrap();
        ledger.transfer(&weth(), &alice, &alice, 10).unwrap();
        assert_eq!(ledger.balance_of(&weth(), &alice), 10);
    }

    #[test]
    fn ledger_survives_json_persistence() {
        let mut ledger = ledger_with_weth();
        let alice = Address::from_label("alice");
        let vault = Address::from_label("vault");
        ledger.mint(&weth(), &alice, 77).unwrap();
        ledger.approve(&weth(), &alice, &vault, 5).unwrap();

        let json = serde_json::to_string(&ledger).unwrap();
        let restored: InMemoryLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.balance_of(&weth(), &alice), 77);
        assert_eq!(restored.allowance(&weth(), &alice, &vault), 5);
        assert_eq!(restored.metadata(&weth()).unwrap().symbol, "WETH");
    }
}
