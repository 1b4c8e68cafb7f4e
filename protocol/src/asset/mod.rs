//! # Fungible Asset Ledger
//!
//! The vaults never hold asset balances themselves. They keep their own
//! books (receipts, shares, reward pools) and ask an [`AssetLedger`] to
//! move the real value. The ledger contract is small:
//!
//! - report balances, allowances, and metadata;
//! - apply a batch of [`Transfer`]s atomically, or reject the whole batch.
//!
//! Batching is what gives vault operations their all-or-nothing semantics:
//! an operation computes every transfer it needs up front, submits them in
//! one [`AssetLedger::settle`] call, and only commits its own books if the
//! batch went through.
//!
//! ```text
//! mod.rs     : ledger trait, transfer instructions, errors
//! memory.rs  : InMemoryLedger: mint/approve/transfer bookkeeping
//! ```

pub mod memory;

pub use memory::{InMemoryLedger, MockAsset};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Address, Amount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by an asset ledger. Any of these aborts the batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The ledger does not know this asset.
    #[error("unknown asset {0}")]
    UnknownAsset(Address),

    /// An asset with this handle is already registered.
    #[error("asset {0} is already registered")]
    DuplicateAsset(Address),

    /// The zero address cannot be an asset.
    #[error("the zero address is not a valid asset")]
    InvalidAsset,

    /// The debited holder does not have enough.
    #[error("insufficient balance of {asset} for {holder}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Asset being moved.
        asset: Address,
        /// Holder being debited.
        holder: Address,
        /// Holder's balance at the time of the debit.
        available: Amount,
        /// Amount the transfer tried to move.
        requested: Amount,
    },

    /// The spender was not approved for enough.
    #[error("insufficient allowance of {asset} from {owner} to {spender}: available {available}, requested {requested}")]
    InsufficientAllowance {
        /// Asset being pulled.
        asset: Address,
        /// Holder whose funds are pulled.
        owner: Address,
        /// Account doing the pulling.
        spender: Address,
        /// Remaining allowance.
        available: Amount,
        /// Amount the pull needed.
        requested: Amount,
    },

    /// A credit or mint would overflow `u128`.
    #[error("balance overflow of {asset} for {holder}")]
    Overflow {
        /// Asset being credited.
        asset: Address,
        /// Holder being credited.
        holder: Address,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Descriptive metadata of a fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Human-readable name, e.g. "Wrapped Ether".
    pub name: String,
    /// Ticker, e.g. "WETH".
    pub symbol: String,
    /// Display decimals. Arithmetic never looks at this.
    pub decimals: u8,
}

impl AssetMetadata {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// One movement of value inside a settlement batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transfer {
    /// Allowance-gated pull: `spender` moves `amount` from `from` into its
    /// own balance, consuming `from`'s approval for `spender`.
    Pull {
        /// Asset being pulled.
        asset: Address,
        /// Holder who pre-approved the pull.
        from: Address,
        /// Account receiving the funds and spending the allowance.
        spender: Address,
        /// Amount to move.
        amount: Amount,
    },
    /// Push from an account's own balance.
    Push {
        /// Asset being pushed.
        asset: Address,
        /// Account sending its own funds.
        from: Address,
        /// Recipient.
        to: Address,
        /// Amount to move.
        amount: Amount,
    },
}

impl Transfer {
    /// The asset this transfer moves.
    pub fn asset(&self) -> Address {
        match self {
            Transfer::Pull { asset, .. } | Transfer::Push { asset, .. } => *asset,
        }
    }

    /// The amount this transfer moves.
    pub fn amount(&self) -> Amount {
        match self {
            Transfer::Pull { amount, .. } | Transfer::Push { amount, .. } => *amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The fungible asset collaborator seen by vaults and the registry.
pub trait AssetLedger {
    /// Balance of `holder` in `asset`. Unknown assets report zero.
    fn balance_of(&self, asset: &Address, holder: &Address) -> Amount;

    /// How much `spender` may still pull from `owner`.
    fn allowance(&self, asset: &Address, owner: &Address, spender: &Address) -> Amount;

    /// Metadata for `asset`, if the ledger knows it.
    fn metadata(&self, asset: &Address) -> Option<AssetMetadata>;

    /// Applies every transfer in `batch`, in order, or none of them.
    fn settle(&mut self, batch: &[Transfer]) -> Result<(), AssetError>;
}
