//! # Hodl Contracts
//!
//! The vault and registry state machines. Both are plain Rust structs that
//! keep their own books and move value only through an
//! [`AssetLedger`](hodl_protocol::AssetLedger):
//!
//! - **Hodl Vault**: time-locked deposits with penalized early exit,
//!   time-decayed shares, and pro-rata payout of a reward pool and an
//!   optional bonus pool.
//! - **Vault Factory**: the registry that whitelists assets and deploys one
//!   vault per parameter tuple at a deterministic address.
//! - **Shares**: the phase function and the integer formulas both build on.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. Arithmetic that can
//!    exceed `u128` surfaces as an `OVERFLOW` error rather than wrapping.
//! 2. State transitions are explicit: a [`Phase`](shares::Phase) computed
//!    from the clock, not boolean flags.
//! 3. Operations are all-or-nothing. Transfers settle as one batch before
//!    any vault state changes.
//! 4. Every public type is serializable (serde) so a whole world can be
//!    persisted and reloaded.

pub mod hodl_vault;
pub mod serde_entries;
pub mod shares;
pub mod vault_factory;

pub use hodl_vault::{
    BonusAsset, ExitReceipt, HodlVault, Position, Redemption, Settlement, VaultConfig, VaultError,
    VaultParams, VaultSummary,
};
pub use shares::Phase;
pub use vault_factory::{derive_clone_address, receipt_metadata, RegistryError, VaultRegistry};
