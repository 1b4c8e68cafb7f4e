//! # Hodl Vault Contract
//!
//! A time-locked vault over one base asset. Depositors lock the asset until
//! a fixed expiry and receive two things in return:
//!
//! - **principal receipts**, 1:1 with what they deposited and never
//!   transferable;
//! - **shares**, a claim weight that decays the closer to expiry the deposit
//!   is made. Shares entitle their holder to a pro-rata cut of the reward
//!   pool (and of the bonus pool, when one is configured).
//!
//! Leaving before expiry costs a penalty. Part of it goes to the fee
//! recipient, the rest feeds the reward pool, and the leaver forfeits every
//! share they held. Donations top up either pool at any time.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --init--> Open --(expiry - window)--> Locked --expiry--> Expired
//! ```
//!
//! | operation        | Open | Locked | Expired |
//! |------------------|------|--------|---------|
//! | deposit          | yes  | LOCKED | LOCKED  |
//! | quit             | yes  | yes    | EXPIRED |
//! | redeem / donate  | yes  | yes    | yes     |
//! | withdraw(_all)   | !EXPIRED | !EXPIRED | yes |
//!
//! ## Atomicity
//!
//! Each operation validates and computes every new total first, then hands
//! its transfers to the asset ledger as a single batch, and only then
//! writes its own books. A rejected batch leaves the vault untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use hodl_protocol::config::{DEFAULT_DECIMALS, MAX_LOCKING_WINDOW_SECS, MAX_RATE};
use hodl_protocol::{
    Address, AssetError, AssetLedger, AssetMetadata, Amount, CallContext, Timestamp, Transfer,
};

use crate::shares::{self, Phase};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// `init` was called on a vault that already has parameters.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// An operation reached a vault that was never initialized.
    #[error("vault is not initialized")]
    NotInitialized,

    /// The base asset is the zero address.
    #[error("invalid asset: the base asset cannot be the zero address")]
    InvalidAsset,

    /// Penalty rate above 1000 per mille.
    #[error("invalid penalty rate {0}: must be at most 1000")]
    InvalidPenalty(u16),

    /// Fee rate above 1000 per mille.
    #[error("invalid fee rate {0}: must be at most 1000")]
    InvalidFee(u16),

    /// The expiry is not far enough past `now`, or the window is too long.
    #[error("invalid expiry {expiry} at {now} with locking window {locking_window}s")]
    InvalidExpiry {
        /// Requested expiry.
        expiry: Timestamp,
        /// Time of the init call.
        now: Timestamp,
        /// Requested locking window.
        locking_window: u64,
    },

    /// Decay exponent of zero, or one too large for the vault's lifetime.
    #[error("invalid decay exponent {0}")]
    InvalidDecay(u32),

    /// Bonus asset equal to the base asset, or the zero address.
    #[error("invalid bonus token {0}")]
    InvalidBonusToken(Address),

    /// The fee recipient is the zero address.
    #[error("invalid fee recipient: cannot be the zero address")]
    InvalidRecipient,

    /// Deposit attempted once the locking window has started.
    #[error("vault is locked: deposits closed ({phase})")]
    Locked {
        /// Phase at the time of the call.
        phase: Phase,
    },

    /// Early exit attempted after expiry.
    #[error("vault has expired: early exit is closed")]
    Expired,

    /// Withdrawal attempted before expiry.
    #[error("vault has not expired yet ({phase})")]
    NotExpired {
        /// Phase at the time of the call.
        phase: Phase,
    },

    /// Burning more receipts than the holder has.
    #[error("insufficient balance: holder has {balance}, tried to burn {amount}")]
    InsufficientBalance {
        /// Holder's receipt balance.
        balance: Amount,
        /// Amount requested.
        amount: Amount,
    },

    /// Redeeming more shares than the holder has.
    #[error("insufficient shares: holder has {shares}, tried to redeem {requested}")]
    InsufficientShares {
        /// Holder's share balance.
        shares: Amount,
        /// Shares requested.
        requested: Amount,
    },

    /// Receipts cannot be transferred.
    #[error("receipts are not transferable")]
    TransferDisabled,

    /// Donation in an asset this vault does not account for.
    #[error("token {0} is not accepted by this vault")]
    TokenNotAllowed(Address),

    /// Sweep targeting the base or bonus asset.
    #[error("token {0} is accounted for and cannot be swept")]
    InvalidTokenToSweep(Address),

    /// Intermediate arithmetic exceeded `u128`.
    #[error("arithmetic overflow")]
    Overflow,

    /// The asset ledger rejected the settlement batch.
    #[error("asset transfer failed: {0}")]
    Asset(#[from] AssetError),
}

impl VaultError {
    /// Stable reason code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::AlreadyInitialized => "ALREADY_INITIALIZED",
            VaultError::NotInitialized => "NOT_INITIALIZED",
            VaultError::InvalidAsset => "INVALID_ASSET",
            VaultError::InvalidPenalty(_) => "INVALID_PENALTY",
            VaultError::InvalidFee(_) => "INVALID_FEE",
            VaultError::InvalidExpiry { .. } => "INVALID_EXPIRY",
            VaultError::InvalidDecay(_) => "INVALID_DECAY",
            VaultError::InvalidBonusToken(_) => "INVALID_BONUS_TOKEN",
            VaultError::InvalidRecipient => "INVALID_RECIPIENT",
            VaultError::Locked { .. } => "LOCKED",
            VaultError::Expired => "EXPIRED",
            VaultError::NotExpired { .. } => "!EXPIRED",
            VaultError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            VaultError::InsufficientShares { .. } => "INSUFFICIENT_SHARES",
            VaultError::TransferDisabled => "!TRANSFER",
            VaultError::TokenNotAllowed(_) => "TOKEN_NOT_ALLOWED",
            VaultError::InvalidTokenToSweep(_) => "INVALID_TOKEN_TO_SWEEP",
            VaultError::Overflow => "OVERFLOW",
            VaultError::Asset(_) => "TRANSFER_FAILED",
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether a vault runs a second reward pool in a separate asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BonusAsset {
    /// Only the base-asset reward pool exists.
    #[default]
    Disabled,
    /// Donations in this asset fund the bonus pool.
    Enabled(Address),
}

impl BonusAsset {
    /// Maps the zero address to `Disabled`, anything else to `Enabled`.
    pub fn from_address(address: Address) -> Self {
        if address.is_zero() {
            BonusAsset::Disabled
        } else {
            BonusAsset::Enabled(address)
        }
    }

    /// The bonus asset, if any.
    pub fn address(&self) -> Option<Address> {
        match self {
            BonusAsset::Disabled => None,
            BonusAsset::Enabled(address) => Some(*address),
        }
    }

    /// `true` when `asset` is the configured bonus asset.
    pub fn is(&self, asset: &Address) -> bool {
        self.address().as_ref() == Some(asset)
    }
}

/// The parameter tuple identifying a vault. Two vaults with equal
/// parameters are the same vault as far as the registry is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultParams {
    /// Base asset deposited and locked.
    pub asset: Address,
    /// Per-mille of principal forfeited on early exit.
    pub penalty_rate: u16,
    /// Seconds before expiry during which deposits are refused.
    pub locking_window: u64,
    /// Unix time at which principal unlocks.
    pub expiry: Timestamp,
    /// Per-mille of each penalty diverted to the fee recipient.
    pub fee_rate: u16,
    /// Steepness of share decay; 1 is linear.
    pub decay_exponent: u32,
    /// Receiver of fees and swept tokens.
    pub fee_recipient: Address,
    /// Optional second reward asset.
    pub bonus_asset: BonusAsset,
}

impl VaultParams {
    /// Fixed-width big-endian encoding of every field, in declaration
    /// order. Used as hash input for deterministic addressing.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(20 + 2 + 8 + 8 + 2 + 4 + 20 + 21);
        out.extend_from_slice(self.asset.as_bytes());
        out.extend_from_slice(&self.penalty_rate.to_be_bytes());
        out.extend_from_slice(&self.locking_window.to_be_bytes());
        out.extend_from_slice(&self.expiry.to_be_bytes());
        out.extend_from_slice(&self.fee_rate.to_be_bytes());
        out.extend_from_slice(&self.decay_exponent.to_be_bytes());
        out.extend_from_slice(self.fee_recipient.as_bytes());
        match self.bonus_asset {
            BonusAsset::Disabled => out.push(0x00),
            BonusAsset::Enabled(bonus) => {
                out.push(0x01);
                out.extend_from_slice(bonus.as_bytes());
            }
        }
        out
    }
}

/// Everything fixed at `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// The vault's parameter tuple.
    pub params: VaultParams,
    /// When `init` ran.
    pub created_at: Timestamp,
    /// `expiry - created_at`; denominator of the decay curve.
    pub total_time: u64,
    /// Receipt name, symbol, and decimals.
    pub receipt: AssetMetadata,
}

impl VaultConfig {
    /// Phase at `now`.
    pub fn phase(&self, now: Timestamp) -> Phase {
        shares::phase(now, self.params.expiry, self.params.locking_window)
    }

    /// Shares a deposit of `amount` earns at `now`.
    pub fn shares_at(&self, amount: Amount, now: Timestamp) -> Result<Amount, VaultError> {
        let time_left = self.params.expiry.saturating_sub(now);
        shares::decayed_shares(
            amount,
            time_left,
            self.total_time,
            self.params.decay_exponent,
        )
        .ok_or(VaultError::Overflow)
    }
}

/// One depositor's standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Receipt balance, 1:1 with base asset owed.
    pub principal: Amount,
    /// Decayed claim weight on the reward pools.
    pub shares: Amount,
}

/// What `quit` paid out and took away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExitReceipt {
    /// Receipts burned.
    pub burned: Amount,
    /// Base asset returned to the caller.
    pub returned: Amount,
    /// Total forfeited.
    pub penalty: Amount,
    /// Part of the penalty sent to the fee recipient.
    pub fee: Amount,
    /// Shares the caller lost.
    pub forfeited_shares: Amount,
}

/// What a redemption paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Redemption {
    /// Shares burned.
    pub shares: Amount,
    /// Base asset paid from the reward pool.
    pub reward: Amount,
    /// Bonus asset paid from the bonus pool.
    pub bonus: Amount,
}

/// What a full post-expiry settlement paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settlement {
    /// Principal returned 1:1.
    pub principal: Amount,
    /// The redemption of every share the caller held.
    pub redemption: Redemption,
}

/// Read-only snapshot of a vault, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSummary {
    /// Vault address.
    pub address: Address,
    /// Receipt name.
    pub name: String,
    /// Receipt symbol.
    pub symbol: String,
    /// Receipt decimals.
    pub decimals: u8,
    /// Phase at the time of the snapshot.
    pub phase: Phase,
    /// Parameter tuple.
    pub params: VaultParams,
    /// Decay denominator.
    pub total_time: u64,
    /// Outstanding receipts.
    pub total_supply: Amount,
    /// Outstanding shares.
    pub total_shares: Amount,
    /// Base-asset reward pool.
    pub total_reward: Amount,
    /// Bonus-asset reward pool.
    pub total_bonus_reward: Amount,
    /// Number of depositors ever seen.
    pub holders: usize,
}

// ---------------------------------------------------------------------------
// HodlVault
// ---------------------------------------------------------------------------

/// A single time-locked vault instance.
///
/// A fresh instance is a blank clone: it has an address and nothing else.
/// [`init`](Self::init) gives it parameters exactly once; every other
/// operation fails with [`VaultError::NotInitialized`] until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HodlVault {
    address: Address,
    config: Option<VaultConfig>,
    total_supply: Amount,
    total_shares: Amount,
    total_reward: Amount,
    total_bonus_reward: Amount,
    positions: HashMap<Address, Position>,
}

impl HodlVault {
    /// Creates an uninitialized vault living at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            config: None,
            total_supply: 0,
            total_shares: 0,
            total_reward: 0,
            total_bonus_reward: 0,
            positions: HashMap::new(),
        }
    }

    /// One-time initialization.
    ///
    /// Fixes the parameter tuple, records `ctx.now` as the creation time,
    /// and sets `total_time = expiry - now`.
    ///
    /// # Errors
    ///
    /// Checked in order: [`VaultError::AlreadyInitialized`],
    /// [`VaultError::InvalidAsset`], [`VaultError::InvalidPenalty`],
    /// [`VaultError::InvalidFee`], [`VaultError::InvalidExpiry`],
    /// [`VaultError::InvalidDecay`], [`VaultError::InvalidBonusToken`],
    /// [`VaultError::InvalidRecipient`].
    pub fn init(
        &mut self,
        ctx: &CallContext,
        params: VaultParams,
        receipt: AssetMetadata,
    ) -> Result<(), VaultError> {
        if self.config.is_some() {
            return Err(VaultError::AlreadyInitialized);
        }
        if params.asset.is_zero() {
            return Err(VaultError::InvalidAsset);
        }
        if params.penalty_rate > MAX_RATE {
            return Err(VaultError::InvalidPenalty(params.penalty_rate));
        }
        if params.fee_rate > MAX_RATE {
            return Err(VaultError::InvalidFee(params.fee_rate));
        }

        // The vault must outlive its locking window by at least a second,
        // or no deposit could ever be made.
        let invalid_expiry = VaultError::InvalidExpiry {
            expiry: params.expiry,
            now: ctx.now,
            locking_window: params.locking_window,
        };
        if params.locking_window > MAX_LOCKING_WINDOW_SECS {
            return Err(invalid_expiry);
        }
        let total_time = match params.expiry.checked_sub(ctx.now) {
            Some(total) if total > params.locking_window => total,
            _ => return Err(invalid_expiry),
        };

        // total_time^n bounds every time_left^n, so with it inside u128 the
        // 256-bit share product can never overflow.
        if params.decay_exponent == 0
            || Amount::from(total_time)
                .checked_pow(params.decay_exponent)
                .is_none()
        {
            return Err(VaultError::InvalidDecay(params.decay_exponent));
        }
        if let BonusAsset::Enabled(bonus) = params.bonus_asset {
            if bonus.is_zero() || bonus == params.asset {
                return Err(VaultError::InvalidBonusToken(bonus));
            }
        }
        if params.fee_recipient.is_zero() {
            return Err(VaultError::InvalidRecipient);
        }

        info!(
            vault = %self.address,
            asset = %params.asset,
            expiry = params.expiry,
            total_time,
            symbol = %receipt.symbol,
            "vault initialized"
        );
        self.config = Some(VaultConfig {
            params,
            created_at: ctx.now,
            total_time,
            receipt,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Depositor operations
    // -----------------------------------------------------------------------

    /// Locks `amount` of the base asset from the caller and credits
    /// receipts and decayed shares to `beneficiary`.
    ///
    /// The caller must have approved the vault for `amount`. Returns the
    /// shares granted.
    ///
    /// # Errors
    ///
    /// [`VaultError::Locked`] outside the Open phase;
    /// [`VaultError::Asset`] if the pull fails.
    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        ledger: &mut impl AssetLedger,
        amount: Amount,
        beneficiary: Address,
    ) -> Result<Amount, VaultError> {
        let config = self.config()?;
        let phase = config.phase(ctx.now);
        if phase != Phase::Open {
            return Err(VaultError::Locked { phase });
        }
        let asset = config.params.asset;
        let new_shares = config.shares_at(amount, ctx.now)?;

        let mut position = self.position(&beneficiary);
        position.principal = checked_add(position.principal, amount)?;
        position.shares = checked_add(position.shares, new_shares)?;
        let total_supply = checked_add(self.total_supply, amount)?;
        let total_shares = checked_add(self.total_shares, new_shares)?;

        self.settle(
            ledger,
            &[Transfer::Pull {
                asset,
                from: ctx.caller,
                spender: self.address,
                amount,
            }],
        )?;

        self.positions.insert(beneficiary, position);
        self.total_supply = total_supply;
        self.total_shares = total_shares;

        info!(
            vault = %self.address,
            caller = %ctx.caller,
            %beneficiary,
            amount,
            shares = new_shares,
            "deposit"
        );
        Ok(new_shares)
    }

    /// Early exit: burns `amount` receipts, returns them minus the
    /// penalty, and forfeits every share the caller holds.
    ///
    /// Forfeited shares leave `total_shares` and are not handed to anyone,
    /// which raises the reward per share of everyone who stays.
    ///
    /// # Errors
    ///
    /// [`VaultError::Expired`] at or after expiry;
    /// [`VaultError::InsufficientBalance`] if `amount` exceeds the
    /// caller's receipts.
    pub fn quit(
        &mut self,
        ctx: &CallContext,
        ledger: &mut impl AssetLedger,
        amount: Amount,
    ) -> Result<ExitReceipt, VaultError> {
        let config = self.config()?;
        if config.phase(ctx.now) == Phase::Expired {
            return Err(VaultError::Expired);
        }
        let params = config.params;

        let mut position = self.position(&ctx.caller);
        if position.principal < amount {
            return Err(VaultError::InsufficientBalance {
                balance: position.principal,
                amount,
            });
        }
        let split = shares::penalty_split(amount, params.penalty_rate, params.fee_rate)
            .ok_or(VaultError::Overflow)?;
        let total_reward = checked_add(self.total_reward, split.reward)?;
        let forfeited_shares = position.shares;

        self.settle(
            ledger,
            &[
                Transfer::Push {
                    asset: params.asset,
                    from: self.address,
                    to: params.fee_recipient,
                    amount: split.fee,
                },
                Transfer::Push {
                    asset: params.asset,
                    from: self.address,
                    to: ctx.caller,
                    amount: split.returned,
                },
            ],
        )?;

        position.principal -= amount;
        position.shares = 0;
        self.positions.insert(ctx.caller, position);
        self.total_supply -= amount;
        self.total_shares -= forfeited_shares;
        self.total_reward = total_reward;

        info!(
            vault = %self.address,
            caller = %ctx.caller,
            amount,
            penalty = split.penalty,
            fee = split.fee,
            forfeited_shares,
            "early exit"
        );
        Ok(ExitReceipt {
            burned: amount,
            returned: split.returned,
            penalty: split.penalty,
            fee: split.fee,
            forfeited_shares,
        })
    }

    /// Burns `shares` of the caller's shares for their pro-rata cut of both
    /// reward pools. Allowed in every phase.
    ///
    /// With no shares outstanding at all this is a no-op returning zeros.
    ///
    /// # Errors
    ///
    /// [`VaultError::InsufficientShares`] if `shares` exceeds the caller's.
    pub fn redeem(
        &mut self,
        ctx: &CallContext,
        ledger: &mut impl AssetLedger,
        shares: Amount,
    ) -> Result<Redemption, VaultError> {
        let params = self.config()?.params;
        let mut position = self.position(&ctx.caller);
        if position.shares < shares {
            return Err(VaultError::InsufficientShares {
                shares: position.shares,
                requested: shares,
            });
        }
        if self.total_shares == 0 {
            return Ok(Redemption::default());
        }

        let redemption = self.quote_redemption(&params, shares)?;
        let mut batch = vec![Transfer::Push {
            asset: params.asset,
            from: self.address,
            to: ctx.caller,
            amount: redemption.reward,
        }];
        if let BonusAsset::Enabled(bonus) = params.bonus_asset {
            batch.push(Transfer::Push {
                asset: bonus,
                from: self.address,
                to: ctx.caller,
                amount: redemption.bonus,
            });
        }
        self.settle(ledger, &batch)?;

        position.shares -= shares;
        self.positions.insert(ctx.caller, position);
        self.apply_redemption(&redemption);

        info!(
            vault = %self.address,
            caller = %ctx.caller,
            shares,
            reward = redemption.reward,
            bonus = redemption.bonus,
            "redeem"
        );
        Ok(redemption)
    }

    /// Burns `amount` receipts and returns the same amount of base asset.
    /// Shares are untouched.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotExpired`] before expiry;
    /// [`VaultError::InsufficientBalance`] if `amount` exceeds the
    /// caller's receipts.
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        ledger: &mut impl AssetLedger,
        amount: Amount,
    ) -> Result<Amount, VaultError> {
        let config = self.config()?;
        let phase = config.phase(ctx.now);
        if phase != Phase::Expired {
            return Err(VaultError::NotExpired { phase });
        }
        let asset = config.params.asset;

        let mut position = self.position(&ctx.caller);
        if position.principal < amount {
            return Err(VaultError::InsufficientBalance {
                balance: position.principal,
                amount,
            });
        }

        self.settle(
            ledger,
            &[Transfer::Push {
                asset,
                from: self.address,
                to: ctx.caller,
                amount,
            }],
        )?;

        position.principal -= amount;
        self.positions.insert(ctx.caller, position);
        self.total_supply -= amount;

        info!(vault = %self.address, caller = %ctx.caller, amount, "withdraw");
        Ok(amount)
    }

    /// Post-expiry settlement in one step: every share redeemed and every
    /// receipt withdrawn, both priced off the balances before the call.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotExpired`] before expiry.
    pub fn withdraw_all_post_expiry(
        &mut self,
        ctx: &CallContext,
        ledger: &mut impl AssetLedger,
    ) -> Result<Settlement, VaultError> {
        let config = self.config()?;
        let phase = config.phase(ctx.now);
        if phase != Phase::Expired {
            return Err(VaultError::NotExpired { phase });
        }
        let params = config.params;

        let position = self.position(&ctx.caller);
        let redemption = if self.total_shares == 0 {
            Redemption::default()
        } else {
            self.quote_redemption(&params, position.shares)?
        };
        let base_out = checked_add(position.principal, redemption.reward)?;

        let mut batch = vec![Transfer::Push {
            asset: params.asset,
            from: self.address,
            to: ctx.caller,
            amount: base_out,
        }];
        if let BonusAsset::Enabled(bonus) = params.bonus_asset {
            batch.push(Transfer::Push {
                asset: bonus,
                from: self.address,
                to: ctx.caller,
                amount: redemption.bonus,
            });
        }
        self.settle(ledger, &batch)?;

        self.positions.insert(ctx.caller, Position::default());
        self.total_supply -= position.principal;
        self.apply_redemption(&redemption);

        info!(
            vault = %self.address,
            caller = %ctx.caller,
            principal = position.principal,
            shares = redemption.shares,
            reward = redemption.reward,
            bonus = redemption.bonus,
            "withdraw all"
        );
        Ok(Settlement {
            principal: position.principal,
            redemption,
        })
    }

    /// Pulls `amount` of `asset` from the caller into the matching pool:
    /// the base asset funds the reward pool, the bonus asset (if any) the
    /// bonus pool. Allowed in every phase.
    ///
    /// # Errors
    ///
    /// [`VaultError::TokenNotAllowed`] for any other asset, including any
    /// bonus donation to a vault without a bonus pool.
    pub fn donate(
        &mut self,
        ctx: &CallContext,
        ledger: &mut impl AssetLedger,
        amount: Amount,
        asset: Address,
    ) -> Result<(), VaultError> {
        let params = self.config()?.params;
        let pull = [Transfer::Pull {
            asset,
            from: ctx.caller,
            spender: self.address,
            amount,
        }];

        if asset == params.asset {
            let total_reward = checked_add(self.total_reward, amount)?;
            self.settle(ledger, &pull)?;
            self.total_reward = total_reward;
        } else if params.bonus_asset.is(&asset) {
            let total_bonus_reward = checked_add(self.total_bonus_reward, amount)?;
            self.settle(ledger, &pull)?;
            self.total_bonus_reward = total_bonus_reward;
        } else {
            return Err(VaultError::TokenNotAllowed(asset));
        }

        info!(vault = %self.address, caller = %ctx.caller, %asset, amount, "donation");
        Ok(())
    }

    /// Sends `amount` of a stray `asset` held by the vault to the fee
    /// recipient. Anyone may call it; the base and bonus assets are off
    /// limits.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidTokenToSweep`] for the base or bonus asset.
    pub fn sweep(
        &mut self,
        ctx: &CallContext,
        ledger: &mut impl AssetLedger,
        asset: Address,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let params = self.config()?.params;
        if asset == params.asset || params.bonus_asset.is(&asset) {
            warn!(vault = %self.address, caller = %ctx.caller, %asset, "sweep of accounted asset rejected");
            return Err(VaultError::InvalidTokenToSweep(asset));
        }

        self.settle(
            ledger,
            &[Transfer::Push {
                asset,
                from: self.address,
                to: params.fee_recipient,
                amount,
            }],
        )?;

        info!(
            vault = %self.address,
            caller = %ctx.caller,
            %asset,
            amount,
            to = %params.fee_recipient,
            "sweep"
        );
        Ok(())
    }

    /// Receipts are bookkeeping, not tokens. Always fails.
    pub fn transfer(&self, _ctx: &CallContext, _to: Address, _amount: Amount) -> Result<(), VaultError> {
        Err(VaultError::TransferDisabled)
    }

    /// Receipts are bookkeeping, not tokens. Always fails.
    pub fn transfer_from(
        &self,
        _ctx: &CallContext,
        _from: Address,
        _to: Address,
        _amount: Amount,
    ) -> Result<(), VaultError> {
        Err(VaultError::TransferDisabled)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// The vault's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// `true` once `init` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// Parameters fixed at init.
    pub fn config(&self) -> Result<&VaultConfig, VaultError> {
        self.config.as_ref().ok_or(VaultError::NotInitialized)
    }

    /// Phase at `now`.
    pub fn phase(&self, now: Timestamp) -> Result<Phase, VaultError> {
        Ok(self.config()?.phase(now))
    }

    /// Shares a deposit of `amount` would earn at `now`. Matches what
    /// [`deposit`](Self::deposit) grants at the same instant; zero at or
    /// after expiry.
    pub fn calculate_shares(&self, amount: Amount, now: Timestamp) -> Result<Amount, VaultError> {
        let shares = self.config()?.shares_at(amount, now)?;
        debug!(vault = %self.address, amount, now, shares, "share preview");
        Ok(shares)
    }

    /// Base-asset reward `shares` would redeem for right now.
    pub fn reward_from_shares(&self, shares: Amount) -> Result<Amount, VaultError> {
        self.config()?;
        shares::pro_rata(self.total_reward, shares, self.total_shares).ok_or(VaultError::Overflow)
    }

    /// Bonus-asset reward `shares` would redeem for right now. Zero without
    /// a bonus pool.
    pub fn bonus_from_shares(&self, shares: Amount) -> Result<Amount, VaultError> {
        if self.config()?.params.bonus_asset == BonusAsset::Disabled {
            return Ok(0);
        }
        shares::pro_rata(self.total_bonus_reward, shares, self.total_shares)
            .ok_or(VaultError::Overflow)
    }

    /// Receipt balance of `holder`.
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.position(holder).principal
    }

    /// Share balance of `holder`.
    pub fn shares_of(&self, holder: &Address) -> Amount {
        self.position(holder).shares
    }

    /// Outstanding receipts.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Outstanding shares.
    pub fn total_shares(&self) -> Amount {
        self.total_shares
    }

    /// Base-asset reward pool.
    pub fn total_reward(&self) -> Amount {
        self.total_reward
    }

    /// Bonus-asset reward pool.
    pub fn total_bonus_reward(&self) -> Amount {
        self.total_bonus_reward
    }

    /// Unix time at which principal unlocks.
    pub fn expiry(&self) -> Result<Timestamp, VaultError> {
        Ok(self.config()?.params.expiry)
    }

    /// Lifetime of the vault from init to expiry.
    pub fn total_time(&self) -> Result<u64, VaultError> {
        Ok(self.config()?.total_time)
    }

    /// Receipt name.
    pub fn name(&self) -> Result<&str, VaultError> {
        Ok(&self.config()?.receipt.name)
    }

    /// Receipt symbol.
    pub fn symbol(&self) -> Result<&str, VaultError> {
        Ok(&self.config()?.receipt.symbol)
    }

    /// Receipt decimals.
    pub fn decimals(&self) -> u8 {
        self.config
            .as_ref()
            .map(|c| c.receipt.decimals)
            .unwrap_or(DEFAULT_DECIMALS)
    }

    /// Every depositor and their position.
    pub fn positions(&self) -> impl Iterator<Item = (&Address, &Position)> {
        self.positions.iter()
    }

    /// Display snapshot at `now`.
    pub fn summary(&self, now: Timestamp) -> Result<VaultSummary, VaultError> {
        let config = self.config()?;
        Ok(VaultSummary {
            address: self.address,
            name: config.receipt.name.clone(),
            symbol: config.receipt.symbol.clone(),
            decimals: config.receipt.decimals,
            phase: config.phase(now),
            params: config.params,
            total_time: config.total_time,
            total_supply: self.total_supply,
            total_shares: self.total_shares,
            total_reward: self.total_reward,
            total_bonus_reward: self.total_bonus_reward,
            holders: self.positions.len(),
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn position(&self, holder: &Address) -> Position {
        self.positions.get(holder).copied().unwrap_or_default()
    }

    /// Prices a redemption of `shares` against the current pools. Caller
    /// guarantees `total_shares > 0`.
    fn quote_redemption(&self, params: &VaultParams, shares: Amount) -> Result<Redemption, VaultError> {
        let reward = shares::pro_rata(self.total_reward, shares, self.total_shares)
            .ok_or(VaultError::Overflow)?;
        let bonus = match params.bonus_asset {
            BonusAsset::Disabled => 0,
            BonusAsset::Enabled(_) => {
                shares::pro_rata(self.total_bonus_reward, shares, self.total_shares)
                    .ok_or(VaultError::Overflow)?
            }
        };
        Ok(Redemption {
            shares,
            reward,
            bonus,
        })
    }

    fn apply_redemption(&mut self, redemption: &Redemption) {
        self.total_shares -= redemption.shares;
        self.total_reward -= redemption.reward;
        self.total_bonus_reward -= redemption.bonus;
    }

    /// Submits the non-zero transfers of `batch` to the ledger in one go.
    fn settle(&self, ledger: &mut impl AssetLedger, batch: &[Transfer]) -> Result<(), VaultError> {
        let batch: Vec<Transfer> = batch.iter().copied().filter(|t| t.amount() > 0).collect();
        if batch.is_empty() {
            return Ok(());
        }
        ledger.settle(&batch).map_err(|err| {
            let assets: Vec<String> = batch.iter().map(|t| t.asset().to_string()).collect();
            warn!(
                vault = %self.address,
                assets = ?assets,
                error = %err,
                "settlement rejected"
            );
            VaultError::from(err)
        })
    }
}

fn checked_add(a: Amount, b: Amount) -> Result<Amount, VaultError> {
    a.checked_add(b).ok_or(VaultError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hodl_protocol::InMemoryLedger;

    const DAY: u64 = 86_400;
    const START: Timestamp = 1_800_000_000;

    fn weth() -> Address {
        Address::from_label("weth")
    }

    fn fee_recipient() -> Address {
        Address::from_label("fee-recipient")
    }

    fn params() -> VaultParams {
        VaultParams {
            asset: weth(),
            penalty_rate: 50,
            locking_window: DAY,
            expiry: START + 3 * DAY,
            fee_rate: 50,
            decay_exponent: 1,
            fee_recipient: fee_recipient(),
            bonus_asset: BonusAsset::Disabled,
        }
    }

    fn receipt() -> AssetMetadata {
        AssetMetadata::new("hodl WETH", "hWETH", 18)
    }

    fn ctx() -> CallContext {
        CallContext::new(Address::from_label("deployer"), START)
    }

    fn init_with(params: VaultParams) -> Result<HodlVault, VaultError> {
        let mut vault = HodlVault::new(Address::from_label("vault"));
        vault.init(&ctx(), params, receipt())?;
        Ok(vault)
    }

    #[test]
    fn init_sets_total_time_and_metadata() {
        let vault = init_with(params()).unwrap();
        assert_eq!(vault.total_time().unwrap(), 3 * DAY);
        assert_eq!(vault.expiry().unwrap(), START + 3 * DAY);
        assert_eq!(vault.name().unwrap(), "hodl WETH");
        assert_eq!(vault.symbol().unwrap(), "hWETH");
        assert_eq!(vault.decimals(), 18);
        assert_eq!(vault.total_supply(), 0);
        assert_eq!(vault.total_reward(), 0);
        assert_eq!(vault.total_bonus_reward(), 0);
    }

    #[test]
    fn init_validation_codes() {
        let cases = [
            (VaultParams { asset: Address::ZERO, ..params() }, "INVALID_ASSET"),
            (VaultParams { penalty_rate: 1_001, ..params() }, "INVALID_PENALTY"),
            (VaultParams { fee_rate: 1_001, ..params() }, "INVALID_FEE"),
            (VaultParams { expiry: START + 3 * DAY - 30 * DAY, ..params() }, "INVALID_EXPIRY"),
            (VaultParams { locking_window: 31 * DAY, ..params() }, "INVALID_EXPIRY"),
            (VaultParams { decay_exponent: 0, ..params() }, "INVALID_DECAY"),
            (VaultParams { decay_exponent: 64, ..params() }, "INVALID_DECAY"),
            (VaultParams { bonus_asset: BonusAsset::Enabled(weth()), ..params() }, "INVALID_BONUS_TOKEN"),
            (VaultParams { bonus_asset: BonusAsset::Enabled(Address::ZERO), ..params() }, "INVALID_BONUS_TOKEN"),
            (VaultParams { fee_recipient: Address::ZERO, ..params() }, "INVALID_RECIPIENT"),
        ];
        for (bad, code) in cases {
            let err = init_with(bad).unwrap_err();
            assert_eq!(err.code(), code, "{bad:?}");
        }
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let exact = VaultParams { expiry: START + DAY, ..params() };
        assert_eq!(init_with(exact).unwrap_err().code(), "INVALID_EXPIRY");

        let one_more = VaultParams { expiry: START + DAY + 1, ..params() };
        assert!(init_with(one_more).is_ok());
    }

    #[test]
    fn reinit_rejected() {
        let mut vault = init_with(params()).unwrap();
        let err = vault.init(&ctx(), params(), receipt()).unwrap_err();
        assert_eq!(err, VaultError::AlreadyInitialized);
    }

    #[test]
    fn uninitialized_vault_rejects_operations() {
        let mut vault = HodlVault::new(Address::from_label("vault"));
        let mut ledger = InMemoryLedger::new();
        assert_eq!(
            vault.deposit(&ctx(), &mut ledger, 1, ctx().caller),
            Err(VaultError::NotInitialized)
        );
        assert_eq!(vault.calculate_shares(1, START), Err(VaultError::NotInitialized));
        assert!(!vault.is_initialized());
    }

    #[test]
    fn bonus_asset_from_zero_address_is_disabled() {
        assert_eq!(BonusAsset::from_address(Address::ZERO), BonusAsset::Disabled);
        let bonus = Address::from_label("bonus");
        assert_eq!(BonusAsset::from_address(bonus), BonusAsset::Enabled(bonus));
        assert!(BonusAsset::Enabled(bonus).is(&bonus));
        assert!(!BonusAsset::Disabled.is(&Address::ZERO));
    }

    #[test]
    fn canonical_bytes_distinguish_bonus_configuration() {
        let plain = params();
        let bonus = VaultParams {
            bonus_asset: BonusAsset::Enabled(Address::from_label("bonus")),
            ..params()
        };
        assert_ne!(plain.canonical_bytes(), bonus.canonical_bytes());
        assert_eq!(plain.canonical_bytes().len(), 20 + 2 + 8 + 8 + 2 + 4 + 20 + 1);
    }

    #[test]
    fn calculate_shares_is_zero_after_expiry() {
        let vault = init_with(params()).unwrap();
        assert_eq!(vault.calculate_shares(1_000, START + 3 * DAY), Ok(0));
        assert_eq!(vault.calculate_shares(1_000, START), Ok(1_000));
    }

    #[test]
    fn transfers_always_fail() {
        let vault = init_with(params()).unwrap();
        let to = Address::from_label("bob");
        assert_eq!(vault.transfer(&ctx(), to, 1).unwrap_err().code(), "!TRANSFER");
        assert_eq!(
            vault.transfer_from(&ctx(), ctx().caller, to, 1).unwrap_err().code(),
            "!TRANSFER"
        );
    }

    #[test]
    fn vault_state_survives_json() {
        let vault = init_with(params()).unwrap();
        let json = serde_json::to_string(&vault).unwrap();
        let back: HodlVault = serde_json::from_str(&json).unwrap();
        assert_eq!(back.config().unwrap(), vault.config().unwrap());
    }
}
