//! # Vault Factory
//!
//! The registry that deploys [`HodlVault`] instances. It deploys exactly one
//! vault per parameter tuple, and each vault gets an address anyone can
//! compute in advance.
//!
//! ## Addressing
//!
//! A vault's address is a content hash of what it is:
//!
//! ```text
//! address = BLAKE3-derive-key(CLONE_ADDRESS_CONTEXT,
//!                             implementation || registry || canonical(params))[..20]
//! ```
//!
//! so [`VaultRegistry::get_target_address`] answers without deploying, and
//! two registries (or two templates) never collide.
//!
//! ## Gating
//!
//! - Only whitelisted assets may back a vault. A configured bonus asset must
//!   be whitelisted too.
//! - The whitelist belongs to the registry owner.
//! - A tuple that was already deployed fails `CREATED`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use hodl_protocol::config::{
    CLONE_ADDRESS_CONTEXT, DEFAULT_DECIMALS, RECEIPT_NAME_PREFIX, RECEIPT_SYMBOL_PREFIX,
};
use hodl_protocol::crypto::domain_separated_hash_multi;
use hodl_protocol::{Address, AssetLedger, AssetMetadata, CallContext};

use crate::hodl_vault::{BonusAsset, HodlVault, VaultError, VaultParams};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The implementation template is the zero address.
    #[error("invalid implementation: template cannot be the zero address")]
    InvalidImplementation,

    /// Ownership handed to the zero address.
    #[error("invalid owner: cannot be the zero address")]
    InvalidOwner,

    /// An owner-only operation called by someone else.
    #[error("unauthorized: {caller} is not the registry owner")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
    },

    /// The base or bonus asset is not on the whitelist.
    #[error("asset {0} is not whitelisted")]
    NotWhitelisted(Address),

    /// A vault with the same parameters already exists.
    #[error("vault already created at {0}")]
    AlreadyCreated(Address),

    /// The referenced vault was not deployed by this registry.
    #[error("unknown vault {0}")]
    UnknownVault(Address),

    /// The new vault rejected its parameters.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl RegistryError {
    /// Stable reason code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::InvalidImplementation => "INVALID_IMPL",
            RegistryError::InvalidOwner => "INVALID_OWNER",
            RegistryError::Unauthorized { .. } => "UNAUTHORIZED",
            RegistryError::NotWhitelisted(_) => "NOT_WHITELISTED",
            RegistryError::AlreadyCreated(_) => "CREATED",
            RegistryError::UnknownVault(_) => "UNKNOWN_VAULT",
            RegistryError::Vault(err) => err.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Address a vault with `params` gets when `deployer` clones
/// `implementation`.
pub fn derive_clone_address(
    implementation: &Address,
    deployer: &Address,
    params: &VaultParams,
) -> Address {
    let canonical = params.canonical_bytes();
    let digest = domain_separated_hash_multi(
        CLONE_ADDRESS_CONTEXT,
        &[implementation.as_bytes(), deployer.as_bytes(), &canonical],
    );
    Address::from_digest(&digest)
}

/// Receipt name, symbol, and decimals for a vault over `asset`.
///
/// `"Hodl {name}"` / `"h{symbol}"` from the asset's metadata. Assets the
/// ledger does not describe fall back to their address and 18 decimals.
pub fn receipt_metadata(ledger: &impl AssetLedger, asset: &Address) -> AssetMetadata {
    match ledger.metadata(asset) {
        Some(meta) => AssetMetadata::new(
            format!("{RECEIPT_NAME_PREFIX}{}", meta.name),
            format!("{RECEIPT_SYMBOL_PREFIX}{}", meta.symbol),
            meta.decimals,
        ),
        None => AssetMetadata::new(
            format!("{RECEIPT_NAME_PREFIX}{asset}"),
            format!("{RECEIPT_SYMBOL_PREFIX}{asset}"),
            DEFAULT_DECIMALS,
        ),
    }
}

// ---------------------------------------------------------------------------
// VaultRegistry
// ---------------------------------------------------------------------------

/// Deploys and owns vault instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRegistry {
    address: Address,
    implementation: Address,
    owner: Address,
    whitelist: HashSet<Address>,
    #[serde(with = "crate::serde_entries")]
    deployed: HashMap<VaultParams, Address>,
    vaults: HashMap<Address, HodlVault>,
}

impl VaultRegistry {
    /// Creates a registry living at `address`, cloning `implementation`,
    /// owned by `owner`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidImplementation`] for a zero template;
    /// [`RegistryError::InvalidOwner`] for a zero owner.
    pub fn new(
        implementation: Address,
        owner: Address,
        address: Address,
    ) -> Result<Self, RegistryError> {
        if implementation.is_zero() {
            return Err(RegistryError::InvalidImplementation);
        }
        if owner.is_zero() {
            return Err(RegistryError::InvalidOwner);
        }
        info!(registry = %address, %implementation, %owner, "registry created");
        Ok(Self {
            address,
            implementation,
            owner,
            whitelist: HashSet::new(),
            deployed: HashMap::new(),
            vaults: HashMap::new(),
        })
    }

    /// Adds `asset` to the whitelist, or removes it when `allowed` is false.
    /// Owner only.
    pub fn whitelist_asset(
        &mut self,
        ctx: &CallContext,
        asset: Address,
        allowed: bool,
    ) -> Result<(), RegistryError> {
        self.ensure_owner(ctx)?;
        if allowed {
            self.whitelist.insert(asset);
        } else {
            self.whitelist.remove(&asset);
        }
        info!(registry = %self.address, %asset, allowed, "whitelist updated");
        Ok(())
    }

    /// Hands the registry to `new_owner`. Owner only.
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        self.ensure_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(RegistryError::InvalidOwner);
        }
        info!(registry = %self.address, from = %self.owner, to = %new_owner, "ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    /// Where a vault with `params` lives, or would live once created.
    pub fn get_target_address(&self, params: &VaultParams) -> Address {
        let target = derive_clone_address(&self.implementation, &self.address, params);
        debug!(registry = %self.address, %target, "target address derived");
        target
    }

    /// Address of the vault deployed for `params`, or the zero address.
    pub fn get_created_vault(&self, params: &VaultParams) -> Address {
        self.deployed.get(params).copied().unwrap_or(Address::ZERO)
    }

    /// Deploys and initializes the vault for `params`. Anyone may call.
    ///
    /// Receipt metadata is derived from the base asset's metadata on
    /// `ledger`. Returns the new vault's address.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotWhitelisted`] for a base or bonus asset off the
    /// whitelist; [`RegistryError::AlreadyCreated`] for a known tuple; any
    /// [`VaultError`] from `init`. Nothing is recorded on failure.
    pub fn create_vault(
        &mut self,
        ctx: &CallContext,
        ledger: &impl AssetLedger,
        params: VaultParams,
    ) -> Result<Address, RegistryError> {
        if !self.is_whitelisted(&params.asset) {
            return Err(RegistryError::NotWhitelisted(params.asset));
        }
        if let BonusAsset::Enabled(bonus) = params.bonus_asset {
            if !self.is_whitelisted(&bonus) {
                return Err(RegistryError::NotWhitelisted(bonus));
            }
        }
        if let Some(existing) = self.deployed.get(&params) {
            return Err(RegistryError::AlreadyCreated(*existing));
        }

        let target = self.get_target_address(&params);
        let mut vault = HodlVault::new(target);
        vault.init(ctx, params, receipt_metadata(ledger, &params.asset))?;

        self.deployed.insert(params, target);
        self.vaults.insert(target, vault);
        info!(
            registry = %self.address,
            vault = %target,
            caller = %ctx.caller,
            asset = %params.asset,
            "vault created"
        );
        Ok(target)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The registry's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The template every vault is cloned from.
    pub fn implementation(&self) -> Address {
        self.implementation
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_whitelisted(&self, asset: &Address) -> bool {
        self.whitelist.contains(asset)
    }

    pub fn vault(&self, address: &Address) -> Option<&HodlVault> {
        self.vaults.get(address)
    }

    pub fn vault_mut(&mut self, address: &Address) -> Option<&mut HodlVault> {
        self.vaults.get_mut(address)
    }

    /// Like [`vault_mut`](Self::vault_mut), but an unknown address is an
    /// error.
    pub fn require_vault_mut(&mut self, address: &Address) -> Result<&mut HodlVault, RegistryError> {
        self.vaults
            .get_mut(address)
            .ok_or(RegistryError::UnknownVault(*address))
    }

    pub fn vault_count(&self) -> usize {
        self.vaults.len()
    }

    /// Every deployed vault address.
    pub fn vault_addresses(&self) -> impl Iterator<Item = &Address> {
        self.vaults.keys()
    }

    fn ensure_owner(&self, ctx: &CallContext) -> Result<(), RegistryError> {
        if ctx.caller != self.owner {
            return Err(RegistryError::Unauthorized { caller: ctx.caller });
        }
        Ok(())
    }
}
