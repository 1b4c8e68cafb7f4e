//! Integration tests for the vault registry.
//!
//! Covers whitelist gating, deterministic addressing, create-once semantics,
//! and driving a registry-deployed vault through the ledger.

use hodl_contracts::hodl_vault::{BonusAsset, VaultParams};
use hodl_contracts::vault_factory::{RegistryError, VaultRegistry};
use hodl_protocol::{Address, AssetMetadata, CallContext, InMemoryLedger, Timestamp};

const DAY: u64 = 86_400;
const START: Timestamp = 1_800_000_000;

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn owner_ctx() -> CallContext {
    CallContext::new(addr("owner"), START)
}

fn setup() -> (VaultRegistry, InMemoryLedger) {
    let registry = VaultRegistry::new(addr("hodl-template"), addr("owner"), addr("registry")).unwrap();
    let mut ledger = InMemoryLedger::new();
    ledger
        .register(addr("weth"), AssetMetadata::new("Wrapped Ether", "WETH", 18))
        .unwrap();
    ledger
        .register(addr("cool"), AssetMetadata::new("COOL", "COOL", 6))
        .unwrap();
    (registry, ledger)
}

fn params(bonus_asset: BonusAsset) -> VaultParams {
    VaultParams {
        asset: addr("weth"),
        penalty_rate: 50,
        locking_window: DAY,
        expiry: START + 5 * DAY,
        fee_rate: 50,
        decay_exponent: 1,
        fee_recipient: addr("creator"),
        bonus_asset,
    }
}

#[test]
fn create_requires_whitelisted_asset() {
    let (mut registry, ledger) = setup();
    let ctx = CallContext::new(addr("creator"), START);
    let err = registry
        .create_vault(&ctx, &ledger, params(BonusAsset::Disabled))
        .unwrap_err();
    assert_eq!(err, RegistryError::NotWhitelisted(addr("weth")));
    assert_eq!(registry.vault_count(), 0);
}

#[test]
fn non_owner_cannot_whitelist() {
    let (mut registry, _) = setup();
    let ctx = CallContext::new(addr("random"), START);
    let err = registry.whitelist_asset(&ctx, addr("weth"), true).unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED");
}

#[test]
fn created_vault_lands_on_target_address() {
    let (mut registry, ledger) = setup();
    registry.whitelist_asset(&owner_ctx(), addr("weth"), true).unwrap();
    let p = params(BonusAsset::Disabled);

    let target = registry.get_target_address(&p);
    assert_eq!(registry.get_created_vault(&p), Address::ZERO);

    let ctx = CallContext::new(addr("creator"), START);
    let created = registry.create_vault(&ctx, &ledger, p).unwrap();

    assert_eq!(created, target);
    assert_eq!(registry.get_created_vault(&p), target);
    assert_eq!(registry.get_target_address(&p), target);
    assert_eq!(registry.vault_count(), 1);

    let vault = registry.vault(&created).unwrap();
    assert_eq!(vault.address(), created);
    assert_eq!(vault.name().unwrap(), "Hodl Wrapped Ether");
    assert_eq!(vault.symbol().unwrap(), "hWETH");
    assert_eq!(vault.decimals(), 18);
    assert_eq!(vault.total_time().unwrap(), 5 * DAY);
}

#[test]
fn same_params_cannot_be_created_twice() {
    let (mut registry, ledger) = setup();
    registry.whitelist_asset(&owner_ctx(), addr("weth"), true).unwrap();
    let p = params(BonusAsset::Disabled);
    let ctx = CallContext::new(addr("creator"), START);
    let first = registry.create_vault(&ctx, &ledger, p).unwrap();

    let err = registry
        .create_vault(&ctx.at(START + 60), &ledger, p)
        .unwrap_err();
    assert_eq!(err, RegistryError::AlreadyCreated(first));
    assert_eq!(err.code(), "CREATED");
    assert_eq!(registry.vault_count(), 1);
}

#[test]
fn bonus_asset_must_be_whitelisted() {
    let (mut registry, ledger) = setup();
    registry.whitelist_asset(&owner_ctx(), addr("weth"), true).unwrap();
    let p = params(BonusAsset::Enabled(addr("cool")));
    let ctx = CallContext::new(addr("creator"), START);

    let err = registry.create_vault(&ctx, &ledger, p).unwrap_err();
    assert_eq!(err, RegistryError::NotWhitelisted(addr("cool")));

    registry.whitelist_asset(&owner_ctx(), addr("cool"), true).unwrap();
    assert!(registry.create_vault(&ctx, &ledger, p).is_ok());
}

#[test]
fn bonus_configuration_changes_address() {
    let (registry, _) = setup();
    let plain = registry.get_target_address(&params(BonusAsset::Disabled));
    let with_bonus = registry.get_target_address(&params(BonusAsset::Enabled(addr("cool"))));
    assert_ne!(plain, with_bonus);
}

#[test]
fn registries_at_different_addresses_derive_different_targets() {
    let a = VaultRegistry::new(addr("hodl-template"), addr("owner"), addr("registry-a")).unwrap();
    let b = VaultRegistry::new(addr("hodl-template"), addr("owner"), addr("registry-b")).unwrap();
    let p = params(BonusAsset::Disabled);
    assert_ne!(a.get_target_address(&p), b.get_target_address(&p));
}

#[test]
fn init_errors_propagate_and_record_nothing() {
    let (mut registry, ledger) = setup();
    registry.whitelist_asset(&owner_ctx(), addr("weth"), true).unwrap();
    let p = VaultParams {
        penalty_rate: 1_001,
        ..params(BonusAsset::Disabled)
    };
    let ctx = CallContext::new(addr("creator"), START);

    let err = registry.create_vault(&ctx, &ledger, p).unwrap_err();
    assert_eq!(err.code(), "INVALID_PENALTY");
    assert_eq!(registry.get_created_vault(&p), Address::ZERO);
    assert_eq!(registry.vault_count(), 0);
}

#[test]
fn delisted_asset_blocks_new_vaults() {
    let (mut registry, ledger) = setup();
    registry.whitelist_asset(&owner_ctx(), addr("weth"), true).unwrap();
    registry.whitelist_asset(&owner_ctx(), addr("weth"), false).unwrap();
    let ctx = CallContext::new(addr("creator"), START);
    assert!(registry
        .create_vault(&ctx, &ledger, params(BonusAsset::Disabled))
        .is_err());
}

#[test]
fn registry_vault_accepts_deposits() {
    let (mut registry, mut ledger) = setup();
    registry.whitelist_asset(&owner_ctx(), addr("weth"), true).unwrap();
    let ctx = CallContext::new(addr("alice"), START);
    let vault_addr = registry
        .create_vault(&ctx, &ledger, params(BonusAsset::Disabled))
        .unwrap();

    ledger.mint(&addr("weth"), &addr("alice"), 1_000).unwrap();
    ledger
        .approve(&addr("weth"), &addr("alice"), &vault_addr, 1_000)
        .unwrap();

    let vault = registry.require_vault_mut(&vault_addr).unwrap();
    let shares = vault.deposit(&ctx, &mut ledger, 1_000, ctx.caller).unwrap();

    assert_eq!(shares, 1_000);
    assert_eq!(registry.vault(&vault_addr).unwrap().total_supply(), 1_000);
    assert_eq!(
        registry.require_vault_mut(&addr("nowhere")).unwrap_err().code(),
        "UNKNOWN_VAULT"
    );
}
