//! # Command Execution
//!
//! Runs one parsed [`HodlCli`] invocation against the world file and
//! returns the JSON value to print. Contract errors surface with their
//! reason code in brackets, e.g. `[LOCKED] vault is locked ...`.

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

use hodl_contracts::hodl_vault::{HodlVault, VaultError, VaultParams};
use hodl_contracts::vault_factory::{RegistryError, VaultRegistry};
use hodl_protocol::{
    Address, AssetLedger, AssetMetadata, CallContext, Clock, ManualClock, SystemClock, Timestamp,
};

use crate::cli::{AssetCommand, Commands, HodlCli, InitArgs};
use crate::world::World;

/// Executes `cli` and returns its result.
pub fn execute(cli: &HodlCli) -> Result<Value> {
    let clock: Box<dyn Clock> = match cli.now {
        Some(now) => Box::new(ManualClock::new(now)),
        None => Box::new(SystemClock),
    };
    let now = clock.now();

    match &cli.command {
        Commands::Version => return Ok(version()),
        Commands::Init(args) => return init_world(cli, args),
        _ => {}
    }

    let mut world = World::load(&cli.state)?;
    let output = dispatch(&mut world, cli, now)?;
    if cli.command.mutates() {
        world.save(&cli.state)?;
    }
    Ok(output)
}

fn version() -> Value {
    json!({
        "hodl-cli": env!("CARGO_PKG_VERSION"),
        "protocol": hodl_protocol::config::PROTOCOL_VERSION,
    })
}

fn init_world(cli: &HodlCli, args: &InitArgs) -> Result<Value> {
    if cli.state.exists() && !args.force {
        bail!(
            "world file {} already exists; pass --force to overwrite",
            cli.state.display()
        );
    }
    let registry =
        VaultRegistry::new(args.implementation, args.owner, args.registry).map_err(registry_err)?;
    let mut world = World::new(registry);
    world.save(&cli.state)?;
    tracing::info!(state = %cli.state.display(), owner = %args.owner, "world initialized");
    Ok(json!({
        "state": cli.state.display().to_string(),
        "registry": args.registry,
        "implementation": args.implementation,
        "owner": args.owner,
    }))
}

fn dispatch(world: &mut World, cli: &HodlCli, now: Timestamp) -> Result<Value> {
    let World {
        ledger, registry, ..
    } = world;

    match &cli.command {
        Commands::Init(_) | Commands::Version => Err(anyhow!("handled before loading the world")),

        Commands::Asset(cmd) => match cmd {
            AssetCommand::Register {
                asset,
                name,
                symbol,
                decimals,
            } => {
                ledger.register(*asset, AssetMetadata::new(name.as_str(), symbol.as_str(), *decimals))?;
                Ok(json!({ "asset": asset, "name": name, "symbol": symbol, "decimals": decimals }))
            }
            AssetCommand::Mint { asset, to, amount } => {
                ledger.mint(asset, to, *amount)?;
                Ok(json!({
                    "asset": asset,
                    "to": to,
                    "minted": amount.to_string(),
                    "balance": ledger.balance_of(asset, to).to_string(),
                }))
            }
            AssetCommand::Approve {
                asset,
                spender,
                amount,
            } => {
                let ctx = context(cli, now)?;
                ledger.approve(asset, &ctx.caller, spender, *amount)?;
                Ok(json!({
                    "asset": asset,
                    "owner": ctx.caller,
                    "spender": spender,
                    "allowance": amount.to_string(),
                }))
            }
            AssetCommand::Balance { asset, holder } => Ok(json!({
                "asset": asset,
                "holder": holder,
                "balance": ledger.balance_of(asset, holder).to_string(),
            })),
        },

        Commands::Whitelist { asset, disallow } => {
            let ctx = context(cli, now)?;
            registry
                .whitelist_asset(&ctx, *asset, !disallow)
                .map_err(registry_err)?;
            Ok(json!({ "asset": asset, "whitelisted": !disallow }))
        }

        Commands::Target(args) => {
            let params = VaultParams::from(args);
            Ok(json!({
                "target": registry.get_target_address(&params),
                "created": registry.get_created_vault(&params),
            }))
        }

        Commands::Create(args) => {
            let ctx = context(cli, now)?;
            let params = VaultParams::from(args);
            let address = registry
                .create_vault(&ctx, &*ledger, params)
                .map_err(registry_err)?;
            let vault = registry
                .vault(&address)
                .ok_or_else(|| anyhow!("vault {address} missing after creation"))?;
            Ok(json!({
                "vault": address,
                "name": vault.name().map_err(vault_err)?,
                "symbol": vault.symbol().map_err(vault_err)?,
            }))
        }

        Commands::Deposit {
            vault,
            amount,
            beneficiary,
        } => {
            let ctx = context(cli, now)?;
            let beneficiary = beneficiary.unwrap_or(ctx.caller);
            let shares = vault_mut(registry, vault)?
                .deposit(&ctx, ledger, *amount, beneficiary)
                .map_err(vault_err)?;
            Ok(json!({
                "vault": vault,
                "beneficiary": beneficiary,
                "deposited": amount.to_string(),
                "shares": shares.to_string(),
            }))
        }

        Commands::Quit { vault, amount } => {
            let ctx = context(cli, now)?;
            let exit = vault_mut(registry, vault)?
                .quit(&ctx, ledger, *amount)
                .map_err(vault_err)?;
            Ok(json!({
                "vault": vault,
                "burned": exit.burned.to_string(),
                "returned": exit.returned.to_string(),
                "penalty": exit.penalty.to_string(),
                "fee": exit.fee.to_string(),
                "forfeited_shares": exit.forfeited_shares.to_string(),
            }))
        }

        Commands::Redeem { vault, shares } => {
            let ctx = context(cli, now)?;
            let out = vault_mut(registry, vault)?
                .redeem(&ctx, ledger, *shares)
                .map_err(vault_err)?;
            Ok(json!({
                "vault": vault,
                "shares": out.shares.to_string(),
                "reward": out.reward.to_string(),
                "bonus": out.bonus.to_string(),
            }))
        }

        Commands::Withdraw { vault, amount } => {
            let ctx = context(cli, now)?;
            let withdrawn = vault_mut(registry, vault)?
                .withdraw(&ctx, ledger, *amount)
                .map_err(vault_err)?;
            Ok(json!({ "vault": vault, "withdrawn": withdrawn.to_string() }))
        }

        Commands::WithdrawAll { vault } => {
            let ctx = context(cli, now)?;
            let settlement = vault_mut(registry, vault)?
                .withdraw_all_post_expiry(&ctx, ledger)
                .map_err(vault_err)?;
            Ok(json!({
                "vault": vault,
                "principal": settlement.principal.to_string(),
                "shares": settlement.redemption.shares.to_string(),
                "reward": settlement.redemption.reward.to_string(),
                "bonus": settlement.redemption.bonus.to_string(),
            }))
        }

        Commands::Donate {
            vault,
            asset,
            amount,
        } => {
            let ctx = context(cli, now)?;
            let target = vault_mut(registry, vault)?;
            target
                .donate(&ctx, ledger, *amount, *asset)
                .map_err(vault_err)?;
            Ok(json!({
                "vault": vault,
                "asset": asset,
                "donated": amount.to_string(),
                "total_reward": target.total_reward().to_string(),
                "total_bonus_reward": target.total_bonus_reward().to_string(),
            }))
        }

        Commands::Sweep {
            vault,
            asset,
            amount,
        } => {
            let ctx = context(cli, now)?;
            vault_mut(registry, vault)?
                .sweep(&ctx, ledger, *asset, *amount)
                .map_err(vault_err)?;
            Ok(json!({ "vault": vault, "asset": asset, "swept": amount.to_string() }))
        }

        Commands::Status { vault, holder } => match vault {
            Some(address) => {
                let vault = registry
                    .vault(address)
                    .ok_or_else(|| registry_err(RegistryError::UnknownVault(*address)))?;
                vault_status(vault, holder.as_ref(), now)
            }
            None => {
                let mut addresses: Vec<Address> = registry.vault_addresses().copied().collect();
                addresses.sort();
                let vaults = addresses
                    .iter()
                    .filter_map(|address| registry.vault(address))
                    .map(|vault| vault_status(vault, holder.as_ref(), now))
                    .collect::<Result<Vec<_>>>()?;
                Ok(json!({
                    "registry": registry.address(),
                    "owner": registry.owner(),
                    "now": now,
                    "vaults": vaults,
                }))
            }
        },
    }
}

/// Amounts are printed as decimal strings; JSON numbers cannot hold `u128`.
fn vault_status(vault: &HodlVault, holder: Option<&Address>, now: Timestamp) -> Result<Value> {
    let summary = vault.summary(now).map_err(vault_err)?;
    let mut value = json!({
        "address": summary.address,
        "name": summary.name,
        "symbol": summary.symbol,
        "decimals": summary.decimals,
        "phase": summary.phase,
        "params": summary.params,
        "total_time": summary.total_time,
        "total_supply": summary.total_supply.to_string(),
        "total_shares": summary.total_shares.to_string(),
        "total_reward": summary.total_reward.to_string(),
        "total_bonus_reward": summary.total_bonus_reward.to_string(),
        "holders": summary.holders,
    });

    if let Some(holder) = holder {
        let shares = vault.shares_of(holder);
        value["position"] = json!({
            "holder": holder,
            "principal": vault.balance_of(holder).to_string(),
            "shares": shares.to_string(),
            "reward": vault.reward_from_shares(shares).map_err(vault_err)?.to_string(),
            "bonus": vault.bonus_from_shares(shares).map_err(vault_err)?.to_string(),
        });
    }
    Ok(value)
}

fn context(cli: &HodlCli, now: Timestamp) -> Result<CallContext> {
    let caller = cli
        .caller
        .ok_or_else(|| anyhow!("this command needs a caller; pass --caller or set HODL_CALLER"))?;
    Ok(CallContext::new(caller, now))
}

fn vault_mut<'a>(registry: &'a mut VaultRegistry, address: &Address) -> Result<&'a mut HodlVault> {
    registry.require_vault_mut(address).map_err(registry_err)
}

fn vault_err(err: VaultError) -> anyhow::Error {
    anyhow!("[{}] {err}", err.code())
}

fn registry_err(err: RegistryError) -> anyhow::Error {
    anyhow!("[{}] {err}", err.code())
}
