//! # CLI Interface
//!
//! Defines the command-line argument structure for `hodl-cli` using `clap`
//! derive. Every invocation runs one command against a JSON world file
//! holding the asset ledger and the vault registry.
//!
//! Addresses are accepted either as `0x`-prefixed hex or as a plain label
//! (`alice`, `weth`), which is hashed to a stable address.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hodl_contracts::hodl_vault::{BonusAsset, VaultParams};
use hodl_protocol::{Address, Amount, Timestamp};

/// Time-locked hodl vaults on a local ledger.
#[derive(Parser, Debug)]
#[command(
    name = "hodl-cli",
    about = "Drive hodl vaults and their registry from the command line",
    version,
    propagate_version = true
)]
pub struct HodlCli {
    /// Path to the world state file.
    #[arg(long, short = 's', env = "HODL_STATE", default_value = "hodl-state.json", global = true)]
    pub state: PathBuf,

    /// Unix time to execute at. Defaults to the system clock.
    #[arg(long, global = true)]
    pub now: Option<Timestamp>,

    /// Account the command acts as.
    #[arg(long, short = 'c', env = "HODL_CALLER", global = true, value_parser = parse_address)]
    pub caller: Option<Address>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "HODL_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new world file with an empty ledger and registry.
    Init(InitArgs),
    /// Manage assets on the in-memory ledger.
    #[command(subcommand)]
    Asset(AssetCommand),
    /// Allow or disallow an asset for new vaults. Registry owner only.
    Whitelist {
        /// Asset to update.
        #[arg(value_parser = parse_address)]
        asset: Address,
        /// Remove the asset instead of adding it.
        #[arg(long)]
        disallow: bool,
    },
    /// Print the address a vault with these parameters gets.
    Target(VaultParamsArgs),
    /// Deploy a vault for these parameters.
    Create(VaultParamsArgs),
    /// Lock base asset in a vault.
    Deposit {
        #[arg(value_parser = parse_address)]
        vault: Address,
        amount: Amount,
        /// Credit receipts and shares to this account instead of the caller.
        #[arg(long, value_parser = parse_address)]
        beneficiary: Option<Address>,
    },
    /// Exit early, paying the penalty and forfeiting all shares.
    Quit {
        #[arg(value_parser = parse_address)]
        vault: Address,
        amount: Amount,
    },
    /// Redeem shares for a cut of the reward pools.
    Redeem {
        #[arg(value_parser = parse_address)]
        vault: Address,
        shares: Amount,
    },
    /// Withdraw principal after expiry.
    Withdraw {
        #[arg(value_parser = parse_address)]
        vault: Address,
        amount: Amount,
    },
    /// Withdraw all principal and redeem all shares after expiry.
    WithdrawAll {
        #[arg(value_parser = parse_address)]
        vault: Address,
    },
    /// Donate to the reward pool (base asset) or the bonus pool.
    Donate {
        #[arg(value_parser = parse_address)]
        vault: Address,
        #[arg(value_parser = parse_address)]
        asset: Address,
        amount: Amount,
    },
    /// Send stray tokens held by a vault to its fee recipient.
    Sweep {
        #[arg(value_parser = parse_address)]
        vault: Address,
        #[arg(value_parser = parse_address)]
        asset: Address,
        amount: Amount,
    },
    /// Print a vault's state, or every vault when none is given.
    Status {
        #[arg(value_parser = parse_address)]
        vault: Option<Address>,
        /// Also print this account's position.
        #[arg(long, value_parser = parse_address)]
        holder: Option<Address>,
    },
    /// Print version information and exit.
    Version,
}

impl Commands {
    /// Whether the command changes the world file.
    pub fn mutates(&self) -> bool {
        match self {
            Commands::Asset(AssetCommand::Balance { .. })
            | Commands::Target(_)
            | Commands::Status { .. }
            | Commands::Version => false,
            _ => true,
        }
    }
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Vault template every clone derives from.
    #[arg(long, value_parser = parse_address, default_value = "hodl-implementation")]
    pub implementation: Address,

    /// Registry owner.
    #[arg(long, value_parser = parse_address)]
    pub owner: Address,

    /// The registry's own address.
    #[arg(long, value_parser = parse_address, default_value = "hodl-registry")]
    pub registry: Address,

    /// Overwrite an existing world file.
    #[arg(long)]
    pub force: bool,
}

/// `asset` subcommands.
#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    /// Register a new fungible asset.
    Register {
        #[arg(value_parser = parse_address)]
        asset: Address,
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 18)]
        decimals: u8,
    },
    /// Mint an asset to an account.
    Mint {
        #[arg(value_parser = parse_address)]
        asset: Address,
        #[arg(value_parser = parse_address)]
        to: Address,
        amount: Amount,
    },
    /// Approve a spender (usually a vault) to pull the caller's asset.
    Approve {
        #[arg(value_parser = parse_address)]
        asset: Address,
        #[arg(value_parser = parse_address)]
        spender: Address,
        amount: Amount,
    },
    /// Print an account's balance.
    Balance {
        #[arg(value_parser = parse_address)]
        asset: Address,
        #[arg(value_parser = parse_address)]
        holder: Address,
    },
}

/// The vault parameter tuple as flags.
#[derive(Args, Debug, Clone)]
pub struct VaultParamsArgs {
    /// Base asset.
    #[arg(long, value_parser = parse_address)]
    pub asset: Address,

    /// Early-exit penalty, per mille.
    #[arg(long)]
    pub penalty: u16,

    /// Seconds before expiry during which deposits close.
    #[arg(long)]
    pub locking_window: u64,

    /// Unix time at which principal unlocks.
    #[arg(long)]
    pub expiry: Timestamp,

    /// Share of each penalty sent to the fee recipient, per mille.
    #[arg(long)]
    pub fee: u16,

    /// Share decay exponent.
    #[arg(long, default_value_t = 1)]
    pub decay: u32,

    /// Receiver of fees and swept tokens.
    #[arg(long, value_parser = parse_address)]
    pub fee_recipient: Address,

    /// Optional bonus reward asset.
    #[arg(long, value_parser = parse_address)]
    pub bonus: Option<Address>,
}

impl From<&VaultParamsArgs> for VaultParams {
    fn from(args: &VaultParamsArgs) -> Self {
        VaultParams {
            asset: args.asset,
            penalty_rate: args.penalty,
            locking_window: args.locking_window,
            expiry: args.expiry,
            fee_rate: args.fee,
            decay_exponent: args.decay,
            fee_recipient: args.fee_recipient,
            bonus_asset: args
                .bonus
                .map(BonusAsset::from_address)
                .unwrap_or_default(),
        }
    }
}

/// Hex if it starts with `0x`, otherwise a label.
pub fn parse_address(s: &str) -> Result<Address, String> {
    if s.starts_with("0x") || s.starts_with("0X") {
        Address::from_hex(s).map_err(|e| e.to_string())
    } else if s.is_empty() {
        Err("address cannot be empty".to_string())
    } else {
        Ok(Address::from_label(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        HodlCli::command().debug_assert();
    }

    #[test]
    fn addresses_accept_hex_and_labels() {
        let alice = Address::from_label("alice");
        assert_eq!(parse_address("alice").unwrap(), alice);
        assert_eq!(parse_address(&alice.to_hex()).unwrap(), alice);
        assert!(parse_address("0xnothex").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn vault_params_from_flags() {
        let cli = HodlCli::try_parse_from([
            "hodl-cli",
            "target",
            "--asset",
            "weth",
            "--penalty",
            "50",
            "--locking-window",
            "86400",
            "--expiry",
            "1800259200",
            "--fee",
            "50",
            "--fee-recipient",
            "fees",
        ])
        .unwrap();
        let Commands::Target(args) = cli.command else {
            panic!("expected target");
        };
        let params = VaultParams::from(&args);
        assert_eq!(params.asset, Address::from_label("weth"));
        assert_eq!(params.decay_exponent, 1);
        assert_eq!(params.bonus_asset, BonusAsset::Disabled);
    }

    #[test]
    fn view_commands_do_not_mutate() {
        let cli = HodlCli::try_parse_from(["hodl-cli", "status"]).unwrap();
        assert!(!cli.command.mutates());
        let cli = HodlCli::try_parse_from(["hodl-cli", "withdraw-all", "0x00"]);
        assert!(cli.is_err());
        let cli = HodlCli::try_parse_from(["hodl-cli", "withdraw-all", "vault"]).unwrap();
        assert!(cli.command.mutates());
    }
}
