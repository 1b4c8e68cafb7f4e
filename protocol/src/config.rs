//! # Protocol Configuration & Constants
//!
//! Every magic number the vaults and the registry depend on lives here.
//! The rate denominators and window limits are part of what a vault
//! *means*: changing them changes the payout of every position ever opened,
//! so they are constants and not knobs.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version, reported by the CLI.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// Penalty and fee rates are parts-per-thousand. 50 = 5%.
pub const RATE_DENOMINATOR: u16 = 1_000;

/// Largest accepted penalty or fee rate: the whole amount.
pub const MAX_RATE: u16 = RATE_DENOMINATOR;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Seconds in a day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Longest locking window a vault may be created with. Thirty days of no
/// new deposits is already a long time to sit behind a closed door.
pub const MAX_LOCKING_WINDOW_SECS: u64 = 30 * SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Length of an [`Address`](crate::types::Address) in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// BLAKE3 derive-key context for vault clone addresses. Bumping the suffix
/// moves every predicted address, so don't.
pub const CLONE_ADDRESS_CONTEXT: &str = "hodl-vaults 2026-10-01 vault clone address v1";

/// BLAKE3 derive-key context for label-derived addresses.
pub const ADDRESS_LABEL_CONTEXT: &str = "hodl-vaults 2026-10-01 address label v1";

// ---------------------------------------------------------------------------
// Receipt Metadata
// ---------------------------------------------------------------------------

/// Decimals assumed for an asset the ledger has no metadata for.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Prefix prepended to the base asset's name for the receipt name.
pub const RECEIPT_NAME_PREFIX: &str = "Hodl ";

/// Prefix prepended to the base asset's symbol for the receipt symbol.
pub const RECEIPT_SYMBOL_PREFIX: &str = "h";
