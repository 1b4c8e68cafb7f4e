// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Hodl Protocol: Core Primitives
//!
//! Everything the vault contracts need from the outside world, and nothing
//! they don't. The contracts crate owns the accounting; this crate owns the
//! vocabulary that accounting is written in.
//!
//! ## Architecture
//!
//! - **types**: `Address` handles plus the `Amount` and `Timestamp` aliases.
//! - **config**: Protocol constants. Rates, windows, hashing contexts.
//! - **crypto**: BLAKE3 helpers for content-addressed identifiers.
//! - **clock**: Where "now" comes from. System time in production, a
//!   hand-cranked clock in tests.
//! - **context**: The `(caller, now)` pair every operation runs under.
//! - **asset**: The fungible asset ledger the vaults pull from and push to,
//!   with an in-memory implementation.
//!
//! ## Design Philosophy
//!
//! 1. Integers only. Amounts are `u128` in the asset's smallest unit and
//!    every division floors.
//! 2. Transfers settle in batches, all or nothing.
//! 3. Time is injected, never read behind the caller's back.

pub mod asset;
pub mod clock;
pub mod config;
pub mod context;
pub mod crypto;
pub mod types;

pub use asset::{AssetError, AssetLedger, AssetMetadata, InMemoryLedger, Transfer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::CallContext;
pub use types::{Address, AddressError, Amount, Timestamp};
