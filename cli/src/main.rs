// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Hodl CLI
//!
//! Entry point for the `hodl-cli` binary. Parses CLI arguments, initializes
//! logging, runs one command against the world file, and prints the result
//! as JSON on stdout.
//!
//! Typical session:
//!
//! ```text
//! hodl-cli init --owner owner
//! hodl-cli asset register weth --name "Wrapped Ether" --symbol WETH
//! hodl-cli asset mint weth alice 1000000000000000000
//! hodl-cli --caller owner whitelist weth
//! hodl-cli --caller alice create --asset weth --penalty 50 --fee 50 \
//!     --locking-window 86400 --expiry 1800259200 --fee-recipient fees
//! hodl-cli --caller alice asset approve weth <vault> 1000000000000000000
//! hodl-cli --caller alice deposit <vault> 1000000000000000000
//! hodl-cli status <vault> --holder alice
//! ```

mod cli;
mod commands;
mod logging;
mod world;

use anyhow::{Context, Result};
use clap::Parser;

use cli::HodlCli;
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = HodlCli::parse();
    logging::init_logging(
        logging::DEFAULT_LOG_LEVEL,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    let output = commands::execute(&cli).map_err(|err| {
        tracing::error!(error = %err, "command failed");
        err
    })?;
    let rendered = serde_json::to_string_pretty(&output).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
