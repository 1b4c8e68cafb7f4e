//! # World State File
//!
//! The CLI's persistent state: one asset ledger and one registry, stored
//! together as a single JSON document. Each invocation loads it, runs one
//! command, and writes it back.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hodl_contracts::vault_factory::VaultRegistry;
use hodl_protocol::InMemoryLedger;

/// Everything a CLI session operates on.
#[derive(Debug, Serialize, Deserialize)]
pub struct World {
    /// Protocol version that last wrote the file.
    pub version: String,
    /// Last successful save.
    pub saved_at: Option<DateTime<Utc>>,
    pub ledger: InMemoryLedger,
    pub registry: VaultRegistry,
}

impl World {
    pub fn new(registry: VaultRegistry) -> Self {
        Self {
            version: hodl_protocol::config::PROTOCOL_VERSION.to_string(),
            saved_at: None,
            ledger: InMemoryLedger::new(),
            registry,
        }
    }

    /// Reads a world file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "no world file at {}; run `hodl-cli init` first",
                path.display()
            );
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read world file {}", path.display()))?;
        let world: World = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse world file {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            vaults = world.registry.vault_count(),
            assets = world.ledger.asset_count(),
            "world loaded"
        );
        Ok(world)
    }

    /// Writes the world file, replacing any previous contents.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.saved_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(self).context("failed to serialize world")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(path, json)
            .with_context(|| format!("failed to write world file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "world saved");
        Ok(())
    }
}
