//! Serde helper for maps whose keys are not strings.
//!
//! JSON object keys must be strings, but the registry indexes vaults by the
//! whole [`VaultParams`](crate::hodl_vault::VaultParams) struct. This module
//! writes such a map as a list of `[key, value]` pairs instead.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Index {
//!     #[serde(with = "crate::serde_entries")]
//!     by_params: HashMap<VaultParams, Address>,
//! }
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<K, V, S>(map: &HashMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    V: Serialize,
    S: Serializer,
{
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(map.len()))?;
    for entry in map {
        seq.serialize_element(&entry)?;
    }
    seq.end()
}

pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<HashMap<K, V>, D::Error>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    let entries: Vec<(K, V)> = Vec::deserialize(deserializer)?;
    Ok(entries.into_iter().collect())
}
