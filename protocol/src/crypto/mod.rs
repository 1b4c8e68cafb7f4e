//! # Cryptographic Primitives
//!
//! Hashing only. Vaults and registries are identified by content, so the one
//! primitive that matters here is a collision-resistant hash with proper
//! domain separation.

pub mod hash;

pub use hash::{blake3_hash, domain_separated_hash, domain_separated_hash_multi};
