//! # Hashing Utilities
//!
//! BLAKE3 in derive-key mode, for content-addressed identifiers. Vault clone
//! addresses and label addresses both come out of here, each under its own
//! context string so the two can never collide.

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute a domain-separated hash using BLAKE3 with a context string.
///
/// Uses BLAKE3's `derive_key` mode, so `("a", data)` and `("b", data)` hash
/// under different IVs rather than relying on a prepended tag.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    domain_separated_hash_multi(context, &[data])
}

/// Domain-separated hash over several byte slices fed in order.
///
/// Equivalent to hashing the concatenation, without building it.
pub fn domain_separated_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake3_is_deterministic() {
        assert_eq!(blake3_hash(b"hodl"), blake3_hash(b"hodl"));
        assert_ne!(blake3_hash(b"hodl"), blake3_hash(b"hodl!"));
    }

    #[test]
    fn contexts_separate_domains() {
        let a = domain_separated_hash("ctx-a", b"payload");
        let b = domain_separated_hash("ctx-b", b"payload");
        assert_ne!(a, b);
        assert_ne!(a, blake3_hash(b"payload"));
    }

    #[test]
    fn multi_part_matches_concatenation() {
        let joined = domain_separated_hash("ctx", b"helloworld");
        let split = domain_separated_hash_multi("ctx", &[b"hello", b"world"]);
        assert_eq!(joined, split);
    }
}
