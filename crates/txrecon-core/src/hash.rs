//! Keyed hashing for short IDs and fanout selection.
//!
//! The tracker never hashes directly; it goes through the [`KeyedHasher`]
//! capability so tests can substitute a deterministic stub. The production
//! implementation is blake3 in keyed mode.

use crate::types::TxId;

/// A 128-bit hash key.
///
/// Either the per-connection key mixed from both handshake salts, or a
/// node-wide key the caller derives from its own randomness for fanout
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashKey {
    /// First half of the key.
    pub k0: u64,
    /// Second half of the key.
    pub k1: u64,
}

impl HashKey {
    /// Create a key from its two halves.
    pub const fn new(k0: u64, k1: u64) -> Self {
        Self { k0, k1 }
    }
}

/// A keyed hash oracle: uniformly distributed 64-bit values from
/// `(key, input)` pairs.
///
/// Implementations must be collision-resistant for production use; test
/// doubles only need determinism.
pub trait KeyedHasher: Send + Sync {
    /// Hash `data` under `key` to a 64-bit value.
    fn hash64(&self, key: &HashKey, data: &[u8]) -> u64;
}

/// Production [`KeyedHasher`] backed by blake3 keyed hashing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3KeyedHasher;

impl KeyedHasher for Blake3KeyedHasher {
    fn hash64(&self, key: &HashKey, data: &[u8]) -> u64 {
        let mut key_bytes = [0u8; 32];
        key_bytes[..8].copy_from_slice(&key.k0.to_le_bytes());
        key_bytes[8..16].copy_from_slice(&key.k1.to_le_bytes());
        key_bytes[16..24].copy_from_slice(&key.k0.to_le_bytes());
        key_bytes[24..].copy_from_slice(&key.k1.to_le_bytes());

        let digest = blake3::keyed_hash(&key_bytes, data);
        let mut out = [0u8; 8];
        out.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(out)
    }
}

/// Domain-separation keys for mixing handshake salts into a connection key.
const SALT_KEY_LO: HashKey = HashKey::new(
    u64::from_le_bytes(*b"txsalt-0"),
    u64::from_le_bytes(*b"txsalt-1"),
);
const SALT_KEY_HI: HashKey = HashKey::new(
    u64::from_le_bytes(*b"txsalt-2"),
    u64::from_le_bytes(*b"txsalt-3"),
);

/// Mix the two handshake salts into the per-connection hash key.
///
/// Both sides of a connection must derive the same key, so the salts are
/// ordered before hashing. Per-connection uniqueness prevents an attacker
/// from probing short-ID collisions across connections.
pub fn combine_salts<H: KeyedHasher + ?Sized>(hasher: &H, local_salt: u64, remote_salt: u64) -> HashKey {
    let (lo, hi) = if local_salt <= remote_salt {
        (local_salt, remote_salt)
    } else {
        (remote_salt, local_salt)
    };

    let mut data = [0u8; 16];
    data[..8].copy_from_slice(&lo.to_le_bytes());
    data[8..].copy_from_slice(&hi.to_le_bytes());

    HashKey {
        k0: hasher.hash64(&SALT_KEY_LO, &data),
        k1: hasher.hash64(&SALT_KEY_HI, &data),
    }
}

/// Derive the 32-bit short ID of a transaction under a connection key.
///
/// Sketches are computed over short IDs instead of full transaction ids.
pub fn short_tx_id<H: KeyedHasher + ?Sized>(hasher: &H, key: &HashKey, txid: &TxId) -> u32 {
    hasher.hash64(key, txid.as_bytes()) as u32
}
