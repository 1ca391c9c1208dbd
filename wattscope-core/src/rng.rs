//! Seeded sampling RNG.
//!
//! The RNG for duplicate-example sampling is derived from a user seed and the
//! dataset hash via BLAKE3, so the same seed yields the same examples for a
//! given dataset but different datasets do not share a sampling sequence.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Derive a sub-seed from `(seed, dataset_hash)`.
pub fn sub_seed(seed: u64, dataset_hash: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(dataset_hash.as_bytes());
    let hash = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// Seeded RNG when `seed` is given, entropy-seeded otherwise.
pub fn sampling_rng(seed: Option<u64>, dataset_hash: &str) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(sub_seed(seed, dataset_hash)),
        None => StdRng::from_entropy(),
    }
}
