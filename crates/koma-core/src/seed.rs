//! Deterministic per-point jitter.
//!
//! Hand-drawn silhouettes are perturbed by values derived from the bubble's
//! own id, so redrawing on every interaction frame reproduces exactly the
//! same outline.

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the seed bytes followed by `index` as four
/// little-endian bytes, finished with the murmur3 avalanche so adjacent
/// indices land far apart.
pub fn hash32(seed: &str, index: u32) -> u32 {
    let mut h = FNV_OFFSET;
    for byte in seed.bytes().chain(index.to_le_bytes()) {
        h ^= u32::from(byte);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Map `(seed, index)` to `[0, 1)`. Uses the top 24 bits so the result is
/// exact in an `f32`.
pub fn seed_unit(seed: &str, index: u32) -> f32 {
    (hash32(seed, index) >> 8) as f32 / 16_777_216.0
}

/// Map `(seed, index)` to `[-1, 1)`.
pub fn seed_signed(seed: &str, index: u32) -> f32 {
    seed_unit(seed, index) * 2.0 - 1.0
}
