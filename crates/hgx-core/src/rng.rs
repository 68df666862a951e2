//! Deterministic randomness for reweighting knobs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Deterministic RNG handle used by the `random-add` reweighting knob.
///
/// A master `seed: u64` is supplied by the caller (usually from the transform
/// options). Independent streams, for example one per hypergraph in a batch, are
/// derived by hashing `(master_seed, stream)` with SipHash-1-3 under fixed zero
/// keys, so two runs with the same options perturb the same arcs identically.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates the handle for one derived stream of a master seed.
    pub fn for_stream(master_seed: u64, stream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, stream))
    }

    /// Draws a value uniformly from `[0, max)`. Returns `0` when `max <= 0`.
    pub fn uniform_below(&mut self, max: f64) -> f64 {
        if max > 0.0 {
            self.rng.gen_range(0.0..max)
        } else {
            0.0
        }
    }
}

/// Derives the deterministic seed for a specific stream.
pub fn derive_substream_seed(master_seed: u64, stream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(stream);
    hasher.finish()
}
