use std::collections::HashSet;

use rand::{RngCore, SeedableRng, rngs::StdRng};

use crate::utils::AssetContainer;

/// Hands out path ids for new records.
///
/// Ids are drawn at random from the whole 64-bit space rather than taken
/// sequentially, so added records do not stand out. A draw is retried while
/// it is null, already used in the container, or already handed out by this
/// allocator.
pub struct PathIdAllocator<R: RngCore = StdRng> {
    rng: R,
    issued: HashSet<i64>,
}

impl PathIdAllocator<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for PathIdAllocator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> PathIdAllocator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            issued: HashSet::new(),
        }
    }

    pub fn allocate(&mut self, container: &AssetContainer) -> i64 {
        loop {
            let candidate = self.rng.next_u64() as i64;
            if candidate == 0 || container.contains(candidate) || self.issued.contains(&candidate) {
                continue;
            }
            self.issued.insert(candidate);
            return candidate;
        }
    }
}
