use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Gets a random number generator for a specific entity, e.g. one time slice.
/// The hash parameter should uniquely identify the entity. Combined with the run's base seed,
/// every entity draws from its own reproducible stream.
pub fn get_rnd<H: Hash>(base_seed: u64, hash: H) -> SmallRng {
    let mut hasher = DefaultHasher::new();
    hash.hash(&mut hasher);
    base_seed.hash(&mut hasher);
    let combined_seed = hasher.finish();

    SmallRng::seed_from_u64(combined_seed)
}
