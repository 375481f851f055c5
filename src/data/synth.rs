//! Deterministic synthetic ensembles.
//!
//! Test and demo data generation: the central slot carries the exact value,
//! replicas carry independent Gaussian draws around it. Everything is driven
//! by a caller-seeded RNG so a fixed seed reproduces the ensemble bit for
//! bit.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};
use crate::sample::Sample;

/// Fresh RNG for a reproducible ensemble.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Scalar sample with exact central value `center` and `n_replica` Gaussian
/// replicas of standard deviation `spread` around it.
pub fn gaussian_sample(
    rng: &mut StdRng,
    center: f64,
    spread: f64,
    n_replica: usize,
) -> Result<Sample<f64>> {
    let normal = Normal::new(center, spread)
        .map_err(|e| Error::InvalidArgument(format!("gaussian spread: {e}")))?;
    let mut slots = Vec::with_capacity(n_replica + 1);
    slots.push(center);
    slots.extend((0..n_replica).map(|_| normal.sample(rng)));
    Sample::from_slots(slots)
}
