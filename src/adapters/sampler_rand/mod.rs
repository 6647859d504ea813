//! Instance samplers

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::ports::InstanceSampler;

/// Uniform shuffle, then truncate
pub struct RandomSampler {
    seeded: Option<Mutex<StdRng>>,
}

impl RandomSampler {
    /// Thread-local entropy
    pub fn new() -> Self {
        Self { seeded: None }
    }

    /// Reproducible order for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceSampler for RandomSampler {
    fn sample(&self, pool: &[String], max: usize) -> Vec<String> {
        let mut drawn = pool.to_vec();
        match &self.seeded {
            Some(rng) => drawn.shuffle(&mut *rng.lock().unwrap_or_else(PoisonError::into_inner)),
            None => drawn.shuffle(&mut rand::rng()),
        }
        drawn.truncate(max);
        drawn
    }
}

/// Pool order, truncated
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedOrderSampler;

impl InstanceSampler for FixedOrderSampler {
    fn sample(&self, pool: &[String], max: usize) -> Vec<String> {
        pool.iter().take(max).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://instance-{}", i)).collect()
    }

    #[test]
    fn test_sample_is_bounded_and_without_replacement() {
        let sampler = RandomSampler::new();
        let drawn = sampler.sample(&pool(25), 10);
        assert_eq!(drawn.len(), 10);

        let mut unique = drawn.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 10);
        assert!(drawn.iter().all(|d| pool(25).contains(d)));
    }

    #[test]
    fn test_small_pool_is_fully_drawn() {
        let drawn = RandomSampler::new().sample(&pool(3), 10);
        assert_eq!(drawn.len(), 3);
        assert!(RandomSampler::new().sample(&[], 10).is_empty());
    }

    #[test]
    fn test_seeded_samplers_agree() {
        let a = RandomSampler::seeded(7).sample(&pool(17), 10);
        let b = RandomSampler::seeded(7).sample(&pool(17), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fixed_order_sampler() {
        assert_eq!(FixedOrderSampler.sample(&pool(5), 2), pool(2));
    }
}
