use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::error::SimulationError;

const TRIAL_STREAM: u32 = 0;
const STRATEGY_STREAM: u32 = 1;

/// Gaussian draws of annual percentage returns.
///
/// The distribution is built once per run; the random source is passed in on
/// every call so the caller decides whether draws come from a seeded stream or
/// from OS entropy.
#[derive(Debug, Clone, Copy)]
pub struct ReturnSampler {
    normal: Normal<f64>,
}

impl ReturnSampler {
    pub fn new(mean: f64, std_dev: f64) -> Result<Self, SimulationError> {
        if !mean.is_finite() {
            return Err(SimulationError::invalid("meanReturn", "must be finite"));
        }
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(SimulationError::invalid("returnStdDev", "must be >= 0"));
        }
        let normal = Normal::new(mean, std_dev)
            .map_err(|e| SimulationError::invalid("returnStdDev", e.to_string()))?;
        Ok(Self { normal })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.normal.sample(rng)
    }
}

/// One draw from Normal(mean, std_dev).
pub fn sample_normal<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    std_dev: f64,
) -> Result<f64, SimulationError> {
    Ok(ReturnSampler::new(mean, std_dev)?.sample(rng))
}

/// Seed for the independent stream owned by trial `trial_id`.
pub fn trial_seed(base_seed: u64, trial_id: u32) -> u64 {
    derive_seed(base_seed, TRIAL_STREAM, trial_id)
}

/// Seed for the strategy at `strategy_index` in a multi-strategy comparison.
pub fn strategy_seed(base_seed: u64, strategy_index: u32) -> u64 {
    derive_seed(base_seed, STRATEGY_STREAM, strategy_index)
}

fn derive_seed(base_seed: u64, stream: u32, index: u32) -> u64 {
    let mixed = base_seed ^ ((stream as u64) << 32) ^ index as u64;
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn negative_std_dev_is_invalid_argument() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = sample_normal(&mut rng, 5.0, -1.0).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidArgument {
                field: "returnStdDev",
                ..
            }
        ));
        assert!(ReturnSampler::new(5.0, f64::NAN).is_err());
        assert!(ReturnSampler::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn zero_std_dev_returns_the_mean_exactly() {
        let mut rng = StdRng::seed_from_u64(9);
        let sampler = ReturnSampler::new(6.189, 0.0).expect("valid sampler");
        for _ in 0..100 {
            assert_eq!(sampler.sample(&mut rng), 6.189);
        }
    }

    #[test]
    fn same_seed_gives_same_draws() {
        let sampler = ReturnSampler::new(9.4324, 15.675).expect("valid sampler");
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            assert_eq!(
                sampler.sample(&mut a).to_bits(),
                sampler.sample(&mut b).to_bits()
            );
        }
    }

    #[test]
    fn draws_match_target_moments() {
        let sampler = ReturnSampler::new(9.4324, 15.675).expect("valid sampler");
        let mut rng = StdRng::seed_from_u64(2024);
        let n = 50_000;
        let draws = (0..n).map(|_| sampler.sample(&mut rng)).collect::<Vec<_>>();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);

        // Standard error of the mean is ~0.07 here; of the std dev, ~0.05.
        assert!((mean - 9.4324).abs() < 0.35, "mean {mean}");
        assert!((var.sqrt() - 15.675).abs() < 0.35, "std dev {}", var.sqrt());
    }

    #[test]
    fn derived_seeds_do_not_collide_across_trials_or_streams() {
        let mut seen = HashSet::new();
        for trial in 0..1_000 {
            assert!(seen.insert(trial_seed(42, trial)));
        }
        for strategy in 0..16 {
            assert!(seen.insert(strategy_seed(42, strategy)));
        }
        assert_ne!(trial_seed(1, 0), trial_seed(2, 0));
    }
}
