use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::error::SimulationError;
use super::sampler::{ReturnSampler, trial_seed};
use super::stats::summarize;
use super::types::{OutcomeSet, PercentileSummary, SimulationConfig, validate_inflation_rate};

/// Compounds `principal` through a sequence of annual percentage returns.
/// An empty sequence leaves the principal unchanged.
pub fn grow_principal<I>(principal: f64, annual_returns: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    annual_returns
        .into_iter()
        .fold(principal, |value, annual_return| {
            value * (1.0 + annual_return / 100.0)
        })
}

/// Deflates a nominal value to today's money.
///
/// Inflation is applied as a yearly depreciation of `rate / (100 + rate)`,
/// i.e. relative to the inflated base rather than to 100.
pub fn adjust_for_inflation(
    nominal_value: f64,
    inflation_rate: f64,
    years: u32,
) -> Result<f64, SimulationError> {
    validate_inflation_rate(inflation_rate)?;
    Ok(deflate(nominal_value, inflation_rate, years))
}

fn deflate(nominal_value: f64, inflation_rate: f64, years: u32) -> f64 {
    if years == 0 {
        return nominal_value;
    }
    let depreciation_rate = inflation_rate / (100.0 + inflation_rate);
    nominal_value * (1.0 - depreciation_rate).powf(years as f64)
}

/// Worker pool for [`TrialRunner::run_parallel`]; `threads == 0` lets rayon pick.
pub fn build_pool(threads: usize) -> Result<rayon::ThreadPool, SimulationError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SimulationError::Executor {
            message: e.to_string(),
        })
}

/// Runs the trials of one strategy. Each trial is a pure function of the
/// config and the random stream handed to it.
#[derive(Debug, Clone)]
pub struct TrialRunner {
    config: SimulationConfig,
    sampler: ReturnSampler,
}

impl TrialRunner {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let sampler = ReturnSampler::new(config.mean_return(), config.return_std_dev())?;
        Ok(Self { config, sampler })
    }

    /// One inflation-adjusted terminal value.
    pub fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let years = self.config.years();
        let nominal = grow_principal(
            self.config.principal(),
            (0..years).map(|_| self.sampler.sample(rng)),
        );
        deflate(nominal, self.config.inflation_rate(), years)
    }

    /// All trials drawn in order from a single stream.
    pub fn run_outcomes<R: Rng + ?Sized>(&self, rng: &mut R) -> OutcomeSet {
        let values = (0..self.config.trial_count())
            .map(|_| self.run_trial(rng))
            .collect();
        OutcomeSet::new(values)
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> PercentileSummary {
        summarize(self.config.label(), &self.run_outcomes(rng))
    }

    /// All trials, each on its own stream derived from `base_seed`, one after
    /// another. Produces exactly what [`Self::run_outcomes_parallel`] does.
    pub fn run_outcomes_streamed(&self, base_seed: u64) -> OutcomeSet {
        let values = (0..self.config.trial_count())
            .map(|trial_id| self.run_seeded_trial(base_seed, trial_id))
            .collect();
        OutcomeSet::new(values)
    }

    /// All trials spread over the current rayon pool. Outcomes stay in trial
    /// order regardless of scheduling.
    pub fn run_outcomes_parallel(&self, base_seed: u64) -> OutcomeSet {
        let values = (0..self.config.trial_count())
            .into_par_iter()
            .map(|trial_id| self.run_seeded_trial(base_seed, trial_id))
            .collect();
        OutcomeSet::new(values)
    }

    pub fn run_parallel(&self, base_seed: u64) -> PercentileSummary {
        summarize(self.config.label(), &self.run_outcomes_parallel(base_seed))
    }

    fn run_seeded_trial(&self, base_seed: u64, trial_id: u32) -> f64 {
        let mut rng = StdRng::seed_from_u64(trial_seed(base_seed, trial_id));
        self.run_trial(&mut rng)
    }
}

pub fn run_simulation<R: Rng + ?Sized>(
    config: SimulationConfig,
    rng: &mut R,
) -> Result<PercentileSummary, SimulationError> {
    Ok(TrialRunner::new(config)?.run(rng))
}

pub fn run_simulation_parallel(
    config: SimulationConfig,
    base_seed: u64,
) -> Result<PercentileSummary, SimulationError> {
    Ok(TrialRunner::new(config)?.run_parallel(base_seed))
}
