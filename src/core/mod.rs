mod engine;
mod error;
mod sampler;
mod stats;
mod types;

pub use engine::{
    TrialRunner, adjust_for_inflation, build_pool, grow_principal, run_simulation,
    run_simulation_parallel,
};
pub use error::SimulationError;
pub use sampler::{ReturnSampler, sample_normal, strategy_seed, trial_seed};
pub use stats::{percentile, percentile_of_sorted, summarize};
pub use types::{OutcomeSet, PercentileSummary, SimulationConfig, Strategy};
