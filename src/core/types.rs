use serde::Serialize;

use super::error::SimulationError;

/// Return profile of one named investment strategy, in percent units.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub label: String,
    pub mean_return: f64,
    pub return_std_dev: f64,
}

impl Strategy {
    pub fn new(label: impl Into<String>, mean_return: f64, return_std_dev: f64) -> Self {
        Self {
            label: label.into(),
            mean_return,
            return_std_dev,
        }
    }
}

/// Validated parameters for one strategy run. Fields are read-only after
/// construction so a running simulation never observes a half-updated config.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    principal: f64,
    years: u32,
    mean_return: f64,
    return_std_dev: f64,
    inflation_rate: f64,
    trial_count: u32,
    label: String,
}

impl SimulationConfig {
    pub fn new(
        principal: f64,
        years: u32,
        strategy: Strategy,
        inflation_rate: f64,
        trial_count: u32,
    ) -> Result<Self, SimulationError> {
        if !principal.is_finite() || principal <= 0.0 {
            return Err(SimulationError::invalid("principal", "must be > 0"));
        }
        if years == 0 {
            return Err(SimulationError::invalid("years", "must be >= 1"));
        }
        if trial_count == 0 {
            return Err(SimulationError::invalid("trialCount", "must be >= 1"));
        }
        if !strategy.mean_return.is_finite() {
            return Err(SimulationError::invalid("meanReturn", "must be finite"));
        }
        if !strategy.return_std_dev.is_finite() || strategy.return_std_dev < 0.0 {
            return Err(SimulationError::invalid("returnStdDev", "must be >= 0"));
        }
        validate_inflation_rate(inflation_rate)?;

        let label = strategy.label.trim();
        if label.is_empty() {
            return Err(SimulationError::invalid("label", "must not be empty"));
        }

        Ok(Self {
            principal,
            years,
            mean_return: strategy.mean_return,
            return_std_dev: strategy.return_std_dev,
            inflation_rate,
            trial_count,
            label: label.to_string(),
        })
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn years(&self) -> u32 {
        self.years
    }

    pub fn mean_return(&self) -> f64 {
        self.mean_return
    }

    pub fn return_std_dev(&self) -> f64 {
        self.return_std_dev
    }

    pub fn inflation_rate(&self) -> f64 {
        self.inflation_rate
    }

    pub fn trial_count(&self) -> u32 {
        self.trial_count
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A base of `100 + rate` at or below zero flips the sign of the deflator.
pub(crate) fn validate_inflation_rate(inflation_rate: f64) -> Result<(), SimulationError> {
    if !inflation_rate.is_finite() || inflation_rate <= -100.0 {
        return Err(SimulationError::invalid("inflationRate", "must be > -100"));
    }
    Ok(())
}

/// Inflation-adjusted terminal values, one per trial, in trial order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeSet {
    values: Vec<f64>,
}

impl OutcomeSet {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileSummary {
    pub label: String,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}
