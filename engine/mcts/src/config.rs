//! Planner configuration parameters.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Errors raised when constructing a planner.
#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    #[error("exploration_factor must be greater than zero, got {0}")]
    InvalidExplorationFactor(f64),
}

/// Configuration for the resumable MCTS planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Wall-clock budget for one `advance` call, in milliseconds.
    pub time_budget_ms: u64,

    /// Blend between best-known descendant score and mean score.
    /// 1.0 = pure max, 0.0 = pure mean.
    pub mix_factor: f64,

    /// Exploration constant `k` in the UCT bonus `2k * sqrt(2 ln N / n)`.
    /// Must be strictly positive.
    pub exploration_factor: f64,

    /// Relative margin a rediscovered state must beat the canonical node's
    /// `score_max` by before it takes over the transposition entry.
    pub percent_better_node: f64,

    /// `Working` rollout steps allowed before a rollout is abandoned with
    /// reward 0. Estimate and finish steps do not count.
    pub rollout_step_ceiling: u32,

    /// Optional cap on completed iterations per `advance` call.
    /// `None` means the time budget alone ends a cycle.
    pub max_iterations_per_cycle: Option<u32>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            time_budget_ms: 100,
            mix_factor: 0.75,
            exploration_factor: 0.1,
            percent_better_node: 0.1,
            rollout_step_ceiling: 5000,
            max_iterations_per_cycle: None,
        }
    }
}

impl PlannerConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            time_budget_ms: 10,
            mix_factor: 1.0,
            exploration_factor: 0.5,
            percent_better_node: 0.1,
            rollout_step_ceiling: 100,
            max_iterations_per_cycle: Some(50),
        }
    }

    /// Per-cycle time budget.
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    /// Builder pattern: set the per-cycle time budget.
    pub fn with_time_budget_ms(mut self, ms: u64) -> Self {
        self.time_budget_ms = ms;
        self
    }

    /// Builder pattern: set the mixmax blend.
    pub fn with_mix_factor(mut self, mix: f64) -> Self {
        self.mix_factor = mix;
        self
    }

    /// Builder pattern: set the exploration constant.
    pub fn with_exploration_factor(mut self, k: f64) -> Self {
        self.exploration_factor = k;
        self
    }

    /// Builder pattern: set the transposition replacement margin.
    pub fn with_percent_better_node(mut self, pct: f64) -> Self {
        self.percent_better_node = pct;
        self
    }

    /// Builder pattern: set the rollout step ceiling.
    pub fn with_rollout_step_ceiling(mut self, steps: u32) -> Self {
        self.rollout_step_ceiling = steps;
        self
    }

    /// Builder pattern: cap iterations per cycle.
    pub fn with_max_iterations_per_cycle(mut self, iterations: Option<u32>) -> Self {
        self.max_iterations_per_cycle = iterations;
        self
    }

    /// Check the configuration and normalize recoverable values.
    ///
    /// A non-positive (or non-finite) exploration factor is the only fatal
    /// error. Everything else is clamped into range with a warning.
    pub fn validate(mut self) -> Result<Self, PlannerError> {
        if !(self.exploration_factor.is_finite() && self.exploration_factor > 0.0) {
            return Err(PlannerError::InvalidExplorationFactor(
                self.exploration_factor,
            ));
        }

        self.mix_factor = clamp_unit("mix_factor", self.mix_factor);
        self.percent_better_node = clamp_unit("percent_better_node", self.percent_better_node);

        if self.time_budget_ms == 0 {
            warn!("time_budget_ms is 0, using 1");
            self.time_budget_ms = 1;
        }
        if self.rollout_step_ceiling == 0 {
            warn!("rollout_step_ceiling is 0, using 1");
            self.rollout_step_ceiling = 1;
        }

        Ok(self)
    }
}

fn clamp_unit(name: &str, value: f64) -> f64 {
    if value.is_nan() {
        warn!(name, "value is NaN, using 0");
        return 0.0;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!(name, value, clamped, "value outside [0, 1], clamping");
    }
    clamped
}
