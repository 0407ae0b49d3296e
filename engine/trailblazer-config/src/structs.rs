//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub rollout: RolloutConfig,
    #[serde(default)]
    pub actor: ActorConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CommonConfig {
    pub data_dir: String,
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// Search parameters, mirrored into `mcts::PlannerConfig` by the actor
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PlannerSection {
    pub time_budget_ms: u64,
    pub mix_factor: f64,
    pub exploration_factor: f64,
    pub percent_better_node: f64,
    pub rollout_step_ceiling: u32,
    /// 0 = bounded by the time budget only
    pub max_iterations_per_cycle: u32,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            time_budget_ms: defaults::time_budget_ms(),
            mix_factor: defaults::mix_factor(),
            exploration_factor: defaults::exploration_factor(),
            percent_better_node: defaults::percent_better_node(),
            rollout_step_ceiling: defaults::rollout_step_ceiling(),
            max_iterations_per_cycle: defaults::max_iterations_per_cycle(),
        }
    }
}

/// Generated grid world
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub obstacle_density: f64,
    pub seed: u64,
    pub action_seed: u64,
    pub start_x: i32,
    pub start_y: i32,
    pub start_z: i32,
    pub goal_x: i32,
    pub goal_y: i32,
    pub goal_z: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let [start_x, start_y, start_z] = defaults::start();
        let [goal_x, goal_y, goal_z] = defaults::goal();
        Self {
            width: defaults::width(),
            height: defaults::height(),
            depth: defaults::depth(),
            obstacle_density: defaults::obstacle_density(),
            seed: defaults::world_seed(),
            action_seed: defaults::action_seed(),
            start_x,
            start_y,
            start_z,
            goal_x,
            goal_y,
            goal_z,
        }
    }
}

impl WorldConfig {
    pub fn size(&self) -> [i32; 3] {
        [self.width, self.height, self.depth]
    }

    pub fn start(&self) -> [i32; 3] {
        [self.start_x, self.start_y, self.start_z]
    }

    pub fn goal(&self) -> [i32; 3] {
        [self.goal_x, self.goal_y, self.goal_z]
    }
}

/// Rollout policy tuning and reward weights
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RolloutConfig {
    pub goal_bias: f64,
    pub estimate_interval: u32,
    pub distance_weight: f64,
    pub efficiency_weight: f64,
    pub goal_bonus: f64,
    pub seed: u64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            goal_bias: defaults::goal_bias(),
            estimate_interval: defaults::estimate_interval(),
            distance_weight: defaults::distance_weight(),
            efficiency_weight: defaults::efficiency_weight(),
            goal_bonus: defaults::goal_bonus(),
            seed: defaults::rollout_seed(),
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ActorConfig {
    /// Negative = unlimited
    pub max_cycles: i64,
    /// Re-root every N cycles; 0 disables re-rooting
    pub reroot_interval: u32,
    /// Emit diagnostics every N cycles; 0 disables them
    pub diagnostics_interval: u32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            max_cycles: defaults::max_cycles(),
            reroot_interval: defaults::reroot_interval(),
            diagnostics_interval: defaults::diagnostics_interval(),
        }
    }
}
