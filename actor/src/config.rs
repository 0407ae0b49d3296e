//! Configuration for the planning actor
//!
//! Configuration is loaded from config.toml with environment variable overrides.
//! CLI arguments take highest priority, followed by env vars, then config.toml.

use anyhow::{anyhow, Result};
use clap::Parser;
use grid_world::{Position, RewardWeights, RolloutParams};
use mcts::PlannerConfig;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use trailblazer_config::{load_config, CentralConfig};

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "actor")]
#[command(about = "Trailblazer actor - walks a grid world with the real-time planner")]
#[command(
    long_about = "Actor that alternates fixed-budget planning cycles with resume
instructions, re-rooting the search tree to move the agent toward the goal.

Configuration is loaded from config.toml with TRAILBLAZER_* environment variable
overrides. CLI arguments take highest priority."
)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = CENTRAL_CONFIG.common.log_level.clone())]
    pub log_level: String,

    /// Directory for the run summary
    #[arg(long, default_value_t = CENTRAL_CONFIG.common.data_dir.clone())]
    pub data_dir: String,

    // World
    /// World extent along x
    #[arg(long, default_value_t = CENTRAL_CONFIG.world.width)]
    pub width: i32,

    /// World extent along y (vertical)
    #[arg(long, default_value_t = CENTRAL_CONFIG.world.height)]
    pub height: i32,

    /// World extent along z
    #[arg(long, default_value_t = CENTRAL_CONFIG.world.depth)]
    pub depth: i32,

    /// Fraction of cells filled with obstacles, in [0, 1)
    #[arg(long, default_value_t = CENTRAL_CONFIG.world.obstacle_density)]
    pub obstacle_density: f64,

    /// Seed for world generation
    #[arg(long, default_value_t = CENTRAL_CONFIG.world.seed)]
    pub world_seed: u64,

    /// Seed for neighbour ordering
    #[arg(long, default_value_t = CENTRAL_CONFIG.world.action_seed)]
    pub action_seed: u64,

    /// Start cell as x,y,z
    #[arg(long, value_parser = parse_position, default_value_t = Coords(CENTRAL_CONFIG.world.start()))]
    pub start: Coords,

    /// Goal cell as x,y,z
    #[arg(long, value_parser = parse_position, default_value_t = Coords(CENTRAL_CONFIG.world.goal()))]
    pub goal: Coords,

    // Planner
    /// Wall-clock budget per planning cycle in milliseconds
    #[arg(long, default_value_t = CENTRAL_CONFIG.planner.time_budget_ms)]
    pub time_budget_ms: u64,

    /// Blend of best-known and mean reward in selection
    #[arg(long, default_value_t = CENTRAL_CONFIG.planner.mix_factor)]
    pub mix_factor: f64,

    /// UCT exploration constant (must be > 0)
    #[arg(long, default_value_t = CENTRAL_CONFIG.planner.exploration_factor)]
    pub exploration_factor: f64,

    /// Margin a duplicate path must win by to replace the known one
    #[arg(long, default_value_t = CENTRAL_CONFIG.planner.percent_better_node)]
    pub percent_better_node: f64,

    /// Micro-steps after which a rollout is abandoned
    #[arg(long, default_value_t = CENTRAL_CONFIG.planner.rollout_step_ceiling)]
    pub rollout_step_ceiling: u32,

    /// Iteration cap per cycle (0 = time budget only)
    #[arg(long, default_value_t = CENTRAL_CONFIG.planner.max_iterations_per_cycle)]
    pub max_iterations_per_cycle: u32,

    // Rollout
    /// Probability that a rollout move far from the goal may ignore distance
    /// progress (within 5 cells of the goal progress is always required)
    #[arg(long, default_value_t = CENTRAL_CONFIG.rollout.goal_bias)]
    pub goal_bias: f64,

    /// Rollout steps between intermediate estimates (0 to disable)
    #[arg(long, default_value_t = CENTRAL_CONFIG.rollout.estimate_interval)]
    pub estimate_interval: u32,

    #[arg(long, default_value_t = CENTRAL_CONFIG.rollout.distance_weight)]
    pub distance_weight: f64,

    #[arg(long, default_value_t = CENTRAL_CONFIG.rollout.efficiency_weight)]
    pub efficiency_weight: f64,

    #[arg(long, default_value_t = CENTRAL_CONFIG.rollout.goal_bonus)]
    pub goal_bonus: f64,

    /// Seed for rollout randomness
    #[arg(long, default_value_t = CENTRAL_CONFIG.rollout.seed)]
    pub rollout_seed: u64,

    // Agent loop
    /// Maximum planning cycles (-1 for unlimited)
    #[arg(long, default_value_t = CENTRAL_CONFIG.actor.max_cycles)]
    pub max_cycles: i64,

    /// Move to the best child every N cycles (0 to disable)
    #[arg(long, default_value_t = CENTRAL_CONFIG.actor.reroot_interval)]
    pub reroot_interval: u32,

    /// Emit planner diagnostics every N cycles (0 to disable)
    #[arg(long, default_value_t = CENTRAL_CONFIG.actor.diagnostics_interval)]
    pub diagnostics_interval: u32,
}

/// A lattice cell given on the command line as `x,y,z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coords(pub [i32; 3]);

impl std::fmt::Display for Coords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x, y, z] = self.0;
        write!(f, "{x},{y},{z}")
    }
}

impl From<Coords> for Position {
    fn from(coords: Coords) -> Self {
        let [x, y, z] = coords.0;
        Position::new(x, y, z)
    }
}

fn parse_position(s: &str) -> Result<Coords, String> {
    let parts = s
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{}': {}", s, e))?;

    match parts.as_slice() {
        [x, y, z] => Ok(Coords([*x, *y, *z])),
        _ => Err(format!("expected x,y,z but got '{}'", s)),
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        if self.data_dir.is_empty() {
            return Err(anyhow!("data_dir cannot be empty"));
        }

        if self.width <= 0 || self.height <= 0 || self.depth <= 0 {
            return Err(anyhow!(
                "world dimensions must be positive, got {}x{}x{}",
                self.width,
                self.height,
                self.depth
            ));
        }

        if !(0.0..1.0).contains(&self.obstacle_density) {
            return Err(anyhow!(
                "obstacle_density must be in [0, 1), got {}",
                self.obstacle_density
            ));
        }

        let size = self.world_size();
        for (name, coords) in [("start", self.start), ("goal", self.goal)] {
            let [x, y, z] = coords.0;
            if x < 0 || y < 0 || z < 0 || x >= size.x || y >= size.y || z >= size.z {
                return Err(anyhow!("{} {} is outside the world", name, coords));
            }
        }

        if !(self.exploration_factor.is_finite() && self.exploration_factor > 0.0) {
            return Err(anyhow!(
                "exploration_factor must be greater than 0, got {}",
                self.exploration_factor
            ));
        }

        self.rollout_params().validate()?;

        Ok(())
    }

    pub fn world_size(&self) -> Position {
        Position::new(self.width, self.height, self.depth)
    }

    /// Planner settings. Out-of-range blend values are clamped by the planner.
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig::default()
            .with_time_budget_ms(self.time_budget_ms)
            .with_mix_factor(self.mix_factor)
            .with_exploration_factor(self.exploration_factor)
            .with_percent_better_node(self.percent_better_node)
            .with_rollout_step_ceiling(self.rollout_step_ceiling)
            .with_max_iterations_per_cycle(
                (self.max_iterations_per_cycle > 0).then_some(self.max_iterations_per_cycle),
            )
    }

    pub fn rollout_params(&self) -> RolloutParams {
        RolloutParams {
            goal_bias: self.goal_bias,
            estimate_interval: self.estimate_interval,
            weights: RewardWeights {
                distance: self.distance_weight,
                efficiency: self.efficiency_weight,
                goal_bonus: self.goal_bonus,
            },
        }
    }

    /// Path of the JSON run summary
    pub fn stats_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("planner_stats.json")
    }
}
