//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so the binary never depends
//! on it being present on disk.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    planner: PlannerDefaults,
    world: WorldDefaults,
    rollout: RolloutDefaults,
    actor: ActorDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct PlannerDefaults {
    time_budget_ms: u64,
    mix_factor: f64,
    exploration_factor: f64,
    percent_better_node: f64,
    rollout_step_ceiling: u32,
    max_iterations_per_cycle: u32,
}

#[derive(Debug, Deserialize)]
struct WorldDefaults {
    width: i32,
    height: i32,
    depth: i32,
    obstacle_density: f64,
    seed: u64,
    action_seed: u64,
    start_x: i32,
    start_y: i32,
    start_z: i32,
    goal_x: i32,
    goal_y: i32,
    goal_z: i32,
}

#[derive(Debug, Deserialize)]
struct RolloutDefaults {
    goal_bias: f64,
    estimate_interval: u32,
    distance_weight: f64,
    efficiency_weight: f64,
    goal_bonus: f64,
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct ActorDefaults {
    max_cycles: i64,
    reroot_interval: u32,
    diagnostics_interval: u32,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Planner
pub fn time_budget_ms() -> u64 {
    DEFAULTS.planner.time_budget_ms
}
pub fn mix_factor() -> f64 {
    DEFAULTS.planner.mix_factor
}
pub fn exploration_factor() -> f64 {
    DEFAULTS.planner.exploration_factor
}
pub fn percent_better_node() -> f64 {
    DEFAULTS.planner.percent_better_node
}
pub fn rollout_step_ceiling() -> u32 {
    DEFAULTS.planner.rollout_step_ceiling
}
pub fn max_iterations_per_cycle() -> u32 {
    DEFAULTS.planner.max_iterations_per_cycle
}

// World
pub fn width() -> i32 {
    DEFAULTS.world.width
}
pub fn height() -> i32 {
    DEFAULTS.world.height
}
pub fn depth() -> i32 {
    DEFAULTS.world.depth
}
pub fn obstacle_density() -> f64 {
    DEFAULTS.world.obstacle_density
}
pub fn world_seed() -> u64 {
    DEFAULTS.world.seed
}
pub fn action_seed() -> u64 {
    DEFAULTS.world.action_seed
}
pub fn start() -> [i32; 3] {
    let w = &DEFAULTS.world;
    [w.start_x, w.start_y, w.start_z]
}
pub fn goal() -> [i32; 3] {
    let w = &DEFAULTS.world;
    [w.goal_x, w.goal_y, w.goal_z]
}

// Rollout
pub fn goal_bias() -> f64 {
    DEFAULTS.rollout.goal_bias
}
pub fn estimate_interval() -> u32 {
    DEFAULTS.rollout.estimate_interval
}
pub fn distance_weight() -> f64 {
    DEFAULTS.rollout.distance_weight
}
pub fn efficiency_weight() -> f64 {
    DEFAULTS.rollout.efficiency_weight
}
pub fn goal_bonus() -> f64 {
    DEFAULTS.rollout.goal_bonus
}
pub fn rollout_seed() -> u64 {
    DEFAULTS.rollout.seed
}

// Actor
pub fn max_cycles() -> i64 {
    DEFAULTS.actor.max_cycles
}
pub fn reroot_interval() -> u32 {
    DEFAULTS.actor.reroot_interval
}
pub fn diagnostics_interval() -> u32 {
    DEFAULTS.actor.diagnostics_interval
}
