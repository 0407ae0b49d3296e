//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TRAILBLAZER_CONFIG";

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",      // Current directory
    "../config.toml",   // Parent directory (when running from subdirectory)
    "/app/config.toml", // Docker container
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the TRAILBLAZER_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
/// 4. Docker container path (/app/config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_PATH_ENV, path.display());
            return load_from_path(&path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
///
/// Unreadable or malformed files fall back to the built-in defaults with a
/// warning; environment overrides are applied either way.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (i32, u64, f64, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        match std::env::var($key).map(|s| s.parse()) {
            Ok(Ok(v)) => $config.$section.$field = v,
            Ok(Err(_)) => warn!("Ignoring unparseable {}", $key),
            Err(_) => {}
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: TRAILBLAZER_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.data_dir, "TRAILBLAZER_COMMON_DATA_DIR");
    env_override!(config, common.log_level, "TRAILBLAZER_COMMON_LOG_LEVEL");

    // Planner
    env_override!(
        config,
        planner.time_budget_ms,
        "TRAILBLAZER_PLANNER_TIME_BUDGET_MS",
        parse
    );
    env_override!(
        config,
        planner.mix_factor,
        "TRAILBLAZER_PLANNER_MIX_FACTOR",
        parse
    );
    env_override!(
        config,
        planner.exploration_factor,
        "TRAILBLAZER_PLANNER_EXPLORATION_FACTOR",
        parse
    );
    env_override!(
        config,
        planner.percent_better_node,
        "TRAILBLAZER_PLANNER_PERCENT_BETTER_NODE",
        parse
    );
    env_override!(
        config,
        planner.rollout_step_ceiling,
        "TRAILBLAZER_PLANNER_ROLLOUT_STEP_CEILING",
        parse
    );
    env_override!(
        config,
        planner.max_iterations_per_cycle,
        "TRAILBLAZER_PLANNER_MAX_ITERATIONS_PER_CYCLE",
        parse
    );

    // World
    env_override!(config, world.width, "TRAILBLAZER_WORLD_WIDTH", parse);
    env_override!(config, world.height, "TRAILBLAZER_WORLD_HEIGHT", parse);
    env_override!(config, world.depth, "TRAILBLAZER_WORLD_DEPTH", parse);
    env_override!(
        config,
        world.obstacle_density,
        "TRAILBLAZER_WORLD_OBSTACLE_DENSITY",
        parse
    );
    env_override!(config, world.seed, "TRAILBLAZER_WORLD_SEED", parse);
    env_override!(
        config,
        world.action_seed,
        "TRAILBLAZER_WORLD_ACTION_SEED",
        parse
    );
    env_override!(config, world.start_x, "TRAILBLAZER_WORLD_START_X", parse);
    env_override!(config, world.start_y, "TRAILBLAZER_WORLD_START_Y", parse);
    env_override!(config, world.start_z, "TRAILBLAZER_WORLD_START_Z", parse);
    env_override!(config, world.goal_x, "TRAILBLAZER_WORLD_GOAL_X", parse);
    env_override!(config, world.goal_y, "TRAILBLAZER_WORLD_GOAL_Y", parse);
    env_override!(config, world.goal_z, "TRAILBLAZER_WORLD_GOAL_Z", parse);

    // Rollout
    env_override!(
        config,
        rollout.goal_bias,
        "TRAILBLAZER_ROLLOUT_GOAL_BIAS",
        parse
    );
    env_override!(
        config,
        rollout.estimate_interval,
        "TRAILBLAZER_ROLLOUT_ESTIMATE_INTERVAL",
        parse
    );
    env_override!(
        config,
        rollout.distance_weight,
        "TRAILBLAZER_ROLLOUT_DISTANCE_WEIGHT",
        parse
    );
    env_override!(
        config,
        rollout.efficiency_weight,
        "TRAILBLAZER_ROLLOUT_EFFICIENCY_WEIGHT",
        parse
    );
    env_override!(
        config,
        rollout.goal_bonus,
        "TRAILBLAZER_ROLLOUT_GOAL_BONUS",
        parse
    );
    env_override!(config, rollout.seed, "TRAILBLAZER_ROLLOUT_SEED", parse);

    // Actor
    env_override!(
        config,
        actor.max_cycles,
        "TRAILBLAZER_ACTOR_MAX_CYCLES",
        parse
    );
    env_override!(
        config,
        actor.reroot_interval,
        "TRAILBLAZER_ACTOR_REROOT_INTERVAL",
        parse
    );
    env_override!(
        config,
        actor.diagnostics_interval,
        "TRAILBLAZER_ACTOR_DIAGNOSTICS_INTERVAL",
        parse
    );

    config
}
