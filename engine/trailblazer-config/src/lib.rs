//! Centralized configuration loading from config.toml.
//!
//! This crate provides configuration structs and loading logic shared
//! across the trailblazer binaries.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`TRAILBLAZER_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (`config.defaults.toml`, embedded at compile time)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! TRAILBLAZER_<SECTION>_<KEY>=value
//!
//! Examples:
//!     TRAILBLAZER_COMMON_DATA_DIR=/data
//!     TRAILBLAZER_PLANNER_TIME_BUDGET_MS=250
//!     TRAILBLAZER_WORLD_SEED=7
//!     TRAILBLAZER_ROLLOUT_GOAL_BIAS=0.8
//!     TRAILBLAZER_ACTOR_MAX_CYCLES=-1
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, load_config, load_from_path, CONFIG_PATH_ENV, CONFIG_SEARCH_PATHS,
};
pub use structs::*;
