//! Resumable real-time Monte Carlo Tree Search.
//!
//! This crate provides a planner that chooses moves under a strict
//! per-decision time budget. It is generic over the caller's state, action
//! source and rollout policy, and never inspects states beyond the
//! [`PlanState`] contract.
//!
//! # Overview
//!
//! Each planner iteration has four phases:
//!
//! 1. **Selection / expansion**: descend from the root with mixmax UCT until
//!    a node still has an untried action, then add one child for it
//! 2. **Rollout**: simulate from the new node with a resumable
//!    [`RolloutStream`], stepping it one micro-step at a time
//! 3. **Backpropagation**: update visits, cumulative reward and the
//!    best-known reward (`score_max`) from the node to the root
//! 4. **Transposition check**: reconcile the new node with any earlier node
//!    for the same state fingerprint and prune the loser
//!
//! Unlike batch MCTS the planner suspends when its budget runs out, even in
//! the middle of a rollout, and resumes exactly where it stopped on the next
//! [`Planner::advance`]. Between cycles the caller can request diagnostics
//! and re-rooting, which promotes the best child to the root and discards
//! the rest of the tree.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{Planner, PlannerConfig, ResumeInstruction};
//!
//! let mut planner = Planner::new(start, actions, rollout, PlannerConfig::default())?;
//!
//! loop {
//!     let snapshot = planner.advance();
//!     if let Some(action) = snapshot.best_action() {
//!         println!("Best action so far: {:?}", action);
//!     }
//!     planner.control(ResumeInstruction {
//!         emit_diagnostics: false,
//!         re_root: true,
//!     });
//! }
//! ```
//!
//! # Configuration
//!
//! The [`PlannerConfig`] struct controls search behavior:
//!
//! - `time_budget_ms`: Wall-clock budget per cycle (default: 100)
//! - `mix_factor`: Blend of best-known and mean reward (default: 0.75)
//! - `exploration_factor`: UCT exploration constant, must be > 0 (default: 0.1)
//! - `percent_better_node`: Margin a duplicate must win by (default: 0.1)
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                           Planner                            |
//! +--------------------------------------------------------------+
//! |  +-------------+  +--------------+  +--------------------+   |
//! |  | SearchTree  |  | ActionSource |  |   RolloutPolicy    |   |
//! |  |  (arena)    |  |  (cursors)   |  | (resumable stream) |   |
//! |  +------+------+  +------+-------+  +---------+----------+   |
//! |         |                |                    |              |
//! |         v                v                    v              |
//! |  +--------------------------------------------------------+  |
//! |  |   select -> expand -> rollout -> backpropagate ->      |  |
//! |  |              transposition check                       |  |
//! |  +--------------------------------------------------------+  |
//! +--------------------------------------------------------------+
//! ```

pub mod clock;
pub mod config;
pub mod node;
pub mod planner;
pub mod rollout;
pub mod source;
pub mod state;
pub mod stats;
pub mod transposition;
pub mod tree;

#[cfg(test)]
mod test_util;

// Re-export main types
pub use clock::{Clock, SystemClock, TickClock};
pub use config::{PlannerConfig, PlannerError};
pub use node::{NodeId, TreeEdge, TreeNode};
pub use planner::{
    run_planner, ControlOutcome, PlanResult, Planner, PlannerStatus, RerootOutcome,
    ResumeInstruction, Snapshot,
};
pub use rollout::{fixed_reward, Estimates, RolloutPolicy, RolloutStep, RolloutStream};
pub use source::{ActionResult, ActionSource};
pub use state::PlanState;
pub use stats::{Diagnostics, DiagnosticsSnapshot, RewardSummary, TranspositionCounters};
pub use transposition::{Reconciliation, TranspositionTable};
pub use tree::{BestPath, PathStep, SearchTree, TreeStats};
