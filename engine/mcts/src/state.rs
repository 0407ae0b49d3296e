//! State contract consumed by the planner.
//!
//! The planner never looks inside a state. Everything it needs (deduplication
//! key, terminal detection, bookkeeping for rollout policies) is exposed
//! through [`PlanState`].

use std::fmt::Debug;
use std::hash::Hash;

/// A state the planner can search over.
///
/// Implementations are supplied by the caller (a movement model, a puzzle,
/// a test fixture). Two states with equal fingerprints are treated as the
/// same underlying position for transposition pruning, even when they were
/// reached along different paths with different costs.
pub trait PlanState: Debug {
    /// Canonical identifier used for transposition lookups.
    type Fingerprint: Clone + Eq + Hash + Debug;

    /// Canonical fingerprint of this state.
    fn fingerprint(&self) -> Self::Fingerprint;

    /// Cumulative path cost from the search origin.
    fn cost_to_come(&self) -> f64;

    /// Whether the state ends the episode. Terminal states are never expanded.
    fn is_terminal(&self) -> bool;

    /// Whether the state satisfies the goal.
    fn goal_reached(&self) -> bool;

    /// Cumulative distance travelled from the search origin.
    fn distance_traveled(&self) -> f64;
}
