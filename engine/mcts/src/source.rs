//! Action source contract.
//!
//! An action source lazily enumerates the moves available from a state. The
//! planner requests one iterator per node, the first time it expands from that
//! node, and pulls a single action per expansion. Iterators are kept alive
//! across budget cycles and dropped when exhausted or when their node is
//! discarded.

/// An action together with the state it leads to.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult<A, S> {
    pub action: A,
    pub result_state: S,
}

impl<A, S> ActionResult<A, S> {
    pub fn new(action: A, result_state: S) -> Self {
        Self {
            action,
            result_state,
        }
    }
}

/// Supplies candidate actions for a state.
///
/// The returned iterator must be finite. It may be randomized; the planner
/// consumes it in order and never restarts it for the same node.
pub trait ActionSource<S> {
    /// Action type recorded on tree edges.
    type Action;

    /// Lazy sequence of actions and their resulting states.
    type Iter: Iterator<Item = ActionResult<Self::Action, S>>;

    /// Begin enumerating actions available from `state`.
    fn actions(&mut self, state: &S) -> Self::Iter;
}
