//! MCTS tree node representation.
//!
//! Each node represents a state reached by taking an action from its parent.
//! Nodes carry the statistics used by mixmax UCT selection: a visit count, the
//! cumulative rollout reward, and the best-known achievable reward below the
//! node (`score_max`).

/// Index into the node arena.
///
/// The generation distinguishes a live node from an earlier node that once
/// occupied the same slot, so ids held across deletions never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the arena.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Edge from a parent to one of its children, carrying the producing action.
///
/// Edges are owned by the parent's outgoing list.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEdge<A> {
    pub parent: NodeId,
    pub child: NodeId,
    pub action: A,
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct TreeNode<S, A> {
    /// State this node represents
    pub state: S,

    /// Number of rollouts backpropagated through this node
    pub visits: u32,

    /// Sum of all rollout rewards backpropagated through this node
    pub score_cumulative: f64,

    /// Best achievable reward below this node.
    /// For a leaf this is the most recent rollout reward, not a running max.
    pub score_max: f64,

    /// Most recent reward backpropagated through this node
    pub last_reward: f64,

    /// Parent back-reference (None for root). Never owning.
    pub incoming: Option<NodeId>,

    /// Edges to children, in expansion order
    pub outgoing: Vec<TreeEdge<A>>,

    /// The node's action source has been drained
    pub exhausted: bool,

    /// Selection found no expandable action and no child to descend into
    pub marked_terminal: bool,
}

impl<S, A> TreeNode<S, A> {
    /// Create a new root node.
    pub fn new_root(state: S) -> Self {
        Self::new(state, None)
    }

    /// Create a new child node.
    pub fn new_child(state: S, parent: NodeId) -> Self {
        Self::new(state, Some(parent))
    }

    fn new(state: S, incoming: Option<NodeId>) -> Self {
        Self {
            state,
            visits: 0,
            score_cumulative: 0.0,
            score_max: 0.0,
            last_reward: 0.0,
            incoming,
            outgoing: Vec::new(),
            exhausted: false,
            marked_terminal: false,
        }
    }

    /// Mean rollout reward. Returns 0.0 if never visited.
    #[inline]
    pub fn mean_score(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.score_cumulative / self.visits as f64
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.outgoing.is_empty()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.incoming.is_none()
    }

    /// Mixmax UCT score of this node as a child of a parent with
    /// `parent_visits` visits.
    ///
    /// `mix * score_max + (1 - mix) * mean + 2k * sqrt(2 ln N / n)`
    ///
    /// An unvisited node has no mean; it scores `+inf` while exploring and
    /// `mix * score_max` otherwise.
    #[inline]
    pub fn uct_score(&self, parent_visits: u32, mix: f64, exploration: f64) -> f64 {
        if self.visits == 0 {
            return if exploration > 0.0 {
                f64::INFINITY
            } else {
                mix * self.score_max
            };
        }

        let exploit = mix * self.score_max + (1.0 - mix) * self.mean_score();
        if exploration == 0.0 {
            return exploit;
        }

        // ln(0) is -inf; a parent that was never backpropagated explores nothing
        let ln_parent = (parent_visits.max(1) as f64).ln();
        exploit + 2.0 * exploration * (2.0 * ln_parent / self.visits as f64).sqrt()
    }

    /// Child edge leading to `child`, if any.
    pub fn edge_to(&self, child: NodeId) -> Option<&TreeEdge<A>> {
        self.outgoing.iter().find(|edge| edge.child == child)
    }
}
