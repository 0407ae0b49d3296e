//! MCTS tree structure with arena allocation.
//!
//! Nodes live in a contiguous slot vector and are referenced by [`NodeId`].
//! Children are owned through the parent's outgoing edges; the parent is only
//! referenced by id, so deleting a subtree never has to chase cycles.
//! Freed slots are recycled with a bumped generation.

use std::ops::{Index, IndexMut};

use crate::node::{NodeId, TreeEdge, TreeNode};

#[derive(Debug)]
struct Slot<S, A> {
    generation: u32,
    node: Option<TreeNode<S, A>>,
}

/// MCTS tree with arena-based node storage.
#[derive(Debug)]
pub struct SearchTree<S, A> {
    /// Arena storing all nodes
    slots: Vec<Slot<S, A>>,

    /// Indices of vacant slots
    free: Vec<u32>,

    /// Current root
    root: NodeId,

    /// Number of live nodes
    live: usize,
}

impl<S, A> SearchTree<S, A> {
    /// Create a new tree holding only a root for `root_state`.
    pub fn new(root_state: S) -> Self {
        let root = NodeId::new(0, 0);
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(TreeNode::new_root(root_state)),
            }],
            free: Vec::new(),
            root,
            live: 1,
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a live node.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode<S, A>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Get a mutable reference to a live node.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<S, A>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Whether `id` refers to a live node.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if tree is empty (never true: the root always exists).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over all live nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode<S, A>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::new(index as u32, slot.generation), node))
        })
    }

    fn allocate(&mut self, node: TreeNode<S, A>) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId::new(index, 0)
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Option<TreeNode<S, A>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Add a child to a parent node and link it with a new edge.
    /// Returns the new child's NodeId, or None if the parent is not live.
    pub fn add_child(&mut self, parent: NodeId, action: A, state: S) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }
        let child = self.allocate(TreeNode::new_child(state, parent));
        self[parent].outgoing.push(TreeEdge {
            parent,
            child,
            action,
        });
        Some(child)
    }

    fn max_child_score(&self, id: NodeId) -> Option<f64> {
        self.get(id)?
            .outgoing
            .iter()
            .map(|edge| self[edge.child].score_max)
            .reduce(f64::max)
    }

    /// Backpropagate a rollout reward from `leaf` to the root.
    ///
    /// Every node on the path gains a visit and the reward. A node with
    /// children takes the maximum `score_max` of its children; a leaf takes
    /// the reward itself, replacing any earlier value.
    pub fn backpropagate(&mut self, leaf: NodeId, reward: f64) {
        let mut cursor = Some(leaf);

        while let Some(id) = cursor {
            let child_max = self.max_child_score(id);
            let Some(node) = self.get_mut(id) else {
                break;
            };
            node.visits += 1;
            node.score_cumulative += reward;
            node.last_reward = reward;
            node.score_max = child_max.unwrap_or(reward);

            cursor = node.incoming;
        }
    }

    /// Recompute `score_max` from `start` up to the root after the children
    /// of `start` changed without a backpropagation.
    pub fn refresh_max_upward(&mut self, start: NodeId) {
        let mut cursor = Some(start);

        while let Some(id) = cursor {
            let child_max = self.max_child_score(id);
            let Some(node) = self.get_mut(id) else {
                break;
            };
            node.score_max = child_max.unwrap_or(node.last_reward);
            cursor = node.incoming;
        }
    }

    /// Select the child of `id` with the strictly highest mixmax UCT score.
    /// Ties go to the earliest expanded child.
    pub fn best_child(&self, id: NodeId, mix: f64, exploration: f64) -> Option<NodeId> {
        let node = self.get(id)?;
        let mut best: Option<(NodeId, f64)> = None;

        for edge in &node.outgoing {
            let score = self[edge.child].uct_score(node.visits, mix, exploration);
            let score = if score.is_nan() {
                f64::NEG_INFINITY
            } else {
                score
            };
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((edge.child, score));
            }
        }

        best.map(|(child, _)| child)
    }

    /// Lazily follow the exploitation-only best child from the root.
    pub fn best_path(&self) -> BestPath<'_, S, A> {
        self.best_path_from(self.root)
    }

    /// Lazily follow the exploitation-only best child from `start`.
    pub fn best_path_from(&self, start: NodeId) -> BestPath<'_, S, A> {
        BestPath {
            tree: self,
            current: Some(start),
        }
    }

    /// Detach `child` from its parent: the parent's edge is removed and the
    /// child's back-reference cleared. The child and its subtree stay in the
    /// arena. Returns the removed edge.
    pub fn detach(&mut self, child: NodeId) -> Option<TreeEdge<A>> {
        let parent = self.get(child)?.incoming?;
        let edge = {
            let parent_node = self.get_mut(parent)?;
            let position = parent_node
                .outgoing
                .iter()
                .position(|edge| edge.child == child)?;
            parent_node.outgoing.remove(position)
        };
        if let Some(node) = self.get_mut(child) {
            node.incoming = None;
        }
        Some(edge)
    }

    /// Delete `id` and every node below it. The node is detached from its
    /// parent first. Returns the deleted nodes.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<(NodeId, TreeNode<S, A>)> {
        if !self.contains(id) || id == self.root {
            return Vec::new();
        }
        self.detach(id);
        self.release_subtree(id)
    }

    fn release_subtree(&mut self, id: NodeId) -> Vec<(NodeId, TreeNode<S, A>)> {
        let mut removed = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if let Some(node) = self.release(current) {
                stack.extend(node.outgoing.iter().map(|edge| edge.child));
                removed.push((current, node));
            }
        }

        removed
    }

    /// Delete a childless, non-root node and refresh its ancestors' maxima.
    pub fn prune_leaf(&mut self, id: NodeId) -> Option<TreeNode<S, A>> {
        let node = self.get(id)?;
        if !node.is_leaf() || id == self.root {
            return None;
        }
        let parent = node.incoming;

        self.detach(id);
        let removed = self.release(id);
        if let Some(parent) = parent {
            self.refresh_max_upward(parent);
        }
        removed
    }

    /// Promote a child of the root to be the new root.
    ///
    /// The child is detached, then the old root and all of its remaining
    /// descendants are deleted. Returns the deleted nodes, or None if
    /// `child` is not a child of the current root.
    pub fn promote(&mut self, child: NodeId) -> Option<Vec<(NodeId, TreeNode<S, A>)>> {
        if self.get(child)?.incoming != Some(self.root) {
            return None;
        }
        self.detach(child)?;

        let old_root = self.root;
        self.root = child;
        Some(self.release_subtree(old_root))
    }

    /// Whether `id` is live and connected to the current root.
    pub fn is_reachable(&self, id: NodeId) -> bool {
        self.depth_of(id).is_some()
    }

    /// Number of edges between the root and `id`, if `id` is reachable.
    pub fn depth_of(&self, id: NodeId) -> Option<u32> {
        let mut depth = 0;
        let mut cursor = id;

        loop {
            let node = self.get(cursor)?;
            match node.incoming {
                None => return (cursor == self.root).then_some(depth),
                Some(parent) => {
                    depth += 1;
                    cursor = parent;
                }
            }
            if depth as usize > self.live {
                return None;
            }
        }
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = &self[self.root];
        TreeStats {
            total_nodes: self.live,
            total_edges: self.iter().map(|(_, node)| node.outgoing.len()).sum(),
            root_visits: root.visits,
            root_mean: root.mean_score(),
            root_score_max: root.score_max,
            max_depth: self.compute_max_depth(),
        }
    }

    fn compute_max_depth(&self) -> u32 {
        let mut max_depth = 0;
        let mut stack = vec![(self.root, 0u32)];

        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.get(id) {
                stack.extend(node.outgoing.iter().map(|edge| (edge.child, depth + 1)));
            }
        }

        max_depth
    }
}

impl<S, A> Index<NodeId> for SearchTree<S, A> {
    type Output = TreeNode<S, A>;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {id} is not live"),
        }
    }
}

impl<S, A> IndexMut<NodeId> for SearchTree<S, A> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("node {id} is not live"),
        }
    }
}

/// One step along the best path.
#[derive(Debug)]
pub struct PathStep<'a, S, A> {
    pub action: &'a A,
    pub node: NodeId,
    pub state: &'a S,
}

/// Lazy best-path accessor: repeatedly applies the zero-exploration,
/// max-only best child.
#[derive(Debug)]
pub struct BestPath<'a, S, A> {
    tree: &'a SearchTree<S, A>,
    current: Option<NodeId>,
}

impl<'a, S, A> Iterator for BestPath<'a, S, A> {
    type Item = PathStep<'a, S, A>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let parent = self.current?;
        let Some(child) = tree.best_child(parent, 1.0, 0.0) else {
            self.current = None;
            return None;
        };
        let edge = tree[parent].edge_to(child)?;
        self.current = Some(child);

        Some(PathStep {
            action: &edge.action,
            node: child,
            state: &tree[child].state,
        })
    }
}

/// Statistics about a search tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub root_visits: u32,
    pub root_mean: f64,
    pub root_score_max: f64,
    pub max_depth: u32,
}
