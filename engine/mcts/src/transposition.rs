//! Transposition table and duplicate pruning.
//!
//! The table maps a state fingerprint to the canonical node for that state.
//! When an expansion rediscovers a known state along a different path, the
//! two nodes are compared by `score_max`: the newcomer only takes over the
//! entry when it clears the canonical node's score by a relative margin
//! (`percent_better_node`). The loser is pruned when that is safe, i.e. it
//! is childless, not terminal and not the root. Terminal nodes still compete
//! for the entry but neither side of a terminal comparison is pruned.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::trace;

use crate::node::NodeId;
use crate::state::PlanState;
use crate::tree::SearchTree;

/// Outcome of reconciling a freshly expanded node with the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// First occurrence of the fingerprint; the node is now canonical.
    NewState,
    /// The table already points at this node.
    SameNode,
    /// The node did not clear the bar and was pruned.
    DuplicatePruned { canonical: NodeId },
    /// The node did not clear the bar but has children, so it stays.
    DuplicateKept { canonical: NodeId },
    /// The node cleared the bar and replaced `previous` as canonical.
    /// `pruned_previous` is false when `previous` had children, either node
    /// was terminal, or `previous` is the root.
    Superseded {
        previous: NodeId,
        pruned_previous: bool,
    },
    /// The node is terminal, did not clear the bar and was kept anyway.
    TerminalKept,
    /// The entry pointed at a node no longer in the tree; it was replaced.
    StaleEntry,
}

/// Fingerprint to canonical node mapping.
#[derive(Debug)]
pub struct TranspositionTable<F> {
    entries: HashMap<F, NodeId>,
    hits: u64,
    misses: u64,
}

impl<F> Default for TranspositionTable<F> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<F> TranspositionTable<F>
where
    F: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical node for `fingerprint`, if any.
    pub fn lookup(&self, fingerprint: &F) -> Option<NodeId> {
        self.entries.get(fingerprint).copied()
    }

    /// Point `fingerprint` at `id`, returning the previous canonical node.
    pub fn insert(&mut self, fingerprint: F, id: NodeId) -> Option<NodeId> {
        self.entries.insert(fingerprint, id)
    }

    /// Remove the entry for `fingerprint` only if it still points at `id`.
    /// A newer node that has since claimed the fingerprint is left alone.
    pub fn remove_if_points_to(&mut self, fingerprint: &F, id: NodeId) -> bool {
        if self.entries.get(fingerprint) == Some(&id) {
            self.entries.remove(fingerprint);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&F, &NodeId)> {
        self.entries.iter()
    }

    /// Lookups that found an existing entry.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that found nothing.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Reconcile `candidate` (a node that has just been expanded and
    /// backpropagated) with the table, pruning whichever duplicate loses.
    pub fn reconcile<S, A>(
        &mut self,
        tree: &mut SearchTree<S, A>,
        candidate: NodeId,
        percent_better_node: f64,
    ) -> Reconciliation
    where
        S: PlanState<Fingerprint = F>,
    {
        let Some(node) = tree.get(candidate) else {
            return Reconciliation::StaleEntry;
        };
        let fingerprint = node.state.fingerprint();
        let candidate_max = node.score_max;
        let candidate_terminal = node.state.is_terminal();
        let candidate_leaf = node.is_leaf();

        let Some(canonical) = self.lookup(&fingerprint) else {
            self.misses += 1;
            self.entries.insert(fingerprint, candidate);
            return Reconciliation::NewState;
        };
        self.hits += 1;

        if canonical == candidate {
            return Reconciliation::SameNode;
        }
        if !tree.is_reachable(canonical) {
            self.entries.insert(fingerprint, candidate);
            return Reconciliation::StaleEntry;
        }

        let canonical_max = tree[canonical].score_max;
        if !clears_bar(candidate_max, canonical_max, percent_better_node) {
            trace!(
                candidate = %candidate,
                canonical = %canonical,
                candidate_max,
                canonical_max,
                "Duplicate state does not beat canonical node"
            );
            if candidate_terminal {
                return Reconciliation::TerminalKept;
            }
            if candidate_leaf && tree.prune_leaf(candidate).is_some() {
                return Reconciliation::DuplicatePruned { canonical };
            }
            return Reconciliation::DuplicateKept { canonical };
        }

        self.entries.insert(fingerprint, candidate);

        let previous = &tree[canonical];
        let prunable = !candidate_terminal
            && previous.is_leaf()
            && !previous.state.is_terminal()
            && canonical != tree.root();
        let pruned_previous = prunable && tree.prune_leaf(canonical).is_some();

        trace!(
            candidate = %candidate,
            previous = %canonical,
            candidate_max,
            canonical_max,
            pruned_previous,
            "Duplicate state supersedes canonical node"
        );

        Reconciliation::Superseded {
            previous: canonical,
            pruned_previous,
        }
    }
}

/// Whether `candidate` beats `canonical` by more than `percent_better_node`
/// of the canonical score's magnitude.
fn clears_bar(candidate: f64, canonical: f64, percent_better_node: f64) -> bool {
    candidate - canonical > percent_better_node * canonical.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::Toy;

    fn table_with(
        tree: &mut SearchTree<Toy, u32>,
        table: &mut TranspositionTable<u32>,
        parent: NodeId,
        state: Toy,
        reward: f64,
    ) -> (NodeId, Reconciliation) {
        let id = tree.add_child(parent, state.key, state).unwrap();
        tree.backpropagate(id, reward);
        let outcome = table.reconcile(tree, id, 0.10);
        (id, outcome)
    }

    #[test]
    fn test_first_occurrence_is_new_state() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();

        let (id, outcome) = table_with(&mut tree, &mut table, root, Toy::new(1), 0.5);

        assert_eq!(outcome, Reconciliation::NewState);
        assert_eq!(table.lookup(&1), Some(id));
        assert_eq!(table.misses(), 1);
    }

    #[test]
    fn test_same_node_is_noop() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();
        let (id, _) = table_with(&mut tree, &mut table, root, Toy::new(1), 0.5);

        assert_eq!(table.reconcile(&mut tree, id, 0.1), Reconciliation::SameNode);
        assert_eq!(table.hits(), 1);
    }

    #[test]
    fn test_better_duplicate_supersedes_and_prunes_childless_canonical() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();
        let a = tree.add_child(root, 1, Toy::new(1)).unwrap();
        tree.backpropagate(a, 0.3);

        let (first, _) = table_with(&mut tree, &mut table, root, Toy::aliased(10, 77), 0.80);
        let (second, outcome) = table_with(&mut tree, &mut table, a, Toy::aliased(11, 77), 0.95);

        // 0.95 > 0.80 * 1.10
        assert_eq!(
            outcome,
            Reconciliation::Superseded {
                previous: first,
                pruned_previous: true
            }
        );
        assert_eq!(table.lookup(&77), Some(second));
        assert!(!tree.contains(first));
        // Root max now comes from the surviving branch
        assert!((tree[root].score_max - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_worse_duplicate_is_pruned() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();
        let a = tree.add_child(root, 1, Toy::new(1)).unwrap();
        tree.backpropagate(a, 0.3);

        let (first, _) = table_with(&mut tree, &mut table, root, Toy::aliased(10, 77), 0.80);
        // 0.85 <= 0.80 * 1.10
        let (second, outcome) = table_with(&mut tree, &mut table, a, Toy::aliased(11, 77), 0.85);

        assert_eq!(outcome, Reconciliation::DuplicatePruned { canonical: first });
        assert_eq!(table.lookup(&77), Some(first));
        assert!(!tree.contains(second));
        assert!(tree[a].is_leaf());
        // a is a leaf again and falls back to its latest reward
        assert!((tree[a].score_max - 0.85).abs() < 1e-12);
        assert!((tree[root].score_max - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_superseded_canonical_with_children_is_kept() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();

        let (first, _) = table_with(&mut tree, &mut table, root, Toy::aliased(10, 77), 0.40);
        table_with(&mut tree, &mut table, first, Toy::new(20), 0.40);
        let (second, outcome) = table_with(&mut tree, &mut table, root, Toy::aliased(11, 77), 0.90);

        assert_eq!(
            outcome,
            Reconciliation::Superseded {
                previous: first,
                pruned_previous: false
            }
        );
        assert_eq!(table.lookup(&77), Some(second));
        assert!(tree.is_reachable(first));
    }

    #[test]
    fn test_terminal_duplicate_is_exempt() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();

        let (first, _) = table_with(&mut tree, &mut table, root, Toy::aliased(10, 77), 0.90);
        let (second, outcome) =
            table_with(&mut tree, &mut table, root, Toy::aliased(11, 77).terminal(), 0.10);

        assert_eq!(outcome, Reconciliation::TerminalKept);
        assert!(tree.contains(second));
        assert_eq!(table.lookup(&77), Some(first));
    }

    #[test]
    fn test_better_terminal_duplicate_takes_over_entry() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();

        let (first, _) =
            table_with(&mut tree, &mut table, root, Toy::aliased(10, 77).terminal(), 0.50);
        // 0.90 > 0.50 * 1.10
        let (second, outcome) =
            table_with(&mut tree, &mut table, root, Toy::aliased(11, 77).terminal(), 0.90);

        assert_eq!(
            outcome,
            Reconciliation::Superseded {
                previous: first,
                pruned_previous: false
            }
        );
        assert_eq!(table.lookup(&77), Some(second));
        assert!(tree.contains(first));
        assert!(tree.contains(second));
    }

    #[test]
    fn test_terminal_winner_keeps_childless_canonical() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();

        let (first, _) = table_with(&mut tree, &mut table, root, Toy::aliased(10, 77), 0.20);
        let (second, outcome) =
            table_with(&mut tree, &mut table, root, Toy::aliased(11, 77).terminal(), 0.90);

        assert!(matches!(
            outcome,
            Reconciliation::Superseded {
                pruned_previous: false,
                ..
            }
        ));
        assert_eq!(table.lookup(&77), Some(second));
        assert!(tree.contains(first));
    }

    #[test]
    fn test_bar_uses_magnitude_for_negative_scores() {
        // A lower negative score never clears the bar
        assert!(!clears_bar(-1.05, -1.0, 0.10));
        assert!(!clears_bar(-0.95, -1.0, 0.10));
        assert!(clears_bar(-0.85, -1.0, 0.10));
        // Positive scores match the relative margin
        assert!(!clears_bar(0.85, 0.80, 0.10));
        assert!(clears_bar(0.95, 0.80, 0.10));
        assert!(!clears_bar(0.0, 0.0, 0.10));
    }

    #[test]
    fn test_worse_negative_duplicate_is_pruned() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();
        let a = tree.add_child(root, 1, Toy::new(1)).unwrap();
        tree.backpropagate(a, -0.5);

        let (first, _) = table_with(&mut tree, &mut table, root, Toy::aliased(10, 77), -1.0);
        let (second, outcome) = table_with(&mut tree, &mut table, a, Toy::aliased(11, 77), -1.05);

        assert_eq!(outcome, Reconciliation::DuplicatePruned { canonical: first });
        assert_eq!(table.lookup(&77), Some(first));
        assert!(!tree.contains(second));
    }

    #[test]
    fn test_stale_entry_is_replaced() {
        let mut tree = SearchTree::new(Toy::new(0));
        let mut table = TranspositionTable::new();
        let root = tree.root();
        let (first, _) = table_with(&mut tree, &mut table, root, Toy::aliased(10, 77), 0.90);
        tree.remove_subtree(first);

        let (second, outcome) = table_with(&mut tree, &mut table, root, Toy::aliased(11, 77), 0.10);

        assert_eq!(outcome, Reconciliation::StaleEntry);
        assert_eq!(table.lookup(&77), Some(second));
    }

    #[test]
    fn test_remove_if_points_to() {
        let mut table = TranspositionTable::new();
        let old = NodeId::new(1, 0);
        let new = NodeId::new(2, 0);
        table.insert(5u32, new);

        assert!(!table.remove_if_points_to(&5, old));
        assert_eq!(table.lookup(&5), Some(new));
        assert!(table.remove_if_points_to(&5, new));
        assert!(table.is_empty());
    }
}
