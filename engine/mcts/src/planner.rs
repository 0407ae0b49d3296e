//! Resumable MCTS driver.
//!
//! Each call to [`Planner::advance`] runs select -> rollout -> backpropagate
//! -> transposition check iterations until the time budget runs out, then
//! suspends and hands back a [`Snapshot`]. A rollout that is still running at
//! that point is parked and resumed on the next call, so no simulated work is
//! lost between cycles. Between cycles the caller may request diagnostics
//! and a re-root through [`Planner::control`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::{PlannerConfig, PlannerError};
use crate::node::NodeId;
use crate::rollout::{RolloutPolicy, RolloutStep, RolloutStream};
use crate::source::ActionSource;
use crate::state::PlanState;
use crate::stats::{Diagnostics, DiagnosticsSnapshot};
use crate::transposition::{Reconciliation, TranspositionTable};
use crate::tree::{BestPath, SearchTree};

/// Driver lifecycle. Termination is dropping the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerStatus {
    /// Constructed, never advanced.
    Idle,
    /// Inside `advance`.
    Running,
    /// Budget exhausted, waiting for the caller.
    Suspended,
}

/// Instructions applied between budget cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeInstruction {
    pub emit_diagnostics: bool,
    pub re_root: bool,
}

impl ResumeInstruction {
    pub fn diagnostics() -> Self {
        Self {
            emit_diagnostics: true,
            re_root: false,
        }
    }

    pub fn re_root() -> Self {
        Self {
            emit_diagnostics: false,
            re_root: true,
        }
    }
}

/// Result of a re-root request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerootOutcome {
    /// The best child became the root; `removed` nodes were discarded.
    Promoted { new_root: NodeId, removed: usize },
    /// The root has no children. Nothing changed.
    NoChild,
}

/// What `control` did.
#[derive(Debug, Clone, Default)]
pub struct ControlOutcome {
    pub diagnostics: Option<DiagnosticsSnapshot>,
    pub reroot: Option<RerootOutcome>,
}

/// View of the planner handed to the caller after each budget cycle.
#[derive(Debug)]
pub struct Snapshot<'a, S, A> {
    /// Current root
    pub root: NodeId,
    /// Index of the cycle that produced this snapshot (0-based)
    pub cycle: u64,
    /// Iterations completed during the cycle
    pub iterations: u32,
    /// Latest estimate of a rollout parked mid-stream, if any
    pub pending_reward: Option<f64>,
    pub tree: &'a SearchTree<S, A>,
}

impl<'a, S, A> Snapshot<'a, S, A> {
    /// Lazy best path from the root (zero exploration, pure max).
    pub fn best_path(&self) -> BestPath<'a, S, A> {
        self.tree.best_path_from(self.root)
    }

    /// Action on the first edge of the best path.
    pub fn best_action(&self) -> Option<&'a A> {
        self.best_path().next().map(|step| step.action)
    }

    pub fn root_state(&self) -> &'a S {
        &self.tree[self.root].state
    }
}

/// Result of a one-shot search.
#[derive(Debug, Clone)]
pub struct PlanResult<A> {
    /// Best action from the initial state, None if nothing was expanded
    pub action: Option<A>,
    /// Iterations performed
    pub iterations: u32,
    /// Best-known reward below the root
    pub value: f64,
}

/// A rollout in progress. Survives across budget cycles.
struct PendingRollout<T> {
    leaf: NodeId,
    depth: u32,
    is_new: bool,
    stream: T,
    latest: Option<f64>,
    steps: u32,
}

enum RolloutProgress {
    Complete(f64),
    Suspended,
}

/// Resumable real-time MCTS planner.
pub struct Planner<S, Src, R, C = SystemClock>
where
    S: PlanState,
    Src: ActionSource<S>,
    R: RolloutPolicy<S>,
{
    tree: SearchTree<S, Src::Action>,
    table: TranspositionTable<S::Fingerprint>,
    /// Live action iterators, keyed by the node they expand
    cursors: HashMap<NodeId, Src::Iter>,
    source: Src,
    rollout: R,
    config: PlannerConfig,
    clock: C,
    status: PlannerStatus,
    pending: Option<PendingRollout<R::Stream>>,
    cycle: u64,
    total_iterations: u64,
    diagnostics: Diagnostics,
}

impl<S, Src, R> Planner<S, Src, R, SystemClock>
where
    S: PlanState,
    Src: ActionSource<S>,
    R: RolloutPolicy<S>,
{
    /// Create a planner that measures its budget with the wall clock.
    ///
    /// Fails before any node is created if the exploration factor is not
    /// strictly positive.
    pub fn new(
        initial_state: S,
        source: Src,
        rollout: R,
        config: PlannerConfig,
    ) -> Result<Self, PlannerError> {
        Self::with_clock(initial_state, source, rollout, config, SystemClock)
    }
}

impl<S, Src, R, C> Planner<S, Src, R, C>
where
    S: PlanState,
    Src: ActionSource<S>,
    R: RolloutPolicy<S>,
    C: Clock,
{
    /// Create a planner with an injected clock.
    pub fn with_clock(
        initial_state: S,
        source: Src,
        rollout: R,
        config: PlannerConfig,
        clock: C,
    ) -> Result<Self, PlannerError> {
        let config = config.validate()?;

        let fingerprint = initial_state.fingerprint();
        let tree = SearchTree::new(initial_state);
        let mut table = TranspositionTable::new();
        table.insert(fingerprint, tree.root());

        Ok(Self {
            tree,
            table,
            cursors: HashMap::new(),
            source,
            rollout,
            config,
            clock,
            status: PlannerStatus::Idle,
            pending: None,
            cycle: 0,
            total_iterations: 0,
            diagnostics: Diagnostics::new().with_node_count(1),
        })
    }

    pub fn status(&self) -> PlannerStatus {
        self.status
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn tree(&self) -> &SearchTree<S, Src::Action> {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn transpositions(&self) -> &TranspositionTable<S::Fingerprint> {
        &self.table
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn rollout_policy(&self) -> &R {
        &self.rollout
    }

    /// Number of completed budget cycles.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Iterations completed over the planner's lifetime.
    pub fn total_iterations(&self) -> u64 {
        self.total_iterations
    }

    pub fn has_pending_rollout(&self) -> bool {
        self.pending.is_some()
    }

    /// Stop planning and keep the tree.
    pub fn into_tree(self) -> SearchTree<S, Src::Action> {
        self.tree
    }

    /// Run one budget cycle using the configured time budget.
    pub fn advance(&mut self) -> Snapshot<'_, S, Src::Action> {
        self.advance_for(self.config.time_budget())
    }

    /// Run one budget cycle of length `budget`.
    ///
    /// Every cycle performs at least one rollout micro-step, so repeated
    /// calls always make progress however small the budget.
    pub fn advance_for(&mut self, budget: Duration) -> Snapshot<'_, S, Src::Action> {
        self.status = PlannerStatus::Running;
        let start = self.clock.now();
        let mut iterations = 0u32;
        let mut progressed = false;

        loop {
            if let Some(max) = self.config.max_iterations_per_cycle {
                if iterations >= max {
                    break;
                }
            }
            if progressed && !self.within_budget(start, budget) {
                break;
            }

            let mut pending = match self.take_pending() {
                Some(pending) => pending,
                None => self.start_iteration(),
            };

            match self.drive_rollout(&mut pending, start, budget, &mut progressed) {
                RolloutProgress::Complete(reward) => {
                    self.finish_iteration(pending, reward);
                    iterations += 1;
                }
                RolloutProgress::Suspended => {
                    self.pending = Some(pending);
                    self.diagnostics.record_suspension();
                    break;
                }
            }
        }

        let cycle = self.cycle;
        self.cycle += 1;
        self.status = PlannerStatus::Suspended;

        trace!(
            cycle,
            iterations,
            nodes = self.tree.len(),
            pending = self.pending.is_some(),
            "Planner cycle complete"
        );

        Snapshot {
            root: self.tree.root(),
            cycle,
            iterations,
            pending_reward: self.pending.as_ref().and_then(|p| p.latest),
            tree: &self.tree,
        }
    }

    /// Apply resume instructions. Diagnostics are emitted before re-rooting.
    pub fn control(&mut self, instruction: ResumeInstruction) -> ControlOutcome {
        let mut outcome = ControlOutcome::default();

        if instruction.emit_diagnostics {
            let stats = self.tree.stats();
            outcome.diagnostics = Some(self.diagnostics.emit(&stats));
        }
        if instruction.re_root {
            outcome.reroot = Some(self.reroot());
        }

        outcome
    }

    fn within_budget(&self, start: Instant, budget: Duration) -> bool {
        self.clock.now().saturating_duration_since(start) < budget
    }

    /// Take the parked rollout unless its leaf has been discarded.
    fn take_pending(&mut self) -> Option<PendingRollout<R::Stream>> {
        let pending = self.pending.take()?;
        if self.tree.contains(pending.leaf) {
            Some(pending)
        } else {
            debug!(leaf = %pending.leaf, "Dropping rollout for discarded node");
            self.diagnostics.record_stale_rollout();
            None
        }
    }

    fn start_iteration(&mut self) -> PendingRollout<R::Stream> {
        let (leaf, depth, is_new) = self.tree_policy();
        if is_new {
            self.diagnostics.record_expansion();
        }

        let stream = self.rollout.rollout(
            &self.tree[self.tree.root()].state,
            &self.tree[leaf].state,
        );

        PendingRollout {
            leaf,
            depth,
            is_new,
            stream,
            latest: None,
            steps: 0,
        }
    }

    /// Descend from the root to a node to simulate from.
    ///
    /// Returns the node, the number of steps taken, and whether the node was
    /// created by this call.
    fn tree_policy(&mut self) -> (NodeId, u32, bool) {
        let mix = self.config.mix_factor;
        let exploration = self.config.exploration_factor;
        let mut current = self.tree.root();
        let mut depth = 0;

        loop {
            let node = &self.tree[current];
            if node.state.is_terminal() || node.marked_terminal {
                return (current, depth, false);
            }
            depth += 1;

            if !node.exhausted {
                let cursor = match self.cursors.entry(current) {
                    std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                    std::collections::hash_map::Entry::Vacant(entry) => {
                        entry.insert(self.source.actions(&self.tree[current].state))
                    }
                };

                if let Some(result) = cursor.next() {
                    match self.tree.add_child(current, result.action, result.result_state) {
                        Some(child) => return (child, depth, true),
                        None => return (current, depth, false),
                    }
                }

                self.cursors.remove(&current);
                self.tree[current].exhausted = true;
            }

            match self.tree.best_child(current, mix, exploration) {
                Some(child) => current = child,
                None => {
                    debug!(node = %current, depth, "No expandable action or child, marking terminal");
                    self.tree[current].marked_terminal = true;
                    self.diagnostics.record_marked_terminal();
                    return (current, depth, false);
                }
            }
        }
    }

    /// Step the rollout until it finishes, hits the step ceiling, or the
    /// budget runs out. The clock is read before every micro-step except the
    /// first one of the cycle. Only `Working` steps count toward the ceiling,
    /// so a rollout may report its result right after its last allowed move.
    fn drive_rollout(
        &mut self,
        pending: &mut PendingRollout<R::Stream>,
        start: Instant,
        budget: Duration,
        progressed: &mut bool,
    ) -> RolloutProgress {
        loop {
            if *progressed && !self.within_budget(start, budget) {
                return RolloutProgress::Suspended;
            }

            *progressed = true;

            match pending.stream.step() {
                RolloutStep::Working => {
                    pending.steps += 1;
                    if pending.steps > self.config.rollout_step_ceiling {
                        debug!(
                            leaf = %pending.leaf,
                            steps = pending.steps,
                            "Rollout hit step ceiling, using zero reward"
                        );
                        self.diagnostics.record_ceiling_hit();
                        return RolloutProgress::Complete(0.0);
                    }
                }
                RolloutStep::Estimate(value) => pending.latest = Some(value),
                RolloutStep::Finished => {
                    return RolloutProgress::Complete(match pending.latest {
                        Some(value) => value,
                        None => {
                            self.diagnostics.record_estimate_less();
                            0.0
                        }
                    });
                }
            }
        }
    }

    fn finish_iteration(&mut self, pending: PendingRollout<R::Stream>, reward: f64) {
        self.tree.backpropagate(pending.leaf, reward);
        self.diagnostics.record_depth(pending.depth);
        self.diagnostics.record_reward(self.cycle, reward);
        self.total_iterations += 1;

        if pending.is_new {
            let outcome =
                self.table
                    .reconcile(&mut self.tree, pending.leaf, self.config.percent_better_node);
            match outcome {
                Reconciliation::DuplicatePruned { .. } => {
                    self.cursors.remove(&pending.leaf);
                }
                Reconciliation::Superseded {
                    previous,
                    pruned_previous: true,
                } => {
                    self.cursors.remove(&previous);
                }
                _ => {}
            }
            self.diagnostics.record_reconciliation(outcome);
        }

        trace!(
            leaf = %pending.leaf,
            depth = pending.depth,
            steps = pending.steps,
            reward,
            "MCTS iteration complete"
        );
    }

    /// Promote the root's best child (pure max, no exploration) and discard
    /// everything else, including transposition entries and cursors of the
    /// removed nodes.
    fn reroot(&mut self) -> RerootOutcome {
        let old_root = self.tree.root();
        let promoted = self
            .tree
            .best_child(old_root, 1.0, 0.0)
            .and_then(|best| self.tree.promote(best).map(|removed| (best, removed)));

        let Some((new_root, removed)) = promoted else {
            info!(root = %old_root, "Re-root skipped: root has no children");
            self.diagnostics.record_reroot(false);
            return RerootOutcome::NoChild;
        };

        for (id, node) in &removed {
            self.table
                .remove_if_points_to(&node.state.fingerprint(), *id);
            self.cursors.remove(id);
        }

        if let Some(pending) = &self.pending {
            if !self.tree.contains(pending.leaf) {
                debug!(leaf = %pending.leaf, "Re-root discarded pending rollout");
                self.pending = None;
                self.diagnostics.record_stale_rollout();
            }
        }

        self.diagnostics.record_reroot(true);
        info!(
            old_root = %old_root,
            new_root = %new_root,
            removed = removed.len(),
            nodes = self.tree.len(),
            "Re-rooted planner"
        );

        RerootOutcome::Promoted {
            new_root,
            removed: removed.len(),
        }
    }
}

/// Convenience function to run a single budget cycle and return the best
/// action from `initial_state`.
pub fn run_planner<S, Src, R>(
    initial_state: S,
    source: Src,
    rollout: R,
    config: PlannerConfig,
) -> Result<PlanResult<Src::Action>, PlannerError>
where
    S: PlanState,
    Src: ActionSource<S>,
    Src::Action: Clone,
    R: RolloutPolicy<S>,
{
    let mut planner = Planner::new(initial_state, source, rollout, config)?;
    let snapshot = planner.advance();

    Ok(PlanResult {
        action: snapshot.best_action().cloned(),
        iterations: snapshot.iterations,
        value: snapshot.tree[snapshot.root].score_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TickClock;
    use crate::rollout::RolloutStep::{Estimate, Finished, Working};
    use crate::test_util::{ScriptedRollout, TableSource, Toy};

    type ToyPlanner = Planner<Toy, TableSource, ScriptedRollout, TickClock>;

    fn planner(source: TableSource, rollout: ScriptedRollout, config: PlannerConfig) -> ToyPlanner {
        Planner::with_clock(
            Toy::new(0),
            source,
            rollout,
            config,
            TickClock::new(Duration::from_millis(1)),
        )
        .unwrap()
    }

    fn roomy(iterations: u32) -> PlannerConfig {
        PlannerConfig::for_testing()
            .with_time_budget_ms(1_000_000)
            .with_max_iterations_per_cycle(Some(iterations))
    }

    fn three_children() -> ToyPlanner {
        let source = TableSource::new().with(0, vec![Toy::new(1), Toy::new(2), Toy::new(3)]);
        let rollout = ScriptedRollout::new(0.0)
            .reward(1, 0.2)
            .reward(2, 0.9)
            .reward(3, 0.5);
        planner(source, rollout, roomy(3))
    }

    fn assert_tree_invariants(planner: &ToyPlanner) {
        let tree = planner.tree();
        let mut roots = 0;
        for (id, node) in tree.iter() {
            match node.incoming {
                None => {
                    roots += 1;
                    assert_eq!(id, tree.root());
                }
                Some(parent) => {
                    assert!(tree[parent].edge_to(id).is_some(), "{id} not linked from parent");
                }
            }
            assert!(tree.is_reachable(id), "{id} is orphaned");
            if !node.is_leaf() && node.visits > 0 {
                let child_max = node
                    .outgoing
                    .iter()
                    .map(|edge| tree[edge.child].score_max)
                    .fold(f64::NEG_INFINITY, f64::max);
                assert!(
                    (node.score_max - child_max).abs() < 1e-12,
                    "{id} score_max {} != child max {child_max}",
                    node.score_max
                );
            }
        }
        assert_eq!(roots, 1);

        for (_, id) in planner.transpositions().iter() {
            assert!(tree.is_reachable(*id));
        }
    }

    #[test]
    fn test_zero_exploration_is_rejected() {
        let result = Planner::new(
            Toy::new(0),
            TableSource::new(),
            ScriptedRollout::new(0.5),
            PlannerConfig::for_testing().with_exploration_factor(0.0),
        );
        assert!(matches!(
            result,
            Err(PlannerError::InvalidExplorationFactor(_))
        ));
    }

    #[test]
    fn test_status_transitions() {
        let mut planner = three_children();
        assert_eq!(planner.status(), PlannerStatus::Idle);

        planner.advance();
        assert_eq!(planner.status(), PlannerStatus::Suspended);

        planner.control(ResumeInstruction::default());
        assert_eq!(planner.status(), PlannerStatus::Suspended);
        assert_eq!(planner.cycle(), 1);
    }

    #[test]
    fn test_best_child_and_reroot_scenario() {
        let mut planner = three_children();

        let snapshot = planner.advance();
        assert_eq!(snapshot.iterations, 3);
        assert_eq!(snapshot.best_action(), Some(&2));
        let best = snapshot.best_path().next().unwrap().node;
        let old_root = snapshot.root;
        assert_eq!(planner.tree().best_child(old_root, 1.0, 0.0), Some(best));

        let outcome = planner.control(ResumeInstruction::re_root());

        assert_eq!(
            outcome.reroot,
            Some(RerootOutcome::Promoted {
                new_root: best,
                removed: 3
            })
        );
        assert_eq!(planner.root(), best);
        assert!(planner.tree()[best].is_root());
        assert_eq!(planner.tree().len(), 1);
        let table = planner.transpositions();
        assert_eq!(table.lookup(&0), None);
        assert_eq!(table.lookup(&1), None);
        assert_eq!(table.lookup(&3), None);
        assert_eq!(table.lookup(&2), Some(best));
        assert_tree_invariants(&planner);
    }

    #[test]
    fn test_reroot_without_children_fails_quietly() {
        let mut planner = three_children();

        let outcome = planner.control(ResumeInstruction::re_root());

        assert_eq!(outcome.reroot, Some(RerootOutcome::NoChild));
        assert_eq!(planner.diagnostics().reroot_failures(), 1);
        assert_eq!(planner.tree().len(), 1);
        assert_eq!(planner.status(), PlannerStatus::Idle);
    }

    #[test]
    fn test_diagnostics_are_emitted_before_reroot() {
        let mut planner = three_children();
        planner.advance();

        let outcome = planner.control(ResumeInstruction {
            emit_diagnostics: true,
            re_root: true,
        });

        let diagnostics = outcome.diagnostics.unwrap();
        assert_eq!(diagnostics.node_count, 4);
        assert_eq!(diagnostics.expansions, 3);
        assert_eq!(diagnostics.depth_histogram.get(&1), Some(&3));
        assert!(matches!(
            outcome.reroot,
            Some(RerootOutcome::Promoted { .. })
        ));
        assert_eq!(planner.tree().len(), 1);
    }

    #[test]
    fn test_visit_conservation_and_invariants() {
        let source = TableSource::new()
            .with(0, vec![Toy::new(1), Toy::new(2)])
            .with(1, vec![Toy::new(3), Toy::new(4)])
            .with(2, vec![Toy::new(5)])
            .with(4, vec![Toy::new(6)]);
        let rollout = ScriptedRollout::new(0.1)
            .reward(1, 0.4)
            .reward(2, 0.6)
            .reward(3, 0.2)
            .reward(4, 0.8)
            .reward(5, 0.5)
            .reward(6, 0.3);
        let mut planner = planner(source, rollout, roomy(25));

        let snapshot = planner.advance();
        assert_eq!(snapshot.iterations, 25);
        assert_eq!(planner.tree()[planner.root()].visits, 25);
        assert_eq!(planner.total_iterations(), 25);
        assert_tree_invariants(&planner);

        planner.control(ResumeInstruction::re_root());
        assert_tree_invariants(&planner);

        let before = planner.tree()[planner.root()].visits;
        let snapshot = planner.advance();
        let iterations = snapshot.iterations;
        assert_eq!(planner.tree()[planner.root()].visits, before + iterations);
        assert_tree_invariants(&planner);
    }

    #[test]
    fn test_duplicate_fingerprint_supersedes_childless_canonical() {
        let source = TableSource::new().with(0, vec![Toy::aliased(10, 77), Toy::aliased(11, 77)]);
        let rollout = ScriptedRollout::new(0.0).reward(10, 0.80).reward(11, 0.95);
        let mut planner = planner(
            source,
            rollout,
            roomy(2).with_percent_better_node(0.10),
        );

        planner.advance();

        let tree = planner.tree();
        let root = &tree[planner.root()];
        assert_eq!(root.outgoing.len(), 1);
        let survivor = root.outgoing[0].child;
        assert_eq!(tree[survivor].state.key, 11);
        assert_eq!(planner.transpositions().lookup(&77), Some(survivor));
        assert_eq!(planner.diagnostics().transpositions().pruned_canonicals, 1);
        assert_tree_invariants(&planner);
    }

    #[test]
    fn test_rollout_resumes_across_cycles() {
        let source = TableSource::new().with(0, vec![Toy::new(1)]);
        let rollout = ScriptedRollout::new(0.0).script(
            1,
            vec![Working, Working, Working, Estimate(0.7), Finished],
        );
        let config = PlannerConfig::for_testing()
            .with_time_budget_ms(3)
            .with_max_iterations_per_cycle(Some(1));
        let mut planner = planner(source, rollout, config);

        let snapshot = planner.advance();
        assert_eq!(snapshot.iterations, 0);
        assert_eq!(snapshot.pending_reward, None);
        assert!(planner.has_pending_rollout());
        let child = planner.tree()[planner.root()].outgoing[0].child;
        assert_eq!(planner.tree()[child].visits, 0);

        let snapshot = planner.advance();
        assert_eq!(snapshot.iterations, 1);
        assert!(!planner.has_pending_rollout());
        assert_eq!(planner.tree()[child].visits, 1);
        assert!((planner.tree()[child].score_max - 0.7).abs() < 1e-12);
        // Resumed, not restarted
        assert_eq!(planner.rollout_policy().started, vec![1]);
        assert_eq!(planner.diagnostics().rewards().count, 1);
    }

    #[test]
    fn test_step_ceiling_yields_zero_reward() {
        let source = TableSource::new().with(0, vec![Toy::new(1)]);
        let mut script = vec![Working; 10];
        script.push(Estimate(0.9));
        script.push(Finished);
        let rollout = ScriptedRollout::new(0.0).script(1, script);
        let mut planner = planner(source, rollout, roomy(1).with_rollout_step_ceiling(3));

        planner.advance();

        let child = planner.tree()[planner.root()].outgoing[0].child;
        assert_eq!(planner.tree()[child].visits, 1);
        assert!(planner.tree()[child].score_max.abs() < 1e-12);
        assert_eq!(planner.diagnostics().ceiling_hits(), 1);
    }

    #[test]
    fn test_result_after_last_allowed_step_is_kept() {
        let source = TableSource::new().with(0, vec![Toy::new(1)]);
        let mut script = vec![Working; 3];
        script.push(Estimate(0.9));
        script.push(Finished);
        let rollout = ScriptedRollout::new(0.0).script(1, script);
        let mut planner = planner(source, rollout, roomy(1).with_rollout_step_ceiling(3));

        planner.advance();

        let child = planner.tree()[planner.root()].outgoing[0].child;
        assert!((planner.tree()[child].score_max - 0.9).abs() < 1e-12);
        assert_eq!(planner.diagnostics().ceiling_hits(), 0);
    }

    #[test]
    fn test_rollout_without_estimate_yields_zero() {
        let source = TableSource::new().with(0, vec![Toy::new(1)]);
        let rollout = ScriptedRollout::new(0.0).script(1, vec![Working, Finished]);
        let mut planner = planner(source, rollout, roomy(1));

        planner.advance();

        let child = planner.tree()[planner.root()].outgoing[0].child;
        assert_eq!(planner.tree()[child].visits, 1);
        let outcome = planner.control(ResumeInstruction::diagnostics());
        assert_eq!(outcome.diagnostics.unwrap().estimate_less, 1);
    }

    #[test]
    fn test_reroot_drops_rollout_on_discarded_node() {
        let source = TableSource::new().with(0, vec![Toy::new(1), Toy::new(2)]);
        let rollout = ScriptedRollout::new(0.0)
            .reward(1, 0.9)
            .script(2, vec![Working; 20]);
        let config = PlannerConfig::for_testing()
            .with_time_budget_ms(5)
            .with_max_iterations_per_cycle(None);
        let mut planner = planner(source, rollout, config);

        let snapshot = planner.advance();
        assert_eq!(snapshot.iterations, 1);
        assert!(planner.has_pending_rollout());

        let outcome = planner.control(ResumeInstruction::re_root());

        assert!(matches!(
            outcome.reroot,
            Some(RerootOutcome::Promoted { removed: 2, .. })
        ));
        assert!(!planner.has_pending_rollout());
        assert_eq!(planner.diagnostics().stale_rollouts(), 1);
        assert_eq!(planner.tree()[planner.root()].state.key, 1);

        let visits_before = planner.tree()[planner.root()].visits;
        let snapshot = planner.advance();
        let iterations = snapshot.iterations;
        assert!(iterations > 0);
        assert_eq!(
            planner.tree()[planner.root()].visits,
            visits_before + iterations
        );
    }

    #[test]
    fn test_terminal_root_is_never_expanded() {
        let source = TableSource::new().with(0, vec![Toy::new(1)]);
        let mut planner = Planner::with_clock(
            Toy::new(0).terminal(),
            source,
            ScriptedRollout::new(1.0),
            roomy(5),
            TickClock::new(Duration::from_millis(1)),
        )
        .unwrap();

        let snapshot = planner.advance();

        assert_eq!(snapshot.iterations, 5);
        assert_eq!(snapshot.best_action(), None);
        assert_eq!(planner.source().requests, 0);
        assert_eq!(planner.tree().len(), 1);
    }

    #[test]
    fn test_exhausted_leaf_is_marked_terminal() {
        let source = TableSource::new().with(0, vec![Toy::new(1)]);
        let mut planner = planner(source, ScriptedRollout::new(0.5), roomy(3));

        planner.advance();

        let tree = planner.tree();
        let child = tree[planner.root()].outgoing[0].child;
        assert!(tree[planner.root()].exhausted);
        assert!(tree[child].marked_terminal);
        assert_eq!(tree[child].visits, 3);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_best_path_is_lazy_max_chain() {
        let source = TableSource::new()
            .with(0, vec![Toy::new(1), Toy::new(2)])
            .with(2, vec![Toy::new(3)]);
        let rollout = ScriptedRollout::new(0.0)
            .reward(1, 0.1)
            .reward(2, 0.6)
            .reward(3, 0.9);
        let mut planner = planner(source, rollout, roomy(3));

        let snapshot = planner.advance();
        let actions: Vec<u32> = snapshot.best_path().map(|step| *step.action).collect();

        assert_eq!(actions, vec![2, 3]);
    }

    #[test]
    fn test_run_planner() {
        let source = TableSource::new().with(0, vec![Toy::new(1), Toy::new(2)]);
        let rollout = ScriptedRollout::new(0.0).reward(1, 0.3).reward(2, 0.7);

        let result = run_planner(Toy::new(0), source, rollout, roomy(2)).unwrap();

        assert_eq!(result.action, Some(2));
        assert_eq!(result.iterations, 2);
        assert!((result.value - 0.7).abs() < 1e-12);
    }
}
