//! Planner diagnostics.
//!
//! Counters are accumulated by the driver as it runs and emitted through
//! `tracing` when the caller asks for diagnostics in a resume instruction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::transposition::Reconciliation;
use crate::tree::TreeStats;

/// Budget cycles kept in the per-cycle reward history.
pub const REWARD_HISTORY_CYCLES: usize = 256;

/// Transposition outcomes, one counter per [`Reconciliation`] kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranspositionCounters {
    pub new_states: u64,
    pub duplicates: u64,
    pub pruned_duplicates: u64,
    pub kept_duplicates: u64,
    pub superseded: u64,
    pub pruned_canonicals: u64,
    pub kept_both: u64,
    pub terminal_exempt: u64,
    pub stale_entries: u64,
}

impl TranspositionCounters {
    fn record(&mut self, outcome: Reconciliation) {
        match outcome {
            Reconciliation::NewState => self.new_states += 1,
            Reconciliation::SameNode => {}
            Reconciliation::DuplicatePruned { .. } => {
                self.duplicates += 1;
                self.pruned_duplicates += 1;
            }
            Reconciliation::DuplicateKept { .. } => {
                self.duplicates += 1;
                self.kept_duplicates += 1;
            }
            Reconciliation::Superseded {
                pruned_previous, ..
            } => {
                self.duplicates += 1;
                self.superseded += 1;
                if pruned_previous {
                    self.pruned_canonicals += 1;
                } else {
                    self.kept_both += 1;
                }
            }
            Reconciliation::TerminalKept => {
                self.duplicates += 1;
                self.terminal_exempt += 1;
            }
            Reconciliation::StaleEntry => self.stale_entries += 1,
        }
    }
}

/// Running count, sum and range of rollout rewards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl RewardSummary {
    pub fn record(&mut self, reward: f64) {
        if self.count == 0 {
            self.min = reward;
            self.max = reward;
        } else {
            self.min = self.min.min(reward);
            self.max = self.max.max(reward);
        }
        self.count += 1;
        self.sum += reward;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Accumulated planner diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    depth_histogram: BTreeMap<u32, u64>,
    reward_by_cycle: BTreeMap<u64, RewardSummary>,
    rewards: RewardSummary,
    expansions: u64,
    suspensions: u64,
    ceiling_hits: u64,
    estimate_less: u64,
    transpositions: TranspositionCounters,
    reroots: u64,
    reroot_failures: u64,
    stale_rollouts: u64,
    marked_terminal: u64,
    previous_node_count: usize,
}

/// Serializable copy of [`Diagnostics`] plus tree shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub depth_histogram: BTreeMap<u32, u64>,
    /// Mean rollout reward for each of the most recent budget cycles
    pub reward_by_cycle: BTreeMap<u64, f64>,
    pub rewards: RewardSummary,
    pub expansions: u64,
    pub suspensions: u64,
    pub ceiling_hits: u64,
    pub estimate_less: u64,
    pub transpositions: TranspositionCounters,
    pub reroots: u64,
    pub reroot_failures: u64,
    pub stale_rollouts: u64,
    pub marked_terminal: u64,
    pub node_count: usize,
    pub node_count_delta: i64,
    pub edge_count: usize,
    pub max_depth: u32,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the node-count baseline (the tree starts with its root).
    pub fn with_node_count(mut self, nodes: usize) -> Self {
        self.previous_node_count = nodes;
        self
    }

    pub fn record_depth(&mut self, depth: u32) {
        *self.depth_histogram.entry(depth).or_insert(0) += 1;
    }

    pub fn record_reward(&mut self, cycle: u64, reward: f64) {
        self.rewards.record(reward);
        self.reward_by_cycle.entry(cycle).or_default().record(reward);
        while self.reward_by_cycle.len() > REWARD_HISTORY_CYCLES {
            self.reward_by_cycle.pop_first();
        }
    }

    pub fn record_expansion(&mut self) {
        self.expansions += 1;
    }

    pub fn record_suspension(&mut self) {
        self.suspensions += 1;
    }

    pub fn record_ceiling_hit(&mut self) {
        self.ceiling_hits += 1;
    }

    pub fn record_estimate_less(&mut self) {
        self.estimate_less += 1;
    }

    pub fn record_reconciliation(&mut self, outcome: Reconciliation) {
        self.transpositions.record(outcome);
    }

    pub fn record_reroot(&mut self, succeeded: bool) {
        if succeeded {
            self.reroots += 1;
        } else {
            self.reroot_failures += 1;
        }
    }

    pub fn record_stale_rollout(&mut self) {
        self.stale_rollouts += 1;
    }

    pub fn record_marked_terminal(&mut self) {
        self.marked_terminal += 1;
    }

    pub fn rewards(&self) -> &RewardSummary {
        &self.rewards
    }

    pub fn transpositions(&self) -> &TranspositionCounters {
        &self.transpositions
    }

    pub fn reroot_failures(&self) -> u64 {
        self.reroot_failures
    }

    pub fn stale_rollouts(&self) -> u64 {
        self.stale_rollouts
    }

    pub fn ceiling_hits(&self) -> u64 {
        self.ceiling_hits
    }

    /// Copy the current counters without resetting the node-count baseline.
    pub fn snapshot(&self, tree: &TreeStats) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            depth_histogram: self.depth_histogram.clone(),
            reward_by_cycle: self
                .reward_by_cycle
                .iter()
                .map(|(&cycle, summary)| (cycle, summary.mean()))
                .collect(),
            rewards: self.rewards.clone(),
            expansions: self.expansions,
            suspensions: self.suspensions,
            ceiling_hits: self.ceiling_hits,
            estimate_less: self.estimate_less,
            transpositions: self.transpositions.clone(),
            reroots: self.reroots,
            reroot_failures: self.reroot_failures,
            stale_rollouts: self.stale_rollouts,
            marked_terminal: self.marked_terminal,
            node_count: tree.total_nodes,
            node_count_delta: tree.total_nodes as i64 - self.previous_node_count as i64,
            edge_count: tree.total_edges,
            max_depth: tree.max_depth,
        }
    }

    /// Log everything and advance the node-count baseline.
    pub fn emit(&mut self, tree: &TreeStats) -> DiagnosticsSnapshot {
        let snapshot = self.snapshot(tree);
        self.previous_node_count = tree.total_nodes;

        info!(
            nodes = snapshot.node_count,
            node_delta = snapshot.node_count_delta,
            edges = snapshot.edge_count,
            max_depth = snapshot.max_depth,
            root_visits = tree.root_visits,
            root_mean = tree.root_mean,
            root_max = tree.root_score_max,
            "Planner tree"
        );
        info!(
            count = snapshot.rewards.count,
            min = snapshot.rewards.min,
            max = snapshot.rewards.max,
            mean = snapshot.rewards.mean(),
            ceiling_hits = snapshot.ceiling_hits,
            estimate_less = snapshot.estimate_less,
            suspensions = snapshot.suspensions,
            "Rollout rewards"
        );
        let t = &snapshot.transpositions;
        info!(
            new_states = t.new_states,
            duplicates = t.duplicates,
            pruned_duplicates = t.pruned_duplicates,
            kept_duplicates = t.kept_duplicates,
            superseded = t.superseded,
            pruned_canonicals = t.pruned_canonicals,
            kept_both = t.kept_both,
            terminal_exempt = t.terminal_exempt,
            stale_entries = t.stale_entries,
            "Transpositions"
        );
        info!(
            expansions = snapshot.expansions,
            reroots = snapshot.reroots,
            reroot_failures = snapshot.reroot_failures,
            stale_rollouts = snapshot.stale_rollouts,
            marked_terminal = snapshot.marked_terminal,
            "Planner counters"
        );
        debug!(histogram = ?snapshot.depth_histogram, "Expansion depth");
        debug!(by_cycle = ?snapshot.reward_by_cycle, "Mean reward per cycle");

        snapshot
    }
}
