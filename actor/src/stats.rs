//! Run statistics tracking and persistence.
//!
//! This module tracks a single agent run:
//! - Planning cycles and iterations
//! - Moves made by re-rooting, with the walked path and its cost
//! - Why the run stopped
//!
//! The summary is written to a JSON file next to the other run artifacts.

use grid_world::GridState;
use mcts::DiagnosticsSnapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Why the agent loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    GoalReached,
    CycleLimit,
    /// The current cell has no unvisited open neighbour
    Stuck,
    Shutdown,
}

/// Accumulates statistics for one run.
#[derive(Debug)]
pub struct RunStats {
    cycles: u64,
    iterations: u64,
    reroot_failures: u64,
    path: Vec<[i32; 3]>,
    cost: f64,
    distance_traveled: f64,
    goal_reached: bool,
    stop_reason: Option<StopReason>,
    diagnostics: Option<DiagnosticsSnapshot>,
    start_time: Instant,
    stats_path: PathBuf,
}

/// Serializable summary for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub cycles: u64,
    pub iterations: u64,
    pub moves: usize,
    pub reroot_failures: u64,
    pub path: Vec<[i32; 3]>,
    pub cost: f64,
    pub distance_traveled: f64,
    pub goal_reached: bool,
    pub stop_reason: Option<StopReason>,
    pub iterations_per_cycle: f64,
    pub runtime_seconds: f64,
    /// Most recent planner diagnostics, if any were emitted
    pub diagnostics: Option<DiagnosticsSnapshot>,
    pub timestamp: u64,
}

fn coords(state: &GridState) -> [i32; 3] {
    let p = state.position;
    [p.x, p.y, p.z]
}

impl RunStats {
    /// Create a tracker for a run starting at `start`.
    pub fn new(stats_path: impl Into<PathBuf>, start: &GridState) -> Self {
        let stats_path = stats_path.into();

        if let Some(dir) = stats_path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!("Failed to create data directory: {}", e);
            }
        }

        Self {
            cycles: 0,
            iterations: 0,
            reroot_failures: 0,
            path: vec![coords(start)],
            cost: start.cost_to_come,
            distance_traveled: start.distance_traveled,
            goal_reached: start.goal_reached,
            stop_reason: None,
            diagnostics: None,
            start_time: Instant::now(),
            stats_path,
        }
    }

    pub fn record_cycle(&mut self, iterations: u32) {
        self.cycles += 1;
        self.iterations += u64::from(iterations);
    }

    /// Record the agent moving to `state`.
    pub fn record_move(&mut self, state: &GridState) {
        self.path.push(coords(state));
        self.cost = state.cost_to_come;
        self.distance_traveled = state.distance_traveled;
        self.goal_reached = state.goal_reached;
    }

    pub fn record_reroot_failure(&mut self) {
        self.reroot_failures += 1;
    }

    pub fn record_diagnostics(&mut self, snapshot: DiagnosticsSnapshot) {
        self.diagnostics = Some(snapshot);
    }

    pub fn finish(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn moves(&self) -> usize {
        self.path.len() - 1
    }

    /// Get a snapshot of current stats.
    pub fn snapshot(&self) -> RunSummary {
        let iterations_per_cycle = if self.cycles > 0 {
            self.iterations as f64 / self.cycles as f64
        } else {
            0.0
        };

        RunSummary {
            cycles: self.cycles,
            iterations: self.iterations,
            moves: self.moves(),
            reroot_failures: self.reroot_failures,
            path: self.path.clone(),
            cost: self.cost,
            distance_traveled: self.distance_traveled,
            goal_reached: self.goal_reached,
            stop_reason: self.stop_reason,
            iterations_per_cycle,
            runtime_seconds: self.start_time.elapsed().as_secs_f64(),
            diagnostics: self.diagnostics.clone(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Write stats to JSON file (atomic write-then-rename).
    pub fn write_stats(&self) {
        let snapshot = self.snapshot();

        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(j) => j,
            Err(e) => {
                warn!("Failed to serialize run stats: {}", e);
                return;
            }
        };

        // Write to temp file then rename (atomic on most filesystems)
        let temp_path = self.stats_path.with_extension("json.tmp");
        match fs::File::create(&temp_path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(json.as_bytes()) {
                    warn!("Failed to write run stats: {}", e);
                    return;
                }
            }
            Err(e) => {
                warn!("Failed to create temp stats file: {}", e);
                return;
            }
        }

        if let Err(e) = fs::rename(&temp_path, &self.stats_path) {
            warn!("Failed to rename stats file: {}", e);
            let _ = fs::remove_file(&temp_path);
            return;
        }

        debug!("Wrote run stats to {}", self.stats_path.display());
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }
}
