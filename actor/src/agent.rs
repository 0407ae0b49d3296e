//! Agent loop: alternate planning cycles with resume instructions.
//!
//! Each cycle advances the planner for its time budget. Every
//! `diagnostics_interval` cycles the planner is asked for diagnostics, and
//! every `reroot_interval` cycles the best child of the root is promoted,
//! which is how the agent moves through the world. The loop runs on a
//! blocking thread and checks the shared shutdown flag between cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use grid_world::{GridActions, GridRollout, GridState, GridWorld, Position};
use mcts::{PlanState, Planner, RerootOutcome, ResumeInstruction};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::stats::{RunStats, StopReason};

type GridPlanner = Planner<GridState, GridActions, GridRollout>;

pub struct Agent {
    config: Config,
    world: Arc<GridWorld>,
    planner: GridPlanner,
    stats: RunStats,
    shutdown_signal: Arc<AtomicBool>,
}

impl Agent {
    pub fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Result<Self> {
        let start: Position = config.start.into();
        let goal: Position = config.goal.into();

        let world = GridWorld::generate(
            config.world_size(),
            start,
            goal,
            config.obstacle_density,
            config.world_seed,
        )?;
        info!(
            size = %world.size(),
            obstacles = world.obstacle_count(),
            %start,
            %goal,
            "Generated world"
        );

        Self::with_world(config, Arc::new(world), shutdown_signal)
    }

    /// Create an agent for a prebuilt world, starting at `config.start`.
    pub fn with_world(
        config: Config,
        world: Arc<GridWorld>,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Result<Self> {
        let start: Position = config.start.into();
        if !world.is_open(start) {
            return Err(anyhow!("start {} is blocked or outside the world", start));
        }

        let initial = GridState::start(&world, start);
        let planner = Planner::new(
            initial.clone(),
            GridActions::new(world.clone(), config.action_seed),
            GridRollout::new(world.clone(), config.rollout_params(), config.rollout_seed),
            config.planner_config(),
        )
        .map_err(|e| anyhow!("failed to create planner: {}", e))?;

        let stats = RunStats::new(config.stats_path(), &initial);

        Ok(Self {
            config,
            world,
            planner,
            stats,
            shutdown_signal,
        })
    }

    /// Current agent state (the planner's root).
    pub fn state(&self) -> &GridState {
        &self.planner.tree()[self.planner.root()].state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    fn cycle_limit_reached(&self) -> bool {
        self.config.max_cycles >= 0 && self.stats.cycles() >= self.config.max_cycles as u64
    }

    /// Run until the goal is reached, the cycle limit is hit, the agent is
    /// stuck or shutdown is requested. Writes the run summary on exit.
    pub fn run(&mut self) -> Result<StopReason> {
        info!(
            max_cycles = self.config.max_cycles,
            reroot_interval = self.config.reroot_interval,
            diagnostics_interval = self.config.diagnostics_interval,
            "Agent starting main loop"
        );

        let reason = loop {
            if self.state().goal_reached() {
                break StopReason::GoalReached;
            }
            if self.shutdown_signal.load(Ordering::Relaxed) {
                info!("Shutdown signal received, stopping agent");
                break StopReason::Shutdown;
            }
            if self.cycle_limit_reached() {
                info!("Reached maximum cycles ({}), stopping", self.config.max_cycles);
                break StopReason::CycleLimit;
            }

            if let Some(reason) = self.run_cycle()? {
                break reason;
            }
        };

        self.stats.finish(reason);
        self.stats.write_stats();

        let state = self.state();
        info!(
            ?reason,
            cycles = self.stats.cycles(),
            moves = self.stats.moves(),
            position = %state.position,
            cost = state.cost_to_come,
            distance_to_goal = self.world.distance_to_goal(state.position),
            "Agent finished"
        );
        let actions = self.planner.source();
        debug!(
            actions_accepted = actions.accepted,
            actions_rejected = actions.rejected,
            rollouts = self.planner.rollout_policy().started,
            "Search effort"
        );

        Ok(reason)
    }

    /// One planning cycle plus any instructions due after it.
    fn run_cycle(&mut self) -> Result<Option<StopReason>> {
        let snapshot = self.planner.advance();
        let iterations = snapshot.iterations;
        let pending = snapshot.pending_reward;
        self.stats.record_cycle(iterations);

        let cycle = self.stats.cycles();
        debug!(cycle, iterations, ?pending, "Planning cycle complete");

        let instruction = ResumeInstruction {
            emit_diagnostics: is_due(cycle, self.config.diagnostics_interval),
            re_root: is_due(cycle, self.config.reroot_interval),
        };
        if instruction == ResumeInstruction::default() {
            return Ok(None);
        }

        let outcome = self.planner.control(instruction);
        if let Some(diagnostics) = outcome.diagnostics {
            self.stats.record_diagnostics(diagnostics);
        }

        match outcome.reroot {
            Some(RerootOutcome::Promoted { new_root, removed }) => {
                let state = &self.planner.tree()[new_root].state;
                info!(
                    cycle,
                    position = %state.position,
                    cost = state.cost_to_come,
                    removed,
                    "Moved"
                );
                self.stats.record_move(state);
            }
            Some(RerootOutcome::NoChild) => {
                self.stats.record_reroot_failure();
                let root = &self.planner.tree()[self.planner.root()];
                if root.exhausted && root.outgoing.is_empty() {
                    warn!(position = %root.state.position, "No move left from current cell");
                    return Ok(Some(StopReason::Stuck));
                }
                debug!(cycle, "Nothing to move to yet");
            }
            None => {}
        }

        Ok(None)
    }
}

fn is_due(cycle: u64, interval: u32) -> bool {
    interval > 0 && cycle % u64::from(interval) == 0
}
