//! Goal-biased depth-first rollout policy.
//!
//! The rollout walks from the leaf toward the goal by depth-first search
//! over a move stack. Far from the goal the next move is unconstrained with
//! probability `goal_bias`, and otherwise must reduce the distance to the
//! goal. Within 15 cells that probability shrinks linearly, and within 5 cells
//! every move must make progress. Dead
//! ends pop the stack, and after repeated dead ends a random number of extra
//! frames is popped to escape pockets. The stream reports an intermediate
//! estimate every `estimate_interval` steps and a final composite reward once
//! the goal is reached or the stack empties.

use std::collections::HashSet;
use std::sync::Arc;

use mcts::{RolloutPolicy, RolloutStep, RolloutStream};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::reward::{composite_reward, RewardWeights};
use crate::{GridError, GridState, GridWorld, Move, Position};

/// Dead ends tolerated before random multi-pops kick in.
const POP_TOLERANCE: u32 = 10;
/// Upper bound on frames removed by one random multi-pop.
const MAX_RANDOM_POP: usize = 20;

/// Rollout tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutParams {
    /// Probability that a move far from the goal may ignore distance
    /// progress. Near the goal progress is insisted on regardless.
    pub goal_bias: f64,
    /// Steps between intermediate estimates; 0 disables them
    pub estimate_interval: u32,
    pub weights: RewardWeights,
}

impl Default for RolloutParams {
    fn default() -> Self {
        Self {
            goal_bias: 0.9,
            estimate_interval: 50,
            weights: RewardWeights::default(),
        }
    }
}

impl RolloutParams {
    pub fn validate(self) -> Result<Self, GridError> {
        if !(0.0..=1.0).contains(&self.goal_bias) {
            return Err(GridError::InvalidWeight {
                name: "goal_bias",
                value: self.goal_bias,
            });
        }
        self.weights.validate()?;
        Ok(self)
    }
}

/// Starts a [`GridRolloutStream`] per leaf. Each stream gets its own RNG
/// seeded from this policy's RNG, so runs are reproducible.
#[derive(Debug)]
pub struct GridRollout {
    world: Arc<GridWorld>,
    params: RolloutParams,
    rng: ChaCha20Rng,
    pub started: u64,
}

impl GridRollout {
    pub fn new(world: Arc<GridWorld>, params: RolloutParams, seed: u64) -> Self {
        Self {
            world,
            params,
            rng: ChaCha20Rng::seed_from_u64(seed),
            started: 0,
        }
    }
}

impl RolloutPolicy<GridState> for GridRollout {
    type Stream = GridRolloutStream;

    fn rollout(&mut self, start: &GridState, leaf: &GridState) -> GridRolloutStream {
        self.started += 1;
        GridRolloutStream::new(
            self.world.clone(),
            self.params,
            start,
            leaf,
            ChaCha20Rng::seed_from_u64(self.rng.gen()),
        )
    }
}

#[derive(Debug)]
struct Frame {
    position: Position,
    distance_traveled: f64,
    cost_to_come: f64,
    distance_to_goal: u32,
    /// Untried moves, shuffled on first use
    candidates: Option<Vec<Move>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Searching,
    Report(f64),
    Done,
}

/// Resumable rollout: all progress lives in the move stack, so the planner
/// can stop between any two steps.
#[derive(Debug)]
pub struct GridRolloutStream {
    world: Arc<GridWorld>,
    params: RolloutParams,
    rng: ChaCha20Rng,
    stack: Vec<Frame>,
    visited: HashSet<Position>,
    start_distance: f64,
    ensure_progress: bool,
    dead_ends: u32,
    steps: u32,
    phase: Phase,
}

impl GridRolloutStream {
    pub fn new(
        world: Arc<GridWorld>,
        params: RolloutParams,
        start: &GridState,
        leaf: &GridState,
        mut rng: ChaCha20Rng,
    ) -> Self {
        let start_distance = f64::from(world.distance_to_goal(start.position));
        let ensure_progress = rng.gen::<f64>() >= params.goal_bias;
        let frame = Frame {
            position: leaf.position,
            distance_traveled: leaf.distance_traveled,
            cost_to_come: leaf.cost_to_come,
            distance_to_goal: world.distance_to_goal(leaf.position),
            candidates: None,
        };

        Self {
            world,
            params,
            rng,
            stack: vec![frame],
            visited: leaf.visited(),
            start_distance,
            ensure_progress,
            dead_ends: 0,
            steps: 0,
            phase: Phase::Searching,
        }
    }

    /// Frames currently on the move stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Reward if the rollout stopped at the top of the stack now.
    fn reward_at_top(&self, goal_reached: bool) -> f64 {
        match self.stack.last() {
            Some(top) => composite_reward(
                self.start_distance,
                f64::from(top.distance_to_goal),
                top.distance_traveled,
                top.cost_to_come,
                goal_reached,
                self.params.weights,
            ),
            None => 0.0,
        }
    }

    /// Scale goal bias down close to the goal. Zero within 5 cells.
    fn distance_bias(distance_to_goal: u32) -> f64 {
        if distance_to_goal <= 15 {
            ((f64::from(distance_to_goal) - 5.0) / 10.0).max(0.0)
        } else {
            1.0
        }
    }

    /// Whether the move after one made from `distance_to_goal` must reduce
    /// the distance, given a uniform draw in `[0, 1)`.
    fn insists_on_progress(draw: f64, goal_bias: f64, distance_to_goal: u32) -> bool {
        draw >= goal_bias * Self::distance_bias(distance_to_goal)
    }

    fn next_move(&mut self) -> Option<Move> {
        let top = self.stack.last_mut()?;
        let position = top.position;
        let distance_to_goal = top.distance_to_goal;
        let world = &self.world;
        let rng = &mut self.rng;
        let candidates = top.candidates.get_or_insert_with(|| {
            let mut moves = world.moves_from(position);
            moves.shuffle(rng);
            moves
        });

        while let Some(mv) = candidates.pop() {
            if self.visited.contains(&mv.to) {
                continue;
            }
            if self.ensure_progress && self.world.distance_to_goal(mv.to) >= distance_to_goal {
                continue;
            }
            self.ensure_progress = Self::insists_on_progress(
                self.rng.gen::<f64>(),
                self.params.goal_bias,
                distance_to_goal,
            );
            return Some(mv);
        }

        None
    }

    fn pop_frame(&mut self) {
        if let Some(frame) = self.stack.pop() {
            self.visited.remove(&frame.position);
        }
    }

    fn backtrack(&mut self) {
        self.dead_ends += 1;
        if self.dead_ends > POP_TOLERANCE {
            let extra = self.rng.gen_range(0..MAX_RANDOM_POP.min(self.stack.len()).max(1));
            for _ in 0..extra {
                self.pop_frame();
            }
        }
        self.pop_frame();
    }

    fn search_step(&mut self) -> Phase {
        let Some(top) = self.stack.last() else {
            return Phase::Report(0.0);
        };
        if top.position == self.world.goal() {
            return Phase::Report(self.reward_at_top(true));
        }

        match self.next_move() {
            Some(mv) => {
                let (distance_traveled, cost_to_come) = match self.stack.last() {
                    Some(top) => (
                        top.distance_traveled + mv.length(),
                        top.cost_to_come + mv.cost(),
                    ),
                    None => (mv.length(), mv.cost()),
                };
                self.visited.insert(mv.to);
                self.stack.push(Frame {
                    position: mv.to,
                    distance_traveled,
                    cost_to_come,
                    distance_to_goal: self.world.distance_to_goal(mv.to),
                    candidates: None,
                });
            }
            None => {
                self.backtrack();
                if self.stack.is_empty() {
                    return Phase::Report(0.0);
                }
            }
        }

        Phase::Searching
    }
}

impl RolloutStream for GridRolloutStream {
    fn step(&mut self) -> RolloutStep {
        match self.phase {
            Phase::Done => RolloutStep::Finished,
            Phase::Report(reward) => {
                self.phase = Phase::Done;
                RolloutStep::Estimate(reward)
            }
            Phase::Searching => {
                self.steps += 1;
                match self.search_step() {
                    Phase::Report(reward) => {
                        self.phase = Phase::Done;
                        RolloutStep::Estimate(reward)
                    }
                    _ => {
                        let interval = self.params.estimate_interval;
                        if interval > 0 && self.steps % interval == 0 {
                            RolloutStep::Estimate(self.reward_at_top(false))
                        } else {
                            RolloutStep::Working
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_always_insisted_near_goal() {
        for distance in 0..=5 {
            assert!(GridRolloutStream::insists_on_progress(0.0, 1.0, distance));
            assert!(GridRolloutStream::insists_on_progress(0.999, 1.0, distance));
        }
    }

    #[test]
    fn test_goal_bias_frees_moves_far_from_goal() {
        assert!(!GridRolloutStream::insists_on_progress(0.5, 0.9, 40));
        assert!(GridRolloutStream::insists_on_progress(0.5, 0.3, 40));
        // Halfway through the taper, bias 0.8 * 0.5
        assert!(!GridRolloutStream::insists_on_progress(0.35, 0.8, 10));
        assert!(GridRolloutStream::insists_on_progress(0.45, 0.8, 10));
        assert!(GridRolloutStream::insists_on_progress(0.0, 0.0, 40));
    }
}
