//! 3-D grid world for the trailblazer planner
//!
//! This crate provides a reference environment for the `mcts` planner: a
//! lattice of stances with obstacles and a goal, a randomized action source
//! and a resumable goal-biased rollout policy.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use grid_world::{GridActions, GridRollout, GridState, GridWorld, Position, RolloutParams};
//! use mcts::{Planner, PlannerConfig};
//!
//! let world = Arc::new(
//!     GridWorld::generate(Position::new(8, 1, 8), Position::new(0, 0, 0), Position::new(7, 0, 7), 0.1, 42)
//!         .unwrap(),
//! );
//! let start = GridState::start(&world, Position::new(0, 0, 0));
//! let actions = GridActions::new(world.clone(), 7);
//! let rollout = GridRollout::new(world.clone(), RolloutParams::default(), 11);
//! let config = PlannerConfig::for_testing();
//!
//! let mut planner = Planner::new(start, actions, rollout, config).unwrap();
//! let snapshot = planner.advance();
//! assert!(snapshot.best_action().is_some());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use mcts::{ActionResult, ActionSource, PlanState};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

pub mod reward;
pub mod rollout;

pub use reward::{composite_reward, distance_reward, efficiency_reward, RewardWeights};
pub use rollout::{GridRollout, GridRolloutStream, RolloutParams};

/// Errors raised when building a world or its collaborators.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("world dimensions must be positive, got {0}")]
    InvalidDimensions(Position),

    #[error("{name} position {position} is outside the world")]
    OutOfBounds {
        name: &'static str,
        position: Position,
    },

    #[error("obstacle density must be in [0, 1), got {0}")]
    InvalidDensity(f64),

    #[error("{name} must be between 0 and 1 inclusive, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
}

/// Lattice coordinate. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }

    /// Euclidean distance.
    pub fn distance_to(self, other: Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        let dz = f64::from(self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Pack into a single integer: 21 bits per axis.
    pub fn pack(self) -> u64 {
        const MASK: u64 = (1 << 21) - 1;
        ((self.x as u64 & MASK) << 42) | ((self.y as u64 & MASK) << 21) | (self.z as u64 & MASK)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Kinds of movement between neighbouring stances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    /// One cell along x or z
    Walk,
    /// One cell along x or z and one up
    Climb,
    /// One cell along x or z and one down
    Drop,
    /// One cell along both x and z
    Diagonal,
}

impl MoveKind {
    pub fn cost(self) -> f64 {
        match self {
            MoveKind::Walk => 1.0,
            MoveKind::Climb => 2.0,
            MoveKind::Drop => 1.0,
            MoveKind::Diagonal => 1.5,
        }
    }
}

/// A single move between two positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    pub kind: MoveKind,
    pub from: Position,
    pub to: Position,
}

impl Move {
    pub fn cost(&self) -> f64 {
        self.kind.cost()
    }

    pub fn length(&self) -> f64 {
        self.from.distance_to(self.to)
    }
}

const CARDINALS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONALS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Bounded lattice with blocked cells and a goal.
#[derive(Debug, Clone)]
pub struct GridWorld {
    size: Position,
    blocked: HashSet<Position>,
    goal: Position,
}

impl GridWorld {
    /// Empty world of the given size.
    pub fn new(size: Position, goal: Position) -> Result<Self, GridError> {
        if size.x <= 0 || size.y <= 0 || size.z <= 0 {
            return Err(GridError::InvalidDimensions(size));
        }
        let world = Self {
            size,
            blocked: HashSet::new(),
            goal,
        };
        if !world.in_bounds(goal) {
            return Err(GridError::OutOfBounds {
                name: "goal",
                position: goal,
            });
        }
        Ok(world)
    }

    /// Random world: every cell except `start` and `goal` is blocked with
    /// probability `density`.
    pub fn generate(
        size: Position,
        start: Position,
        goal: Position,
        density: f64,
        seed: u64,
    ) -> Result<Self, GridError> {
        if !(0.0..1.0).contains(&density) {
            return Err(GridError::InvalidDensity(density));
        }
        let mut world = Self::new(size, goal)?;
        if !world.in_bounds(start) {
            return Err(GridError::OutOfBounds {
                name: "start",
                position: start,
            });
        }

        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        for x in 0..size.x {
            for y in 0..size.y {
                for z in 0..size.z {
                    let position = Position::new(x, y, z);
                    if position != start && position != goal && rng.gen_bool(density) {
                        world.blocked.insert(position);
                    }
                }
            }
        }

        Ok(world)
    }

    /// Add obstacles. The goal cell is never blocked.
    pub fn with_obstacles(mut self, obstacles: impl IntoIterator<Item = Position>) -> Self {
        let goal = self.goal;
        self.blocked
            .extend(obstacles.into_iter().filter(|&position| position != goal));
        self
    }

    pub fn size(&self) -> Position {
        self.size
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    pub fn obstacle_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        (0..self.size.x).contains(&position.x)
            && (0..self.size.y).contains(&position.y)
            && (0..self.size.z).contains(&position.z)
    }

    pub fn is_blocked(&self, position: Position) -> bool {
        self.blocked.contains(&position)
    }

    pub fn is_open(&self, position: Position) -> bool {
        self.in_bounds(position) && !self.is_blocked(position)
    }

    pub fn distance_to_goal(&self, position: Position) -> u32 {
        position.manhattan(self.goal)
    }

    /// All moves out of `from` that land on an open cell.
    /// Diagonals may not cut a blocked corner.
    pub fn moves_from(&self, from: Position) -> Vec<Move> {
        let mut moves = Vec::with_capacity(16);
        let mut push = |kind, to: Position| {
            if self.is_open(to) {
                moves.push(Move { kind, from, to });
            }
        };

        for (dx, dz) in CARDINALS {
            push(MoveKind::Walk, from.offset(dx, 0, dz));
            push(MoveKind::Climb, from.offset(dx, 1, dz));
            push(MoveKind::Drop, from.offset(dx, -1, dz));
        }
        for (dx, dz) in DIAGONALS {
            if self.is_open(from.offset(dx, 0, 0)) && self.is_open(from.offset(0, 0, dz)) {
                push(MoveKind::Diagonal, from.offset(dx, 0, dz));
            }
        }

        moves
    }
}

/// Link in a persistent path list, newest first.
#[derive(Debug)]
struct PathLink {
    position: Position,
    previous: Option<Arc<PathLink>>,
}

/// A stance reached along an elementary path from the search origin.
#[derive(Debug, Clone)]
pub struct GridState {
    pub position: Position,
    pub cost_to_come: f64,
    pub distance_traveled: f64,
    pub goal_reached: bool,
    path: Arc<PathLink>,
}

impl GridState {
    /// Origin state at `position`.
    pub fn start(world: &GridWorld, position: Position) -> Self {
        Self {
            position,
            cost_to_come: 0.0,
            distance_traveled: 0.0,
            goal_reached: position == world.goal(),
            path: Arc::new(PathLink {
                position,
                previous: None,
            }),
        }
    }

    /// State after applying `mv` from this state.
    pub fn apply(&self, mv: &Move, goal: Position) -> Self {
        Self {
            position: mv.to,
            cost_to_come: self.cost_to_come + mv.cost(),
            distance_traveled: self.distance_traveled + mv.length(),
            goal_reached: mv.to == goal,
            path: Arc::new(PathLink {
                position: mv.to,
                previous: Some(self.path.clone()),
            }),
        }
    }

    /// Positions on the path to this state, newest first.
    pub fn path(&self) -> impl Iterator<Item = Position> + '_ {
        std::iter::successors(Some(self.path.as_ref()), |link| link.previous.as_deref())
            .map(|link| link.position)
    }

    /// Every position on the path, including this state's own.
    pub fn visited(&self) -> HashSet<Position> {
        self.path().collect()
    }
}

impl PlanState for GridState {
    type Fingerprint = u64;

    fn fingerprint(&self) -> u64 {
        self.position.pack()
    }

    fn cost_to_come(&self) -> f64 {
        self.cost_to_come
    }

    fn is_terminal(&self) -> bool {
        self.goal_reached
    }

    fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    fn distance_traveled(&self) -> f64 {
        self.distance_traveled
    }
}

/// Randomized action source over a shared world.
///
/// Neighbours are offered in a fresh random order for each state. Moves back
/// onto the state's own path are rejected so that every tree path is
/// elementary.
#[derive(Debug)]
pub struct GridActions {
    world: Arc<GridWorld>,
    rng: ChaCha20Rng,
    pub accepted: u64,
    pub rejected: u64,
}

impl GridActions {
    pub fn new(world: Arc<GridWorld>, seed: u64) -> Self {
        Self {
            world,
            rng: ChaCha20Rng::seed_from_u64(seed),
            accepted: 0,
            rejected: 0,
        }
    }
}

/// Lazy iterator over a state's moves; child states are built on demand.
#[derive(Debug)]
pub struct GridActionIter {
    parent: GridState,
    goal: Position,
    moves: std::vec::IntoIter<Move>,
}

impl Iterator for GridActionIter {
    type Item = ActionResult<Move, GridState>;

    fn next(&mut self) -> Option<Self::Item> {
        let mv = self.moves.next()?;
        Some(ActionResult::new(mv, self.parent.apply(&mv, self.goal)))
    }
}

impl ActionSource<GridState> for GridActions {
    type Action = Move;
    type Iter = GridActionIter;

    fn actions(&mut self, state: &GridState) -> GridActionIter {
        let mut moves = if state.goal_reached {
            Vec::new()
        } else {
            self.world.moves_from(state.position)
        };

        let visited = state.visited();
        let before = moves.len();
        moves.retain(|mv| !visited.contains(&mv.to));
        self.rejected += (before - moves.len()) as u64;
        self.accepted += moves.len() as u64;

        moves.shuffle(&mut self.rng);

        GridActionIter {
            parent: state.clone(),
            goal: self.world.goal(),
            moves: moves.into_iter(),
        }
    }
}
