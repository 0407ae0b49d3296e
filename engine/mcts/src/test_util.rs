//! Small fixtures for exercising the planner without a real environment.

use std::collections::HashMap;

use crate::rollout::{RolloutPolicy, RolloutStep, RolloutStream};
use crate::source::{ActionResult, ActionSource};
use crate::state::PlanState;

/// A state identified by a key. Several keys may share a fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Toy {
    pub key: u32,
    pub fingerprint: u32,
    pub terminal: bool,
}

impl Toy {
    pub fn new(key: u32) -> Self {
        Self {
            key,
            fingerprint: key,
            terminal: false,
        }
    }

    pub fn aliased(key: u32, fingerprint: u32) -> Self {
        Self {
            key,
            fingerprint,
            terminal: false,
        }
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }
}

impl PlanState for Toy {
    type Fingerprint = u32;

    fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    fn cost_to_come(&self) -> f64 {
        0.0
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn goal_reached(&self) -> bool {
        self.terminal
    }

    fn distance_traveled(&self) -> f64 {
        0.0
    }
}

/// Action source backed by a fixed successor table keyed by `Toy::key`.
/// The action is the successor's key.
#[derive(Debug, Default)]
pub struct TableSource {
    successors: HashMap<u32, Vec<Toy>>,
    pub requests: u32,
}

impl TableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: u32, children: Vec<Toy>) -> Self {
        self.successors.insert(key, children);
        self
    }
}

impl ActionSource<Toy> for TableSource {
    type Action = u32;
    type Iter = std::vec::IntoIter<ActionResult<u32, Toy>>;

    fn actions(&mut self, state: &Toy) -> Self::Iter {
        self.requests += 1;
        self.successors
            .get(&state.key)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|child| ActionResult::new(child.key, child))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

/// Scripted rollout stream.
#[derive(Debug, Clone)]
pub struct Script {
    steps: std::vec::IntoIter<RolloutStep>,
}

impl RolloutStream for Script {
    fn step(&mut self) -> RolloutStep {
        self.steps.next().unwrap_or(RolloutStep::Finished)
    }
}

/// Rollout policy that replays a per-leaf script. Leaves without a script
/// get `default_reward` in a single step.
#[derive(Debug, Default)]
pub struct ScriptedRollout {
    scripts: HashMap<u32, Vec<RolloutStep>>,
    pub default_reward: f64,
    pub started: Vec<u32>,
}

impl ScriptedRollout {
    pub fn new(default_reward: f64) -> Self {
        Self {
            default_reward,
            ..Self::default()
        }
    }

    pub fn reward(self, key: u32, reward: f64) -> Self {
        self.script(key, vec![RolloutStep::Estimate(reward)])
    }

    pub fn script(mut self, key: u32, steps: Vec<RolloutStep>) -> Self {
        self.scripts.insert(key, steps);
        self
    }
}

impl RolloutPolicy<Toy> for ScriptedRollout {
    type Stream = Script;

    fn rollout(&mut self, _start: &Toy, leaf: &Toy) -> Script {
        self.started.push(leaf.key);
        let steps = self
            .scripts
            .get(&leaf.key)
            .cloned()
            .unwrap_or_else(|| vec![RolloutStep::Estimate(self.default_reward)]);
        Script {
            steps: steps.into_iter(),
        }
    }
}
