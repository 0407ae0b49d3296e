//! Rollout reward shaping.
//!
//! All rewards are in `[0, 1]`. A weight of 0 switches a term off (it
//! contributes a constant 1), a weight of 1 applies it fully.

use crate::GridError;

/// Reward for closing the distance to the goal.
///
/// 0.5 means no progress. Moving closer scales linearly to 1.0 at the goal;
/// moving away decays as `0.5 * start / current`.
pub fn distance_reward(start_distance: f64, current_distance: f64, weight: f64) -> f64 {
    let reward = if current_distance <= 0.0 {
        1.0
    } else if current_distance < start_distance {
        0.5 + 0.5 * (start_distance - current_distance) / start_distance
    } else {
        0.5 * start_distance / current_distance
    };
    let reward = reward.clamp(0.0, 1.0);
    (1.0 - weight) + weight * reward
}

/// Reward for path efficiency: distance covered per unit of cost.
pub fn efficiency_reward(distance_traveled: f64, cost_to_come: f64, weight: f64) -> f64 {
    let reward = if cost_to_come <= 0.0 {
        1.0
    } else {
        (distance_traveled / cost_to_come).clamp(0.0, 1.0)
    };
    (1.0 - weight) + weight * reward
}

/// Weights for [`composite_reward`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardWeights {
    pub distance: f64,
    pub efficiency: f64,
    /// Share of the reward granted just for reaching the goal
    pub goal_bonus: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            distance: 0.8,
            efficiency: 0.2,
            goal_bonus: 0.3,
        }
    }
}

impl RewardWeights {
    pub fn validate(self) -> Result<Self, GridError> {
        for (name, value) in [
            ("distance_weight", self.distance),
            ("efficiency_weight", self.efficiency),
            ("goal_bonus", self.goal_bonus),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GridError::InvalidWeight { name, value });
            }
        }
        Ok(self)
    }
}

/// Scalarized reward combining goal distance, path efficiency and a bonus
/// for reaching the goal.
pub fn composite_reward(
    start_distance: f64,
    current_distance: f64,
    distance_traveled: f64,
    cost_to_come: f64,
    goal_reached: bool,
    weights: RewardWeights,
) -> f64 {
    let base = distance_reward(start_distance, current_distance, weights.distance)
        * efficiency_reward(distance_traveled, cost_to_come, weights.efficiency);

    if goal_reached {
        weights.goal_bonus + (1.0 - weights.goal_bonus) * base
    } else {
        (1.0 - weights.goal_bonus) * base
    }
}
