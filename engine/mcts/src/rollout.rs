//! Rollout (default policy) contract.
//!
//! A rollout estimates the value of a freshly expanded leaf by simulating a
//! continuation from it. Rollouts can take thousands of simulated steps, so
//! they are modelled as resumable streams: the planner calls
//! [`RolloutStream::step`] once per simulated micro-step and may stop between
//! any two calls when its time budget runs out, picking the stream back up on
//! the next budget cycle.

/// Outcome of a single rollout micro-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RolloutStep {
    /// Work was done but no new estimate is available yet.
    Working,
    /// A refined reward estimate. More steps may follow.
    Estimate(f64),
    /// The stream is exhausted. The most recent estimate is authoritative.
    Finished,
}

/// A resumable rollout in progress.
///
/// Implementations carry their own resume point (move stack, iteration
/// counter, RNG) so that `step` can be called across budget cycles.
pub trait RolloutStream {
    fn step(&mut self) -> RolloutStep;
}

/// Produces rollout streams for leaves of the search tree.
pub trait RolloutPolicy<S> {
    type Stream: RolloutStream;

    /// Start a rollout for `leaf`. `start` is the state at the current root.
    fn rollout(&mut self, start: &S, leaf: &S) -> Self::Stream;
}

/// Adapts a plain iterator of reward estimates into a [`RolloutStream`].
///
/// Every yielded value is reported as an estimate; iterator exhaustion
/// finishes the stream.
#[derive(Debug, Clone)]
pub struct Estimates<I> {
    inner: I,
}

impl<I> Estimates<I>
where
    I: Iterator<Item = f64>,
{
    pub fn new(values: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: values.into_iter(),
        }
    }
}

impl<I> RolloutStream for Estimates<I>
where
    I: Iterator<Item = f64>,
{
    fn step(&mut self) -> RolloutStep {
        match self.inner.next() {
            Some(value) => RolloutStep::Estimate(value),
            None => RolloutStep::Finished,
        }
    }
}

/// A stream that yields a single fixed reward.
pub fn fixed_reward(reward: f64) -> Estimates<std::iter::Once<f64>> {
    Estimates::new(std::iter::once(reward))
}
