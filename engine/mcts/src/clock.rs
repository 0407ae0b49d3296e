//! Time sources for the planner's budget checks.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock that advances by a fixed tick every time it is read.
///
/// With a tick of 1ms and a budget of 10ms, a budget cycle performs a fixed
/// number of clock checks regardless of machine speed.
#[derive(Debug, Clone)]
pub struct TickClock {
    current: Cell<Instant>,
    tick: Duration,
}

impl TickClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            current: Cell::new(Instant::now()),
            tick,
        }
    }
}

impl Clock for TickClock {
    fn now(&self) -> Instant {
        let now = self.current.get();
        self.current.set(now + self.tick);
        now
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
