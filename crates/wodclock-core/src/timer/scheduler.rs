//! Cooperative one-second tick source.
//!
//! The scheduler owns no thread. [`TickScheduler::start`] hands out a
//! [`TickHandle`] and the host's event loop calls [`TickHandle::poll`]; a tick
//! is delivered when the handle's deadline has passed. Each tick carries the
//! real elapsed time since the previous one, so a loop that was starved for a
//! while (suspended tab, sleeping laptop) catches up in one step instead of
//! drifting.
//!
//! ## Handle lifecycle
//!
//! ```text
//! Armed <-> Suspended
//!   \         /
//!    Cancelled
//! ```
//!
//! Dropping the handle is equivalent to cancelling it.

use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::trace;

use super::clock::Clock;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// One delivered tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Sequence number, starting at 1.
    pub seq: u64,
    /// Real time accounted to this tick. Excludes any suspended interval.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Armed,
    Suspended,
    Cancelled,
}

/// Factory for tick handles sharing one clock.
#[derive(Clone)]
pub struct TickScheduler {
    clock: Rc<dyn Clock>,
    interval: Duration,
}

impl TickScheduler {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self::with_interval(clock, DEFAULT_TICK_INTERVAL)
    }

    pub fn with_interval(clock: Rc<dyn Clock>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_TICK_INTERVAL
        } else {
            interval
        };
        Self { clock, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm a new repeating tick. The first tick is due one interval from now.
    pub fn start(&self) -> TickHandle {
        let now = self.clock.now();
        TickHandle {
            clock: Rc::clone(&self.clock),
            interval: self.interval,
            state: HandleState::Armed,
            last_mark: now,
            carried: Duration::ZERO,
            next_due: now + self.interval,
            seq: 0,
        }
    }
}

/// Cancellable, suspendable scheduled task.
pub struct TickHandle {
    clock: Rc<dyn Clock>,
    interval: Duration,
    state: HandleState,
    /// Point from which unreported elapsed time accumulates while armed.
    last_mark: Instant,
    /// Elapsed time banked when the handle was suspended.
    carried: Duration,
    next_due: Instant,
    seq: u64,
}

impl TickHandle {
    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == HandleState::Armed
    }

    pub fn is_suspended(&self) -> bool {
        self.state == HandleState::Suspended
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == HandleState::Cancelled
    }

    /// Elapsed time not yet reported in a tick.
    pub fn pending(&self) -> Duration {
        match self.state {
            HandleState::Armed => {
                self.carried + self.clock.now().saturating_duration_since(self.last_mark)
            }
            HandleState::Suspended => self.carried,
            HandleState::Cancelled => Duration::ZERO,
        }
    }

    /// Time until the next tick is due; `None` unless armed.
    pub fn until_next(&self) -> Option<Duration> {
        if self.state != HandleState::Armed {
            return None;
        }
        Some(self.next_due.saturating_duration_since(self.clock.now()))
    }

    /// Deliver a tick if one is due.
    pub fn poll(&mut self) -> Option<Tick> {
        if self.state != HandleState::Armed {
            return None;
        }
        let now = self.clock.now();
        if now < self.next_due {
            return None;
        }
        let elapsed = self.carried + now.saturating_duration_since(self.last_mark);
        self.carried = Duration::ZERO;
        self.last_mark = now;
        // Re-arm from now rather than from the missed deadline: a late loop gets
        // one catch-up tick, never a burst.
        self.next_due = now + self.interval;
        self.seq += 1;
        trace!(seq = self.seq, elapsed_ms = elapsed.as_millis() as u64, "tick");
        Some(Tick {
            seq: self.seq,
            elapsed,
        })
    }

    /// Suspend ticking. Returns false if not armed.
    pub fn pause(&mut self) -> bool {
        if self.state != HandleState::Armed {
            return false;
        }
        let now = self.clock.now();
        self.carried += now.saturating_duration_since(self.last_mark);
        self.last_mark = now;
        self.state = HandleState::Suspended;
        true
    }

    /// Resume after [`pause`](Self::pause). The suspended interval is never
    /// counted. Returns false if not suspended.
    pub fn resume(&mut self) -> bool {
        if self.state != HandleState::Suspended {
            return false;
        }
        let now = self.clock.now();
        self.last_mark = now;
        self.next_due = now + self.interval.saturating_sub(self.carried);
        self.state = HandleState::Armed;
        true
    }

    /// Stop for good. Idempotent.
    pub fn cancel(&mut self) {
        self.state = HandleState::Cancelled;
        self.carried = Duration::ZERO;
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
